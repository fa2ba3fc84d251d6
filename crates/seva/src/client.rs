use reqwest::blocking::Client as HttpClient;
use reqwest::blocking::Response;

use crate::error::{ErrorResponse, SevaError};
use crate::types::{
    CreateIssueParams, CreatedIssue, Issue, ListFilters, UpdateFields, coerce_coordinate,
};

pub struct Client {
    http: HttpClient,
    base_url: String,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    pub fn new() -> Self {
        let base_url =
            std::env::var("SEVA_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
        Self::with_base_url(base_url)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Client {
            http: HttpClient::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn check_reachable(&self) -> Result<(), String> {
        match self.http.get(format!("{}/api/issues", self.base_url)).send() {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(format!("service returned status {}", resp.status())),
            Err(e) => Err(format!("cannot reach service at {}: {}", self.base_url, e)),
        }
    }

    fn parse_error(resp: Response, id: Option<u64>) -> SevaError {
        let status = resp.status();
        match resp.json::<ErrorResponse>() {
            Ok(err_resp) => match err_resp.code.as_deref() {
                Some("not_found") => {
                    SevaError::NotFound(id.map(|i| i.to_string()).unwrap_or_default())
                }
                _ => SevaError::Internal(err_resp.error),
            },
            Err(_) => SevaError::Internal(format!("unexpected response from service: {status}")),
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(
        resp: Response,
        id: Option<u64>,
    ) -> Result<T, SevaError> {
        if resp.status().is_success() {
            resp.json().map_err(|e| SevaError::Internal(e.to_string()))
        } else {
            Err(Self::parse_error(resp, id))
        }
    }

    /// Coordinates are checked locally first so a typo never reaches the service.
    pub fn create_issue(&self, params: &CreateIssueParams) -> Result<CreatedIssue, SevaError> {
        coerce_coordinate("lat", params.lat.as_ref())?;
        coerce_coordinate("lng", params.lng.as_ref())?;

        let resp = self
            .http
            .post(format!("{}/api/issues", self.base_url))
            .json(params)
            .send()
            .map_err(|e| SevaError::Internal(e.to_string()))?;
        Self::decode(resp, None)
    }

    pub fn list_issues(&self, filters: &ListFilters) -> Result<Vec<Issue>, SevaError> {
        let resp = self
            .http
            .get(format!("{}/api/issues", self.base_url))
            .query(filters)
            .send()
            .map_err(|e| SevaError::Internal(e.to_string()))?;
        Self::decode(resp, None)
    }

    pub fn update_status(&self, id: u64, status: &str) -> Result<Issue, SevaError> {
        let body = UpdateFields {
            status: Some(status.to_string()),
        };
        let resp = self
            .http
            .patch(format!("{}/api/issues/{}", self.base_url, id))
            .json(&body)
            .send()
            .map_err(|e| SevaError::Internal(e.to_string()))?;
        Self::decode(resp, Some(id))
    }

    /// The service has no single-issue endpoint, so this scans the full list.
    pub fn find_issue(&self, id: u64) -> Result<Issue, SevaError> {
        self.list_issues(&ListFilters::default())?
            .into_iter()
            .find(|i| i.id == id)
            .ok_or_else(|| SevaError::NotFound(id.to_string()))
    }
}
