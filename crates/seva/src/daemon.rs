use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ErrorResponse, SevaError};
use crate::store::IssueStore;
use crate::types::{CreateIssueParams, CreatedIssue, Issue, ListFilters, UpdateFields};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Reports carry photos inline as base64 data URLs.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

type AppState = Arc<Mutex<IssueStore>>;

struct AppError(SevaError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SevaError::NotFound(_) => StatusCode::NOT_FOUND,
            SevaError::InvalidCoordinate { .. } => StatusCode::BAD_REQUEST,
            SevaError::InvalidStatus(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SevaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match &self.0 {
            SevaError::Internal(msg) => tracing::error!(error = %msg, "request failed"),
            other => tracing::warn!(code = other.code(), error = %other, "request rejected"),
        }
        let body = ErrorResponse::from(&self.0);
        (status, Json(body)).into_response()
    }
}

impl From<SevaError> for AppError {
    fn from(err: SevaError) -> Self {
        AppError(err)
    }
}

fn lock(state: &AppState) -> Result<MutexGuard<'_, IssueStore>, AppError> {
    state
        .lock()
        .map_err(|_| AppError(SevaError::Internal("issue store lock poisoned".to_string())))
}

pub fn router(store: IssueStore) -> Router {
    let state: AppState = Arc::new(Mutex::new(store));

    Router::new()
        .route("/", get(index))
        .route("/api/issues", get(list_issues).post(create_issue))
        .route("/api/issues/{id}", patch(update_issue))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

pub async fn start(host: &str, port: u16) -> Result<(), SevaError> {
    let app = router(IssueStore::new());

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SevaError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("seva listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SevaError::Internal(format!("server error: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn list_issues(
    State(store): State<AppState>,
    Query(filters): Query<ListFilters>,
) -> Result<Json<Vec<Issue>>, AppError> {
    let store = lock(&store)?;
    let issues = store.list_issues(&filters);
    tracing::debug!(
        status = %filters.status,
        date = %filters.date,
        search = %filters.search,
        matched = issues.len(),
        "listed issues"
    );
    Ok(Json(issues))
}

async fn create_issue(
    State(store): State<AppState>,
    Json(params): Json<CreateIssueParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut store = lock(&store)?;
    let issue = store.create_issue(&params)?;
    let body = CreatedIssue {
        message: "Issue created".to_string(),
        issue,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// Raw PATCH body. `status` stays a JSON value so that an explicit `null`
/// is told apart from a missing key.
#[derive(Debug, Deserialize)]
struct UpdateIssueBody {
    #[serde(default, deserialize_with = "present")]
    status: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl UpdateIssueBody {
    fn into_fields(self) -> Result<UpdateFields, SevaError> {
        match self.status {
            None => Ok(UpdateFields { status: None }),
            Some(Value::String(status)) => Ok(UpdateFields {
                status: Some(status),
            }),
            Some(other) => Err(SevaError::InvalidStatus(other.to_string())),
        }
    }
}

async fn update_issue(
    State(store): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateIssueBody>,
) -> Result<Json<Issue>, AppError> {
    // Non-numeric ids cannot name an issue, so they read as unknown.
    let Ok(numeric) = id.parse::<u64>() else {
        return Err(SevaError::NotFound(id).into());
    };

    let mut store = lock(&store)?;
    // An unknown id wins over a bad payload.
    store.get_issue(numeric)?;
    let fields = body.into_fields()?;
    let issue = store.update_issue(numeric, &fields)?;
    Ok(Json(issue))
}
