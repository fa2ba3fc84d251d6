//! In-process issue store.
//!
//! Issues live in a `Vec` in creation order alongside the id counter. The
//! store does no locking of its own; the daemon wraps it in a single mutex
//! so every operation is serialized.

use std::ops::RangeInclusive;

use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, TimeDelta};

use crate::error::SevaError;
use crate::types::{
    ALL, CreateIssueParams, INITIAL_STATUS, Issue, ListFilters, UpdateFields, coerce_coordinate,
};

#[derive(Debug)]
pub struct IssueStore {
    issues: Vec<Issue>,
    next_id: u64,
}

impl Default for IssueStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn history_line(at: NaiveDateTime, status: &str) -> String {
    format!("{} - {status}", at.format("%Y-%m-%d %H:%M"))
}

/// Calendar years a date-window cutoff may land in.
const CUTOFF_YEARS: RangeInclusive<i32> = 1..=9999;

/// Earliest creation instant a listing keeps for a `date` filter value.
///
/// Returns `None` when the value is not an integer or the cutoff falls
/// outside years 1 to 9999; the caller then skips the stage.
fn date_cutoff(filter: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let days: i64 = filter.trim().parse().ok()?;
    let window = TimeDelta::try_days(days)?;
    now.checked_sub_signed(window)
        .filter(|cutoff| CUTOFF_YEARS.contains(&cutoff.year()))
}

impl IssueStore {
    pub fn new() -> Self {
        IssueStore {
            issues: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn create_issue(&mut self, params: &CreateIssueParams) -> Result<Issue, SevaError> {
        self.create_issue_at(params, now())
    }

    /// Creates an issue as if the wall clock read `at`.
    ///
    /// Coordinates are coerced before an id is taken, so a rejected payload
    /// leaves the counter untouched.
    pub fn create_issue_at(
        &mut self,
        params: &CreateIssueParams,
        at: NaiveDateTime,
    ) -> Result<Issue, SevaError> {
        let lat = coerce_coordinate("lat", params.lat.as_ref())?;
        let lng = coerce_coordinate("lng", params.lng.as_ref())?;

        let id = self.next_id;
        self.next_id += 1;

        let issue = Issue {
            id,
            title: params.title.clone(),
            description: params.description.clone(),
            status: INITIAL_STATUS.to_string(),
            lat,
            lng,
            photo: params.photo.clone(),
            date: at.date(),
            history: vec![history_line(at, INITIAL_STATUS)],
        };
        self.issues.push(issue.clone());

        tracing::info!(id, lat, lng, "issue reported");
        Ok(issue)
    }

    pub fn get_issue(&self, id: u64) -> Result<&Issue, SevaError> {
        self.issues
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| SevaError::NotFound(id.to_string()))
    }

    pub fn list_issues(&self, filters: &ListFilters) -> Vec<Issue> {
        self.list_issues_at(filters, now())
    }

    /// Runs the status, search and date stages in that order, keeping
    /// creation order among the survivors.
    pub fn list_issues_at(&self, filters: &ListFilters, at: NaiveDateTime) -> Vec<Issue> {
        let search = filters.search.to_lowercase();
        let cutoff = if filters.date == ALL {
            None
        } else {
            let cutoff = date_cutoff(&filters.date, at);
            if cutoff.is_none() {
                tracing::debug!(date = %filters.date, "ignoring unusable date filter");
            }
            cutoff
        };

        self.issues
            .iter()
            .filter(|i| filters.status == ALL || i.status == filters.status)
            .filter(|i| {
                search.is_empty()
                    || format!(
                        "{} {}",
                        i.title.to_lowercase(),
                        i.description.to_lowercase()
                    )
                    .contains(&search)
            })
            .filter(|i| cutoff.is_none_or(|c| i.date.and_time(NaiveTime::MIN) >= c))
            .cloned()
            .collect()
    }

    pub fn update_issue(&mut self, id: u64, fields: &UpdateFields) -> Result<Issue, SevaError> {
        self.update_issue_at(id, fields, now())
    }

    /// Applies a status change stamped at `at`. A payload without a status
    /// returns the issue untouched.
    pub fn update_issue_at(
        &mut self,
        id: u64,
        fields: &UpdateFields,
        at: NaiveDateTime,
    ) -> Result<Issue, SevaError> {
        let issue = self
            .issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| SevaError::NotFound(id.to_string()))?;

        if let Some(status) = &fields.status {
            issue.status = status.clone();
            issue.history.push(history_line(at, status));
            tracing::info!(id, status = %status, "issue status changed");
        }

        Ok(issue.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn params(title: &str, description: &str) -> CreateIssueParams {
        CreateIssueParams {
            title: title.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    fn filters(status: &str, date: &str, search: &str) -> ListFilters {
        ListFilters {
            status: status.to_string(),
            date: date.to_string(),
            search: search.to_string(),
        }
    }

    fn ids(issues: &[Issue]) -> Vec<u64> {
        issues.iter().map(|i| i.id).collect()
    }

    #[test]
    fn create_stamps_defaults() {
        let mut store = IssueStore::new();
        let issue = store
            .create_issue_at(&CreateIssueParams::default(), at(2024, 5, 2, 14, 7))
            .unwrap();

        assert_eq!(issue.id, 1);
        assert_eq!(issue.status, "Reported");
        assert_eq!(issue.title, "");
        assert_eq!(issue.photo, "");
        assert_eq!(issue.lat, 0.0);
        assert_eq!(issue.date.to_string(), "2024-05-02");
        assert_eq!(issue.history, vec!["2024-05-02 14:07 - Reported"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn ids_follow_creation_order() {
        let mut store = IssueStore::new();
        for n in 1..=5 {
            let issue = store.create_issue(&params(&format!("t{n}"), "")).unwrap();
            assert_eq!(issue.id, n);
        }
        assert_eq!(ids(&store.list_issues(&ListFilters::default())), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn rejected_coordinates_do_not_consume_an_id() {
        let mut store = IssueStore::new();
        let bad = CreateIssueParams {
            lat: Some(json!("somewhere")),
            ..Default::default()
        };
        let err = store.create_issue(&bad).unwrap_err();
        assert_eq!(err.code(), "invalid_coordinate");
        assert!(store.is_empty());

        let issue = store.create_issue(&params("ok", "")).unwrap();
        assert_eq!(issue.id, 1);
    }

    #[test]
    fn coordinates_are_coerced_on_create() {
        let mut store = IssueStore::new();
        let issue = store
            .create_issue(&CreateIssueParams {
                lat: Some(json!("40.1")),
                lng: Some(json!(-73.9)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(issue.lat, 40.1);
        assert_eq!(issue.lng, -73.9);
    }

    #[test]
    fn status_filter_is_exact() {
        let mut store = IssueStore::new();
        store.create_issue(&params("a", "")).unwrap();
        store.create_issue(&params("b", "")).unwrap();
        store
            .update_issue(
                2,
                &UpdateFields {
                    status: Some("Solved".into()),
                },
            )
            .unwrap();

        assert_eq!(ids(&store.list_issues(&filters("Solved", ALL, ""))), [2]);
        assert_eq!(ids(&store.list_issues(&filters("Reported", ALL, ""))), [1]);
        assert!(store.list_issues(&filters("solved", ALL, "")).is_empty());
        assert!(store.list_issues(&filters("", ALL, "")).is_empty());
    }

    #[test]
    fn search_spans_title_and_description() {
        let mut store = IssueStore::new();
        store.create_issue(&params("Pothole", "Main St")).unwrap();
        store.create_issue(&params("Graffiti", "park wall")).unwrap();

        assert_eq!(ids(&store.list_issues(&filters(ALL, ALL, "pothole"))), [1]);
        assert_eq!(ids(&store.list_issues(&filters(ALL, ALL, "MAIN"))), [1]);
        assert_eq!(ids(&store.list_issues(&filters(ALL, ALL, "pothole main"))), [1]);
        assert_eq!(ids(&store.list_issues(&filters(ALL, ALL, "a"))), [1, 2]);
        assert!(store.list_issues(&filters(ALL, ALL, "bridge")).is_empty());
    }

    #[test]
    fn date_window_compares_against_midnight() {
        let mut store = IssueStore::new();
        store
            .create_issue_at(&params("old", ""), at(2024, 3, 1, 10, 0))
            .unwrap();
        store
            .create_issue_at(&params("new", ""), at(2024, 3, 10, 9, 0))
            .unwrap();
        let now = at(2024, 3, 10, 12, 0);

        assert_eq!(ids(&store.list_issues_at(&filters(ALL, "7", ""), now)), [2]);
        // Issue dates count from midnight, so nine days back still misses the 1st.
        assert_eq!(ids(&store.list_issues_at(&filters(ALL, "9", ""), now)), [2]);
        assert_eq!(ids(&store.list_issues_at(&filters(ALL, "10", ""), now)), [1, 2]);
        assert!(store.list_issues_at(&filters(ALL, "0", ""), now).is_empty());
        assert!(store.list_issues_at(&filters(ALL, "-1", ""), now).is_empty());
    }

    #[test]
    fn unusable_date_filter_is_ignored() {
        let mut store = IssueStore::new();
        store
            .create_issue_at(&params("a", ""), at(2020, 1, 1, 8, 0))
            .unwrap();
        store
            .create_issue_at(&params("b", ""), at(2024, 1, 1, 8, 0))
            .unwrap();
        let now = at(2024, 1, 2, 8, 0);

        for date in [
            "abc",
            "",
            "1.5",
            "99999999999",
            "999999999999999999999999",
            "1000000",
            "-3000000",
        ] {
            assert_eq!(
                ids(&store.list_issues_at(&filters(ALL, date, ""), now)),
                [1, 2],
                "date filter {date:?}"
            );
        }
    }

    #[test]
    fn cutoff_stays_within_calendar_years() {
        let now = at(2024, 1, 2, 8, 0);
        assert!(date_cutoff("7", now).is_some());
        assert!(date_cutoff("-2900000", now).is_some());
        assert!(date_cutoff("-3000000", now).is_none());
        assert!(date_cutoff("739250", now).is_none());
    }

    #[test]
    fn update_appends_history() {
        let mut store = IssueStore::new();
        store
            .create_issue_at(&params("light", ""), at(2024, 6, 1, 8, 30))
            .unwrap();

        let fields = UpdateFields {
            status: Some("In Progress".into()),
        };
        let issue = store
            .update_issue_at(1, &fields, at(2024, 6, 2, 17, 45))
            .unwrap();

        assert_eq!(issue.status, "In Progress");
        assert_eq!(
            issue.history,
            vec!["2024-06-01 08:30 - Reported", "2024-06-02 17:45 - In Progress"]
        );
        assert_eq!(issue.date.to_string(), "2024-06-01");
        assert_eq!(store.get_issue(1).unwrap(), &issue);
    }

    #[test]
    fn update_without_status_is_a_no_op() {
        let mut store = IssueStore::new();
        let created = store.create_issue(&params("x", "")).unwrap();
        let same = store.update_issue(1, &UpdateFields::default()).unwrap();
        assert_eq!(created, same);
    }

    #[test]
    fn any_status_can_follow_any_other() {
        let mut store = IssueStore::new();
        store.create_issue(&params("x", "")).unwrap();
        for status in ["Solved", "Reported", "", "Escalated to council"] {
            let issue = store
                .update_issue(
                    1,
                    &UpdateFields {
                        status: Some(status.into()),
                    },
                )
                .unwrap();
            assert_eq!(issue.status, status);
        }
        assert_eq!(store.get_issue(1).unwrap().history.len(), 5);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut store = IssueStore::new();
        store.create_issue(&params("x", "")).unwrap();
        let before = store.list_issues(&ListFilters::default());

        let err = store
            .update_issue(
                9,
                &UpdateFields {
                    status: Some("Solved".into()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, SevaError::NotFound(ref id) if id == "9"));
        assert_eq!(store.list_issues(&ListFilters::default()), before);
    }
}
