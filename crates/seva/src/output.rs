use serde::Serialize;

use crate::error::SevaError;
use crate::types::{CreatedIssue, Issue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Json,
    Human,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("error: failed to encode output: {e}"),
    }
}

pub fn print_error(err: &SevaError, mode: OutputMode) {
    match mode {
        OutputMode::Json => {
            let resp = crate::error::ErrorResponse::from(err);
            match serde_json::to_string(&resp) {
                Ok(s) => eprintln!("{s}"),
                Err(_) => eprintln!("error: {err}"),
            }
        }
        OutputMode::Human => {
            eprintln!("error: {err}");
        }
    }
}

pub fn issue_line(issue: &Issue) -> String {
    let title = if issue.title.is_empty() {
        "(untitled)"
    } else {
        &issue.title
    };
    format!(
        "#{:<4} {:<12} {}  {}  @{},{}",
        issue.id, issue.status, issue.date, title, issue.lat, issue.lng
    )
}

pub fn print_issue(issue: &Issue, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(issue),
        OutputMode::Human => println!("{}", issue_line(issue)),
    }
}

pub fn print_created(created: &CreatedIssue, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(created),
        OutputMode::Human => {
            println!("{}", created.message);
            println!("{}", issue_line(&created.issue));
        }
    }
}

pub fn print_issue_list(issues: &[Issue], mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(issues),
        OutputMode::Human => {
            if issues.is_empty() {
                println!("(no issues)");
            } else {
                for issue in issues {
                    println!("{}", issue_line(issue));
                }
            }
        }
    }
}

pub fn print_history(issue: &Issue, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(&issue.history),
        OutputMode::Human => {
            println!("{}", issue_line(issue));
            if !issue.description.is_empty() {
                println!("  {}", issue.description);
            }
            if !issue.photo.is_empty() {
                println!("  photo: {}", issue.photo);
            }
            for entry in &issue.history {
                println!("    {entry}");
            }
        }
    }
}
