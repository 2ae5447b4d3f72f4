use uuid::Uuid;

use crate::{error::ValidationErrors, repository::RepositoryState};

pub mod auth;
pub mod dashboard;
pub mod divisions;
pub mod messages;
pub mod positions;
pub mod prokers;
pub mod settings;
pub mod transactions;
pub mod users;

/// Best-effort audit append. A failed write must never fail or roll back the
/// primary mutation, so the error is logged and swallowed here.
pub async fn audit(repo: &RepositoryState, actor: Option<Uuid>, action: &str, description: &str) {
    if let Err(e) = repo.append_audit(actor, action, description).await {
        tracing::warn!("audit write failed for action '{}': {:?}", action, e);
    }
}

/// Upper bound on `page`; keeps the OFFSET computation far from i64 range.
const MAX_PAGE: i64 = 1_000_000;

/// Normalizes pagination query params: page is clamped to 1..=MAX_PAGE,
/// per_page defaults to 15 and is capped at 100.
pub fn page_params(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let per_page = per_page.unwrap_or(15).clamp(1, 100);
    (page, per_page)
}

/// Adds the standard required-field message when the value is blank.
pub fn check_required(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("The {} field is required.", field));
    }
}

/// Minimal email shape check; full RFC validation is not the point here.
pub fn check_email(errors: &mut ValidationErrors, field: &str, value: &str) {
    let looks_valid = value.contains('@')
        && !value.starts_with('@')
        && !value.ends_with('@')
        && !value.contains(char::is_whitespace);
    if !looks_valid {
        errors.add(field, format!("The {} must be a valid email address.", field));
    }
}

/// Adds the standard invalid-choice message when the value is outside the
/// allowed set.
pub fn check_in(errors: &mut ValidationErrors, field: &str, value: &str, allowed: &[&str]) {
    if !allowed.contains(&value) {
        errors.add(field, format!("The selected {} is invalid.", field));
    }
}
