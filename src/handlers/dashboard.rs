use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::DashboardStats,
    permissions::{Action, modules},
};

/// dashboard
///
/// [Authenticated Route] Everything the dashboard page renders in one call:
/// headline counters, the ledger balance, the proker status breakdown and
/// the recent-activity feeds.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard aggregate", body = DashboardStats),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn dashboard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    auth.require(modules::DASHBOARD, Action::View)?;
    Ok(Json(state.repo.dashboard_stats().await?))
}
