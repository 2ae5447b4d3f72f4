use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ValidationErrors},
    handlers::{audit, check_required},
    models::{CreateDivisionRequest, Division},
    permissions::{Action, modules},
};

/// list_divisions
///
/// [Public Route] Every division, used by the public landing page as well as
/// the admin panel's select inputs.
#[utoipa::path(
    get,
    path = "/divisions",
    responses((status = 200, description = "All divisions", body = Vec<Division>))
)]
pub async fn list_divisions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Division>>, ApiError> {
    Ok(Json(state.repo.list_divisions().await?))
}

#[utoipa::path(
    post,
    path = "/divisions",
    request_body = CreateDivisionRequest,
    responses((status = 201, description = "Division created", body = Division))
)]
pub async fn create_division(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateDivisionRequest>,
) -> Result<(axum::http::StatusCode, Json<Value>), ApiError> {
    auth.require(modules::DIVISIONS, Action::Create)?;

    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "name", &payload.name);
    errors.into_result()?;

    let division = state
        .repo
        .create_division(payload.name, payload.description)
        .await?;
    audit(
        &state.repo,
        Some(auth.id()),
        "create_division",
        &format!("Created division: {}", division.name),
    )
    .await;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "division": division,
            "message": "Division created successfully",
        })),
    ))
}

#[utoipa::path(
    put,
    path = "/divisions/{id}",
    params(("id" = Uuid, Path, description = "Division ID")),
    request_body = CreateDivisionRequest,
    responses((status = 200, description = "Division updated", body = Division))
)]
pub async fn update_division(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateDivisionRequest>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::DIVISIONS, Action::Edit)?;

    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "name", &payload.name);
    errors.into_result()?;

    let division = state
        .repo
        .update_division(id, payload.name, payload.description)
        .await?
        .ok_or(ApiError::NotFound("division"))?;

    audit(
        &state.repo,
        Some(auth.id()),
        "update_division",
        &format!("Updated division: {}", division.name),
    )
    .await;

    Ok(Json(json!({
        "division": division,
        "message": "Division updated successfully",
    })))
}

#[utoipa::path(
    delete,
    path = "/divisions/{id}",
    params(("id" = Uuid, Path, description = "Division ID")),
    responses((status = 200, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_division(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::DIVISIONS, Action::Delete)?;

    if !state.repo.delete_division(id).await? {
        return Err(ApiError::NotFound("division"));
    }

    audit(
        &state.repo,
        Some(auth.id()),
        "delete_division",
        &format!("Deleted division {id}"),
    )
    .await;

    Ok(Json(json!({ "message": "Division deleted successfully" })))
}
