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
    models::{CreatePositionRequest, Position},
    permissions::{Action, modules},
};

/// Positions are org-structure reference data, so mutations sit behind the
/// Settings module rather than a module of their own.
#[utoipa::path(
    get,
    path = "/positions",
    responses((status = 200, description = "All positions", body = Vec<Position>))
)]
pub async fn list_positions(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Position>>, ApiError> {
    Ok(Json(state.repo.list_positions().await?))
}

#[utoipa::path(
    post,
    path = "/positions",
    request_body = CreatePositionRequest,
    responses((status = 201, description = "Position created", body = Position))
)]
pub async fn create_position(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePositionRequest>,
) -> Result<(axum::http::StatusCode, Json<Value>), ApiError> {
    auth.require(modules::SETTINGS, Action::Create)?;

    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "name", &payload.name);
    if state.repo.position_name_taken(&payload.name, None).await? {
        errors.add("name", "The name has already been taken.");
    }
    errors.into_result()?;

    let position = state
        .repo
        .create_position(payload.name, payload.description)
        .await?;
    audit(
        &state.repo,
        Some(auth.id()),
        "create_position",
        &format!("Created position: {}", position.name),
    )
    .await;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "position": position,
            "message": "Position created successfully",
        })),
    ))
}

#[utoipa::path(
    put,
    path = "/positions/{id}",
    params(("id" = Uuid, Path, description = "Position ID")),
    request_body = CreatePositionRequest,
    responses((status = 200, description = "Position updated", body = Position))
)]
pub async fn update_position(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreatePositionRequest>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::SETTINGS, Action::Edit)?;

    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "name", &payload.name);
    if state
        .repo
        .position_name_taken(&payload.name, Some(id))
        .await?
    {
        errors.add("name", "The name has already been taken.");
    }
    errors.into_result()?;

    let position = state
        .repo
        .update_position(id, payload.name, payload.description)
        .await?
        .ok_or(ApiError::NotFound("position"))?;

    audit(
        &state.repo,
        Some(auth.id()),
        "update_position",
        &format!("Updated position: {}", position.name),
    )
    .await;

    Ok(Json(json!({
        "position": position,
        "message": "Position updated successfully",
    })))
}

#[utoipa::path(
    delete,
    path = "/positions/{id}",
    params(("id" = Uuid, Path, description = "Position ID")),
    responses((status = 200, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_position(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::SETTINGS, Action::Delete)?;

    if !state.repo.delete_position(id).await? {
        return Err(ApiError::NotFound("position"));
    }

    audit(
        &state.repo,
        Some(auth.id()),
        "delete_position",
        &format!("Deleted position {id}"),
    )
    .await;

    Ok(Json(json!({ "message": "Position deleted successfully" })))
}
