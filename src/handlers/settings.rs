use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, ValidationErrors},
    handlers::audit,
    models::{AuditLogEntry, RoleWithPermissions, Setting, UpdateRolePermissionsRequest},
    permissions::{Action, modules},
};

#[utoipa::path(
    get,
    path = "/settings",
    responses((status = 200, description = "All settings", body = Vec<Setting>))
)]
pub async fn list_settings(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Setting>>, ApiError> {
    auth.require(modules::SETTINGS, Action::View)?;
    Ok(Json(state.repo.list_settings().await?))
}

/// update_settings
///
/// [Authenticated Route] Upserts the given key/value pairs in one
/// transaction and returns the full settings table.
#[utoipa::path(
    put,
    path = "/settings",
    request_body = BTreeMap<String, String>,
    responses((status = 200, description = "Settings saved", body = Vec<Setting>))
)]
pub async fn update_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(values): Json<BTreeMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::SETTINGS, Action::Edit)?;

    if values.is_empty() {
        return Err(ApiError::field("settings", "The settings field is required."));
    }

    let keys: Vec<&str> = values.keys().map(String::as_str).collect();
    let settings = state.repo.upsert_settings(values.clone()).await?;

    audit(
        &state.repo,
        Some(auth.id()),
        "update_settings",
        &format!("Updated settings: {}", keys.join(", ")),
    )
    .await;

    Ok(Json(json!({
        "settings": settings,
        "message": "Settings updated successfully",
    })))
}

/// list_roles
///
/// [Authenticated Route] Every role with its permission matrix, the shape
/// the settings page edits.
#[utoipa::path(
    get,
    path = "/roles",
    responses((status = 200, description = "Roles with matrices", body = Vec<RoleWithPermissions>))
)]
pub async fn list_roles(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RoleWithPermissions>>, ApiError> {
    auth.require(modules::SETTINGS, Action::View)?;
    Ok(Json(state.repo.list_roles_with_permissions().await?))
}

/// update_role_permissions
///
/// [Authenticated Route] Replaces a role's full matrix. Takes effect on the
/// next request of every user holding the role, since grants are read per
/// request.
#[utoipa::path(
    put,
    path = "/roles/{id}/permissions",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = UpdateRolePermissionsRequest,
    responses(
        (status = 200, description = "Matrix replaced"),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update_role_permissions(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRolePermissionsRequest>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::SETTINGS, Action::Edit)?;

    if !state.repo.role_exists(id).await? {
        return Err(ApiError::NotFound("role"));
    }

    let mut errors = ValidationErrors::new();
    for (i, entry) in payload.permissions.iter().enumerate() {
        if entry.module_name.trim().is_empty() {
            errors.add(
                format!("permissions.{i}.module_name"),
                "The module_name field is required.",
            );
        }
    }
    errors.into_result()?;

    let permissions = state
        .repo
        .replace_role_permissions(id, payload.permissions)
        .await?;

    audit(
        &state.repo,
        Some(auth.id()),
        "update_role_permissions",
        &format!("Replaced permission matrix for role {id}"),
    )
    .await;

    Ok(Json(json!({
        "permissions": permissions,
        "message": "Role permissions updated successfully",
    })))
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct AuditLogQuery {
    pub limit: Option<i64>,
}

/// list_audit_logs
///
/// [Authenticated Route] Most recent audit rows, newest first. The actor
/// name is NULL for rows whose user was deleted.
#[utoipa::path(
    get,
    path = "/audit-logs",
    params(AuditLogQuery),
    responses((status = 200, description = "Audit trail", body = Vec<AuditLogEntry>))
)]
pub async fn list_audit_logs(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, ApiError> {
    auth.require(modules::SETTINGS, Action::View)?;
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    Ok(Json(state.repo.list_audit_logs(limit).await?))
}
