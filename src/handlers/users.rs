use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthUser, hash_password},
    error::{ApiError, ValidationErrors},
    handlers::{audit, check_email, check_in, check_required, page_params},
    models::{CreateUserRequest, Paginated, UpdateUserRequest, User},
    permissions::{Action, modules},
};

/// UserFilter
///
/// Accepted query parameters for the user listing. division_id matches
/// users holding a proker membership scoped to that division.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct UserFilter {
    pub role_id: Option<Uuid>,
    pub division_id: Option<Uuid>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// list_users
///
/// [Authenticated Route] Paginated user listing with role/division/status
/// filters and a name/username/email search.
#[utoipa::path(
    get,
    path = "/users",
    params(UserFilter),
    responses((status = 200, description = "Users page", body = Paginated<User>))
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Paginated<User>>, ApiError> {
    auth.require(modules::USERS, Action::View)?;
    let (page, per_page) = page_params(filter.page, filter.per_page);
    let users = state
        .repo
        .list_users(
            filter.role_id,
            filter.division_id,
            filter.status,
            filter.search,
            page,
            per_page,
        )
        .await?;
    Ok(Json(users))
}

async fn validate_user_refs(
    state: &AppState,
    errors: &mut ValidationErrors,
    role_id: Option<Uuid>,
    position_id: Option<Uuid>,
) -> Result<(), ApiError> {
    if let Some(role_id) = role_id {
        if !state.repo.role_exists(role_id).await? {
            errors.add("role_id", "The selected role_id is invalid.");
        }
    }
    if let Some(position_id) = position_id {
        if !state.repo.position_exists(position_id).await? {
            errors.add("position_id", "The selected position_id is invalid.");
        }
    }
    Ok(())
}

/// create_user
///
/// [Authenticated Route] Admin-side user creation. Requires the Users/create
/// grant; username and email must be unique, the password is hashed before
/// persistence.
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(axum::http::StatusCode, Json<Value>), ApiError> {
    auth.require(modules::USERS, Action::Create)?;

    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "name", &payload.name);
    check_required(&mut errors, "username", &payload.username);
    check_required(&mut errors, "email", &payload.email);
    check_email(&mut errors, "email", &payload.email);
    if payload.password.len() < 8 {
        errors.add("password", "The password must be at least 8 characters.");
    }
    if payload.role_id.is_none() {
        errors.add("role_id", "The role_id field is required.");
    }
    if let Some(status) = &payload.status {
        check_in(&mut errors, "status", status, &["active", "inactive"]);
    }
    if state.repo.username_taken(&payload.username, None).await? {
        errors.add("username", "The username has already been taken.");
    }
    if state.repo.email_taken(&payload.email, None).await? {
        errors.add("email", "The email has already been taken.");
    }
    validate_user_refs(&state, &mut errors, payload.role_id, payload.position_id).await?;
    errors.into_result()?;

    let hash = hash_password(&payload.password).map_err(|e| {
        tracing::error!("password hashing failed: {:?}", e);
        ApiError::field("password", "The password could not be processed.")
    })?;
    let user = state.repo.create_user(payload, hash).await?;

    audit(
        &state.repo,
        Some(auth.id()),
        "create_user",
        &format!("Created user: {}", user.name),
    )
    .await;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "user": user,
            "message": "User created successfully",
        })),
    ))
}

/// get_user
///
/// [Authenticated Route] One user with role, position and the prokers they
/// hold memberships in.
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "User detail"), (status = 404, description = "Not Found"))
)]
pub async fn get_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::USERS, Action::View)?;
    let user = state
        .repo
        .get_user_with_role(id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    let prokers = state.repo.user_prokers(id).await?;
    Ok(Json(json!({ "user": user, "prokers": prokers })))
}

/// update_user
///
/// [Authenticated Route] Partial update; uniqueness checks exclude the row
/// being edited, a provided password is re-hashed.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses((status = 200, description = "User updated", body = User))
)]
pub async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::USERS, Action::Edit)?;

    let mut errors = ValidationErrors::new();
    if let Some(username) = &payload.username {
        check_required(&mut errors, "username", username);
        if state.repo.username_taken(username, Some(id)).await? {
            errors.add("username", "The username has already been taken.");
        }
    }
    if let Some(email) = &payload.email {
        check_email(&mut errors, "email", email);
        if state.repo.email_taken(email, Some(id)).await? {
            errors.add("email", "The email has already been taken.");
        }
    }
    if let Some(password) = &payload.password {
        if password.len() < 8 {
            errors.add("password", "The password must be at least 8 characters.");
        }
    }
    if let Some(status) = &payload.status {
        check_in(&mut errors, "status", status, &["active", "inactive"]);
    }
    validate_user_refs(&state, &mut errors, payload.role_id, payload.position_id).await?;
    errors.into_result()?;

    let hash = match &payload.password {
        Some(password) => Some(hash_password(password).map_err(|e| {
            tracing::error!("password hashing failed: {:?}", e);
            ApiError::field("password", "The password could not be processed.")
        })?),
        None => None,
    };

    let user = state
        .repo
        .update_user(id, payload, hash)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    audit(
        &state.repo,
        Some(auth.id()),
        "update_user",
        &format!("Updated user: {}", user.name),
    )
    .await;

    Ok(Json(json!({
        "user": user,
        "message": "User updated successfully",
    })))
}

/// delete_user
///
/// [Authenticated Route] Hard delete. Memberships cascade; audit rows keep a
/// NULL actor reference.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::USERS, Action::Delete)?;

    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    if !state.repo.delete_user(id).await? {
        return Err(ApiError::NotFound("user"));
    }

    audit(
        &state.repo,
        Some(auth.id()),
        "delete_user",
        &format!("Deleted user: {}", user.name),
    )
    .await;

    Ok(Json(json!({ "message": "User deleted successfully" })))
}
