use axum::{Json, extract::State, http::HeaderMap};
use serde_json::{Value, json};

use crate::{
    AppState,
    auth::{AuthUser, generate_token, hash_password, verify_password},
    error::{ApiError, ValidationErrors},
    handlers::{audit, check_email, check_required},
    models::{ChangePasswordRequest, LoginRequest, LoginResponse, UpdateProfileRequest, UserWithRole},
};

/// login
///
/// [Public Route] Credential check against username OR email, then a fresh
/// opaque token. The three failure modes keep their distinct field keys:
/// unknown identifier and inactive account report under `username`, a hash
/// mismatch reports under `password`.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 422, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "username", &payload.username);
    check_required(&mut errors, "password", &payload.password);
    errors.into_result()?;

    let user = state
        .repo
        .find_user_by_identifier(payload.username.trim())
        .await?
        .ok_or_else(|| ApiError::field("username", "Username or email not found."))?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::field("password", "The password is incorrect."));
    }

    if user.status != "active" {
        return Err(ApiError::field("username", "Your account is inactive."));
    }

    let token = generate_token();
    state.repo.insert_token(&token, user.id).await?;

    audit(&state.repo, Some(user.id), "login", "User logged in").await;

    let principal = state
        .repo
        .get_user_with_role(user.id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(LoginResponse {
        user: principal,
        token,
    }))
}

/// logout
///
/// [Authenticated Route] Revokes the presented bearer token.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout(
    auth: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    // The extractor has already validated the header; re-read it here to
    // know which token row to revoke.
    if let Some(token) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        state.repo.delete_token(token).await?;
    }

    audit(&state.repo, Some(auth.id()), "logout", "User logged out").await;

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

/// me
///
/// [Authenticated Route] The current principal with role, position and
/// permission matrix loaded, resolved fresh from the token.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Current principal", body = UserWithRole))
)]
pub async fn me(auth: AuthUser) -> Json<Value> {
    Json(json!({ "user": auth.principal }))
}

/// update_profile
///
/// [Authenticated Route] Partial self-service profile edit. Email uniqueness
/// is checked against every other user.
#[utoipa::path(
    put,
    path = "/me/profile",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Profile updated", body = UserWithRole))
)]
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut errors = ValidationErrors::new();
    if let Some(name) = &payload.name {
        check_required(&mut errors, "name", name);
    }
    if let Some(email) = &payload.email {
        check_email(&mut errors, "email", email);
        if errors.is_empty() && state.repo.email_taken(email, Some(auth.id())).await? {
            errors.add("email", "The email has already been taken.");
        }
    }
    errors.into_result()?;

    state
        .repo
        .update_profile(auth.id(), payload)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    audit(
        &state.repo,
        Some(auth.id()),
        "update_profile",
        "User updated their profile",
    )
    .await;

    let principal = state
        .repo
        .get_user_with_role(auth.id())
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(json!({
        "user": principal,
        "message": "Profile updated successfully",
    })))
}

/// change_password
///
/// [Authenticated Route] Verifies the current password before storing a new
/// argon2 hash. A mismatch reports under `current_password`.
#[utoipa::path(
    put,
    path = "/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 422, description = "Current password incorrect")
    )
)]
pub async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "current_password", &payload.current_password);
    if payload.new_password.len() < 8 {
        errors.add(
            "new_password",
            "The new password must be at least 8 characters.",
        );
    }
    errors.into_result()?;

    if !verify_password(
        &payload.current_password,
        &auth.principal.user.password_hash,
    ) {
        return Err(ApiError::field(
            "current_password",
            "The current password is incorrect.",
        ));
    }

    let hash = hash_password(&payload.new_password)
        .map_err(|e| {
            tracing::error!("password hashing failed: {:?}", e);
            ApiError::field("new_password", "The new password could not be processed.")
        })?;
    state.repo.update_password(auth.id(), &hash).await?;

    audit(
        &state.repo,
        Some(auth.id()),
        "change_password",
        "User changed their password",
    )
    .await;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}
