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
    handlers::{audit, check_email, check_in, check_required, page_params},
    models::{
        CreateMessageRequest, Message, MessageStats, Paginated, UpdateMessageStatusRequest,
    },
    permissions::{Action, modules},
};

pub const MESSAGE_STATUSES: [&str; 3] = ["unread", "read", "archived"];

#[derive(Deserialize, utoipa::IntoParams)]
pub struct MessageFilter {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// create_message
///
/// [Public Route] Contact-form submission. No authentication; new messages
/// always start as unread.
#[utoipa::path(
    post,
    path = "/messages",
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message received", body = Message),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_message(
    State(state): State<AppState>,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<(axum::http::StatusCode, Json<Value>), ApiError> {
    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "name", &payload.name);
    check_required(&mut errors, "email", &payload.email);
    check_email(&mut errors, "email", &payload.email);
    check_required(&mut errors, "content", &payload.content);
    errors.into_result()?;

    let message = state.repo.create_message(payload).await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "data": message,
            "message": "Message sent successfully",
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/messages",
    params(MessageFilter),
    responses((status = 200, description = "Messages page", body = Paginated<Message>))
)]
pub async fn list_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<MessageFilter>,
) -> Result<Json<Paginated<Message>>, ApiError> {
    auth.require(modules::MESSAGES, Action::View)?;
    let (page, per_page) = page_params(filter.page, filter.per_page);
    let messages = state.repo.list_messages(filter.status, page, per_page).await?;
    Ok(Json(messages))
}

/// get_message
///
/// [Authenticated Route] Reading a message does not change its status; the
/// panel marks messages read explicitly through the status endpoint.
#[utoipa::path(
    get,
    path = "/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses((status = 200, description = "Message", body = Message), (status = 404, description = "Not Found"))
)]
pub async fn get_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    auth.require(modules::MESSAGES, Action::View)?;
    let message = state
        .repo
        .get_message(id)
        .await?
        .ok_or(ApiError::NotFound("message"))?;
    Ok(Json(message))
}

#[utoipa::path(
    put,
    path = "/messages/{id}/status",
    params(("id" = Uuid, Path, description = "Message ID")),
    request_body = UpdateMessageStatusRequest,
    responses((status = 200, description = "Status updated", body = Message))
)]
pub async fn update_message_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMessageStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::MESSAGES, Action::Edit)?;

    let mut errors = ValidationErrors::new();
    check_in(&mut errors, "status", &payload.status, &MESSAGE_STATUSES);
    errors.into_result()?;

    let message = state
        .repo
        .update_message_status(id, payload.status)
        .await?
        .ok_or(ApiError::NotFound("message"))?;

    audit(
        &state.repo,
        Some(auth.id()),
        "update_message_status",
        &format!("Marked message {id} as {}", message.status),
    )
    .await;

    Ok(Json(json!({
        "data": message,
        "message": "Message status updated successfully",
    })))
}

#[utoipa::path(
    delete,
    path = "/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses((status = 200, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::MESSAGES, Action::Delete)?;

    if !state.repo.delete_message(id).await? {
        return Err(ApiError::NotFound("message"));
    }

    audit(
        &state.repo,
        Some(auth.id()),
        "delete_message",
        &format!("Deleted message {id}"),
    )
    .await;

    Ok(Json(json!({ "message": "Message deleted successfully" })))
}

/// message_statistics
///
/// [Authenticated Route] Counts per status for the inbox header badges.
#[utoipa::path(
    get,
    path = "/messages/statistics",
    responses((status = 200, description = "Inbox counters", body = MessageStats))
)]
pub async fn message_statistics(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageStats>, ApiError> {
    auth.require(modules::MESSAGES, Action::View)?;
    Ok(Json(state.repo.message_stats().await?))
}
