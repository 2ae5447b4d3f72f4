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
    handlers::{audit, check_in, check_required, page_params},
    models::{
        AddMediaRequest, AnggotaInput, CreateProkerRequest, Paginated, ProkerMedia,
        ProkerWithDivisions, UpdateProkerRequest,
    },
    permissions::{Action, modules},
};

pub const PROKER_STATUSES: [&str; 3] = ["planned", "ongoing", "done"];

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ProkerFilter {
    pub division_id: Option<Uuid>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// list_prokers
///
/// [Authenticated Route] Paginated work-program listing. Each row carries
/// its owning divisions so the panel can render badges without N+1 calls.
#[utoipa::path(
    get,
    path = "/prokers",
    params(ProkerFilter),
    responses((status = 200, description = "Prokers page", body = Paginated<ProkerWithDivisions>))
)]
pub async fn list_prokers(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ProkerFilter>,
) -> Result<Json<Paginated<ProkerWithDivisions>>, ApiError> {
    auth.require(modules::PROKERS, Action::View)?;
    let (page, per_page) = page_params(filter.page, filter.per_page);
    let prokers = state
        .repo
        .list_prokers(filter.division_id, filter.status, filter.search, page, per_page)
        .await?;
    Ok(Json(prokers))
}

/// get_proker
///
/// [Authenticated Route] Full detail aggregate: divisions, media and the
/// member roster joined with user names.
#[utoipa::path(
    get,
    path = "/prokers/{id}",
    params(("id" = Uuid, Path, description = "Proker ID")),
    responses((status = 200, description = "Proker detail"), (status = 404, description = "Not Found"))
)]
pub async fn get_proker(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::PROKERS, Action::View)?;
    let detail = state
        .repo
        .get_proker_detail(id)
        .await?
        .ok_or(ApiError::NotFound("proker"))?;
    Ok(Json(json!({ "proker": detail })))
}

fn validate_proker_fields(
    errors: &mut ValidationErrors,
    title: Option<&str>,
    status: Option<&str>,
) {
    if let Some(title) = title {
        check_required(errors, "title", title);
    }
    if let Some(status) = status {
        check_in(errors, "status", status, &PROKER_STATUSES);
    }
}

async fn validate_anggota(
    state: &AppState,
    errors: &mut ValidationErrors,
    anggota: &[AnggotaInput],
) -> Result<(), ApiError> {
    // Memberships intentionally allow the same user to appear more than once
    // with different committee roles; only referential integrity is checked
    // here.
    for (i, input) in anggota.iter().enumerate() {
        if state.repo.get_user(input.user_id).await?.is_none() {
            errors.add(
                format!("anggota.{i}.user_id"),
                "The selected user_id is invalid.",
            );
        }
        if let Some(division_id) = input.division_id {
            if !state.repo.division_exists(division_id).await? {
                errors.add(
                    format!("anggota.{i}.division_id"),
                    "The selected division_id is invalid.",
                );
            }
        }
        if let Some(position_id) = input.position_id {
            if !state.repo.position_exists(position_id).await? {
                errors.add(
                    format!("anggota.{i}.position_id"),
                    "The selected position_id is invalid.",
                );
            }
        }
    }
    Ok(())
}

/// create_proker
///
/// [Authenticated Route] Creates the proker, links the given divisions and
/// seeds any initial memberships in a single transaction.
#[utoipa::path(
    post,
    path = "/prokers",
    request_body = CreateProkerRequest,
    responses(
        (status = 201, description = "Proker created"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_proker(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProkerRequest>,
) -> Result<(axum::http::StatusCode, Json<Value>), ApiError> {
    auth.require(modules::PROKERS, Action::Create)?;

    let mut errors = ValidationErrors::new();
    validate_proker_fields(&mut errors, Some(&payload.title), payload.status.as_deref());
    if payload.division_ids.is_empty() {
        errors.add("division_ids", "The division_ids field is required.");
    }
    for (i, division_id) in payload.division_ids.iter().enumerate() {
        if !state.repo.division_exists(*division_id).await? {
            errors.add(
                format!("division_ids.{i}"),
                "The selected division is invalid.",
            );
        }
    }
    if let Some(anggota) = &payload.anggota {
        validate_anggota(&state, &mut errors, anggota).await?;
    }
    errors.into_result()?;

    let proker = state.repo.create_proker(payload).await?;
    let detail = state
        .repo
        .get_proker_detail(proker.id)
        .await?
        .ok_or(ApiError::NotFound("proker"))?;

    audit(
        &state.repo,
        Some(auth.id()),
        "create_proker",
        &format!("Created proker: {}", proker.title),
    )
    .await;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "proker": detail,
            "message": "Proker created successfully",
        })),
    ))
}

/// update_proker
///
/// [Authenticated Route] Partial update. A present `division_ids` replaces
/// the full division set; an absent one leaves it untouched.
#[utoipa::path(
    put,
    path = "/prokers/{id}",
    params(("id" = Uuid, Path, description = "Proker ID")),
    request_body = UpdateProkerRequest,
    responses((status = 200, description = "Proker updated"), (status = 404, description = "Not Found"))
)]
pub async fn update_proker(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProkerRequest>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::PROKERS, Action::Edit)?;

    let mut errors = ValidationErrors::new();
    validate_proker_fields(
        &mut errors,
        payload.title.as_deref(),
        payload.status.as_deref(),
    );
    if let Some(division_ids) = &payload.division_ids {
        for (i, division_id) in division_ids.iter().enumerate() {
            if !state.repo.division_exists(*division_id).await? {
                errors.add(
                    format!("division_ids.{i}"),
                    "The selected division is invalid.",
                );
            }
        }
    }
    errors.into_result()?;

    let proker = state
        .repo
        .update_proker(id, payload)
        .await?
        .ok_or(ApiError::NotFound("proker"))?;
    let detail = state
        .repo
        .get_proker_detail(id)
        .await?
        .ok_or(ApiError::NotFound("proker"))?;

    audit(
        &state.repo,
        Some(auth.id()),
        "update_proker",
        &format!("Updated proker: {}", proker.title),
    )
    .await;

    Ok(Json(json!({
        "proker": detail,
        "message": "Proker updated successfully",
    })))
}

#[utoipa::path(
    delete,
    path = "/prokers/{id}",
    params(("id" = Uuid, Path, description = "Proker ID")),
    responses((status = 200, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete_proker(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::PROKERS, Action::Delete)?;

    let proker = state
        .repo
        .get_proker(id)
        .await?
        .ok_or(ApiError::NotFound("proker"))?;

    if !state.repo.delete_proker(id).await? {
        return Err(ApiError::NotFound("proker"));
    }

    audit(
        &state.repo,
        Some(auth.id()),
        "delete_proker",
        &format!("Deleted proker: {}", proker.title),
    )
    .await;

    Ok(Json(json!({ "message": "Proker deleted successfully" })))
}

/// add_anggota
///
/// [Authenticated Route] Appends one membership row. The same user may hold
/// several rows on one proker under different committee roles.
#[utoipa::path(
    post,
    path = "/prokers/{id}/anggota",
    params(("id" = Uuid, Path, description = "Proker ID")),
    request_body = AnggotaInput,
    responses((status = 201, description = "Membership added"))
)]
pub async fn add_anggota(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnggotaInput>,
) -> Result<(axum::http::StatusCode, Json<Value>), ApiError> {
    auth.require(modules::PROKERS, Action::Edit)?;

    if state.repo.get_proker(id).await?.is_none() {
        return Err(ApiError::NotFound("proker"));
    }

    let mut errors = ValidationErrors::new();
    validate_anggota(&state, &mut errors, std::slice::from_ref(&payload)).await?;
    errors.into_result()?;

    let anggota = state.repo.add_anggota(id, payload).await?;

    audit(
        &state.repo,
        Some(auth.id()),
        "add_anggota",
        &format!("Added member {} to proker {id}", anggota.user_name),
    )
    .await;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "anggota": anggota,
            "message": "Member added successfully",
        })),
    ))
}

/// remove_anggota
///
/// [Authenticated Route] 404s when the membership exists but belongs to a
/// different proker, so callers cannot detach rows across prokers.
#[utoipa::path(
    delete,
    path = "/prokers/{id}/anggota/{anggota_id}",
    params(
        ("id" = Uuid, Path, description = "Proker ID"),
        ("anggota_id" = Uuid, Path, description = "Membership ID")
    ),
    responses((status = 200, description = "Removed"), (status = 404, description = "Not Found"))
)]
pub async fn remove_anggota(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, anggota_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::PROKERS, Action::Edit)?;

    if !state.repo.remove_anggota(id, anggota_id).await? {
        return Err(ApiError::NotFound("anggota"));
    }

    audit(
        &state.repo,
        Some(auth.id()),
        "remove_anggota",
        &format!("Removed membership {anggota_id} from proker {id}"),
    )
    .await;

    Ok(Json(json!({ "message": "Member removed successfully" })))
}

/// add_media
///
/// [Authenticated Route] Attaches an image or video URL to the proker's
/// gallery.
#[utoipa::path(
    post,
    path = "/prokers/{id}/media",
    params(("id" = Uuid, Path, description = "Proker ID")),
    request_body = AddMediaRequest,
    responses((status = 201, description = "Media added"))
)]
pub async fn add_media(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMediaRequest>,
) -> Result<(axum::http::StatusCode, Json<Value>), ApiError> {
    auth.require(modules::PROKERS, Action::Edit)?;

    if state.repo.get_proker(id).await?.is_none() {
        return Err(ApiError::NotFound("proker"));
    }

    let mut errors = ValidationErrors::new();
    check_required(&mut errors, "media_url", &payload.media_url);
    check_in(&mut errors, "media_type", &payload.media_type, &["image", "video"]);
    errors.into_result()?;

    let media = state.repo.add_media(id, payload).await?;

    audit(
        &state.repo,
        Some(auth.id()),
        "add_media",
        &format!("Added {} media to proker {id}", media.media_type),
    )
    .await;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "media": media,
            "message": "Media added successfully",
        })),
    ))
}

/// remove_media
///
/// [Authenticated Route] Same ownership rule as memberships: the media row
/// must belong to the proker named in the path.
#[utoipa::path(
    delete,
    path = "/prokers/{id}/media/{media_id}",
    params(
        ("id" = Uuid, Path, description = "Proker ID"),
        ("media_id" = Uuid, Path, description = "Media ID")
    ),
    responses((status = 200, description = "Removed"), (status = 404, description = "Not Found"))
)]
pub async fn remove_media(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, media_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    auth.require(modules::PROKERS, Action::Edit)?;

    if !state.repo.remove_media(id, media_id).await? {
        return Err(ApiError::NotFound("media"));
    }

    audit(
        &state.repo,
        Some(auth.id()),
        "remove_media",
        &format!("Removed media {media_id} from proker {id}"),
    )
    .await;

    Ok(Json(json!({ "message": "Media removed successfully" })))
}

/// list_public_media
///
/// [Public Route] Gallery feed for the landing page: media from finished
/// prokers only, newest first.
#[utoipa::path(
    get,
    path = "/proker-media",
    responses((status = 200, description = "Public gallery", body = Vec<ProkerMedia>))
)]
pub async fn list_public_media(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProkerMedia>>, ApiError> {
    Ok(Json(state.repo.list_public_media().await?))
}
