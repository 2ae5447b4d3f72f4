use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod permissions;
pub mod repository;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application by aggregating every handler decorated with `#[utoipa::path]`
/// and every schema deriving `ToSchema`. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login, handlers::auth::logout, handlers::auth::me,
        handlers::auth::update_profile, handlers::auth::change_password,
        handlers::dashboard::dashboard,
        handlers::users::list_users, handlers::users::create_user, handlers::users::get_user,
        handlers::users::update_user, handlers::users::delete_user,
        handlers::divisions::list_divisions, handlers::divisions::create_division,
        handlers::divisions::update_division, handlers::divisions::delete_division,
        handlers::positions::list_positions, handlers::positions::create_position,
        handlers::positions::update_position, handlers::positions::delete_position,
        handlers::prokers::list_prokers, handlers::prokers::get_proker,
        handlers::prokers::create_proker, handlers::prokers::update_proker,
        handlers::prokers::delete_proker, handlers::prokers::add_anggota,
        handlers::prokers::remove_anggota, handlers::prokers::add_media,
        handlers::prokers::remove_media, handlers::prokers::list_public_media,
        handlers::messages::create_message, handlers::messages::list_messages,
        handlers::messages::get_message, handlers::messages::update_message_status,
        handlers::messages::delete_message, handlers::messages::message_statistics,
        handlers::transactions::list_transactions, handlers::transactions::get_transaction,
        handlers::transactions::create_transaction, handlers::transactions::update_transaction,
        handlers::transactions::delete_transaction,
        handlers::transactions::transaction_statistics,
        handlers::transactions::monthly_transactions,
        handlers::settings::list_settings, handlers::settings::update_settings,
        handlers::settings::list_roles, handlers::settings::update_role_permissions,
        handlers::settings::list_audit_logs,
    ),
    components(
        schemas(
            models::User, models::Role, models::RolePermission, models::Position,
            models::Division, models::Proker, models::ProkerAnggota, models::AnggotaWithUser,
            models::ProkerMedia, models::Message, models::Transaction, models::Setting,
            models::AuditLogEntry, models::UserWithRole, models::ProkerDetail,
            models::RoleWithPermissions, models::ProkerWithDivisions,
            models::LoginRequest, models::LoginResponse, models::UpdateProfileRequest,
            models::ChangePasswordRequest, models::CreateUserRequest, models::UpdateUserRequest,
            models::CreateDivisionRequest, models::CreatePositionRequest, models::AnggotaInput,
            models::CreateProkerRequest, models::UpdateProkerRequest, models::AddMediaRequest,
            models::CreateMessageRequest, models::UpdateMessageStatusRequest,
            models::CreateTransactionRequest, models::UpdateTransactionRequest,
            models::PermissionEntry, models::UpdateRolePermissionsRequest,
            models::MessageStats, models::TransactionStats, models::MonthlyTransaction,
            models::ProkerStatusBreakdown, models::DivisionMemberCount, models::DashboardStats,
        )
    ),
    tags(
        (name = "osis-panel", description = "Student organization admin panel API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding the application's services and
/// configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Let handlers and extractors pull individual components out of the shared
// AppState instead of taking the whole struct.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the `authenticated_routes` tier. `AuthUser`
/// implements `FromRequestParts`, so a missing or invalid bearer token
/// rejects the request with 401 before any handler body runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the full routing structure, applies global and scoped
/// middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // CORS: the panel frontend and the landing site are served from other
    // origins, so everything is allowed through.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated routes: the extractor-based middleware rejects
        // unauthenticated requests at the router boundary.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .with_state(state);

    // Observability and correlation layers, applied outermost.
    base_router
        .layer(
            ServiceBuilder::new()
                // Request ID generation: a unique UUID per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Request tracing: wraps the request/response lifecycle in a
                // span carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Echo the x-request-id header back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: pulls the `x-request-id` header into the
/// structured logging metadata alongside the HTTP method and URI, so every
/// log line of one request shares a correlation ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
