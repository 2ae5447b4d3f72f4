use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// The whole admin panel. Every handler here takes the `AuthUser` extractor,
/// so an invalid or missing bearer token short-circuits to 401 before the
/// handler body runs. Authorization is finer-grained than the router: each
/// handler checks the (module, action) grant it needs against the acting
/// user's role matrix, which admins can edit at runtime.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Session & profile ---
        .route("/logout", post(handlers::auth::logout))
        .route("/me", get(handlers::auth::me))
        .route("/me/profile", put(handlers::auth::update_profile))
        .route("/me/password", put(handlers::auth::change_password))
        // --- Dashboard ---
        .route("/dashboard", get(handlers::dashboard::dashboard))
        // --- Users ---
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        // --- Divisions (public list lives in the public router) ---
        .route("/divisions", post(handlers::divisions::create_division))
        .route(
            "/divisions/{id}",
            put(handlers::divisions::update_division)
                .delete(handlers::divisions::delete_division),
        )
        // --- Positions (reference data, gated behind Settings) ---
        .route(
            "/positions",
            get(handlers::positions::list_positions).post(handlers::positions::create_position),
        )
        .route(
            "/positions/{id}",
            put(handlers::positions::update_position)
                .delete(handlers::positions::delete_position),
        )
        // --- Prokers ---
        .route(
            "/prokers",
            get(handlers::prokers::list_prokers).post(handlers::prokers::create_proker),
        )
        .route(
            "/prokers/{id}",
            get(handlers::prokers::get_proker)
                .put(handlers::prokers::update_proker)
                .delete(handlers::prokers::delete_proker),
        )
        // Membership rows; removal 404s unless the row belongs to the proker
        // named in the path.
        .route("/prokers/{id}/anggota", post(handlers::prokers::add_anggota))
        .route(
            "/prokers/{id}/anggota/{anggota_id}",
            delete(handlers::prokers::remove_anggota),
        )
        .route("/prokers/{id}/media", post(handlers::prokers::add_media))
        .route(
            "/prokers/{id}/media/{media_id}",
            delete(handlers::prokers::remove_media),
        )
        // --- Messages (public submission lives in the public router) ---
        .route("/messages", get(handlers::messages::list_messages))
        .route(
            "/messages/statistics",
            get(handlers::messages::message_statistics),
        )
        .route(
            "/messages/{id}",
            get(handlers::messages::get_message).delete(handlers::messages::delete_message),
        )
        .route(
            "/messages/{id}/status",
            put(handlers::messages::update_message_status),
        )
        // --- Transactions ---
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions)
                .post(handlers::transactions::create_transaction),
        )
        .route(
            "/transactions-statistics",
            get(handlers::transactions::transaction_statistics),
        )
        .route(
            "/transactions-monthly",
            get(handlers::transactions::monthly_transactions),
        )
        .route(
            "/transactions/{id}",
            get(handlers::transactions::get_transaction)
                .put(handlers::transactions::update_transaction)
                .delete(handlers::transactions::delete_transaction),
        )
        // --- Settings, roles & audit trail ---
        .route(
            "/settings",
            get(handlers::settings::list_settings).put(handlers::settings::update_settings),
        )
        .route("/roles", get(handlers::settings::list_roles))
        .route(
            "/roles/{id}/permissions",
            put(handlers::settings::update_role_permissions),
        )
        .route("/audit-logs", get(handlers::settings::list_audit_logs))
}
