use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints the landing site needs with no session: the health probe, the
/// login gateway, the contact form, the division list and the gallery feed.
/// Everything else lives behind the authenticated router.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /login
        // Exchanges username-or-email plus password for an opaque bearer
        // token. Field-level 422s distinguish unknown identifier, wrong
        // password and inactive account.
        .route("/login", post(handlers::auth::login))
        // POST /messages
        // Contact-form submission from the landing page. Always created as
        // unread; no session involved.
        .route("/messages", post(handlers::messages::create_message))
        // GET /divisions
        // Division list, rendered on the public organization-structure page.
        .route("/divisions", get(handlers::divisions::list_divisions))
        // GET /proker-media
        // Gallery feed: media attached to finished prokers, newest first.
        .route("/proker-media", get(handlers::prokers::list_public_media))
}
