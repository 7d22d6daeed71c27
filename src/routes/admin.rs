use crate::{AppState, handlers};
use axum::{Router, routing::delete};

/// Admin Router Module
///
/// Routes reserved for the ADMIN role. Authentication comes from the
/// handler's `AuthUser` extractor; the role gate is the first thing the
/// handler does, before even validating the path id, so non-admins learn
/// nothing about which articles exist.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // DELETE /articles/{id}
        // Removes an article permanently. ADMIN only.
        .route("/articles/{id}", delete(handlers::delete_article))
}
