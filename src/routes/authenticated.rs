use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for any user who passed the authentication layer. Handlers receive
/// the resolved `AuthUser` and run their own role/ownership checks on top:
/// creation is gated to ADMIN/EDITOR, updates to the article's author or an
/// ADMIN (evaluated after the article is loaded).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me
        // The authenticated principal's non-secret profile.
        .route("/auth/me", get(handlers::me))
        // POST /articles
        // Multipart article creation (title, content, status?, image?).
        // ADMIN/EDITOR only; the author is always the requester.
        .route("/articles", post(handlers::create_article))
        // PUT /articles/{id}
        // Multipart partial update of any subset of fields. Owner-or-admin
        // is enforced in the handler once the article is loaded.
        .route("/articles/{id}", put(handlers::update_article))
}
