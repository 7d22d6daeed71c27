use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are unauthenticated and accessible to any client: public
/// article reads, plus registration and login as the gateway into the
/// authenticated tiers.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /auth/register
        // Creates an account and returns the user's projection plus a token.
        .route("/auth/register", post(handlers::register))
        // POST /auth/login
        // Verifies credentials and returns a fresh token.
        .route("/auth/login", post(handlers::login))
        // GET /articles?page&limit&status&search
        // Paginated public listing with filtering and substring search.
        .route("/articles", get(handlers::list_articles))
        // GET /articles/{id}
        // Single article with its author's projection embedded.
        .route("/articles/{id}", get(handlers::get_article))
        // GET /health
        // Liveness endpoint for monitoring and load balancer checks.
        .route("/health", get(handlers::health))
}
