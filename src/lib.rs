use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
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
pub mod repository;
pub mod storage;
pub mod validation;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point
// and the integration tests.
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use storage::{LocalDiskStorage, MockStorageService, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation for the application from the
/// `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` annotations. Served as
/// JSON at `/api-docs/openapi.json` with the UI at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::me,
        handlers::list_articles, handlers::get_article, handlers::create_article,
        handlers::update_article, handlers::delete_article, handlers::health
    ),
    components(
        schemas(
            models::Role, models::ArticleStatus, models::PublicUser,
            models::Article, models::ArticleWithAuthor, models::ArticleList,
            models::Pagination, models::RegisterRequest, models::LoginRequest,
            models::AuthPayload
        )
    ),
    tags(
        (name = "content-workspace", description = "Secure Content Workspace API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all application
/// services and configuration, shared across every request. Handlers pull
/// individual components out via `FromRef`.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: all persistence access behind the trait object.
    pub repo: RepositoryState,
    /// Storage layer: uploaded image persistence and cleanup.
    pub storage: StorageState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Allow extractors (notably AuthUser) to pull components out of the shared
// state without seeing the whole of it.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the authenticated route tier. `AuthUser`
/// implements `FromRequestParts`, so a failed extraction (missing/expired
/// token, vanished user) rejects the request with the extractor's 401 before
/// the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the full routing structure: documentation, the `/api` tier
/// (public + authenticated + admin), static serving of uploads, the root
/// index and 404 fallback, and the observability/CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS configuration.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. The /api tier: public routes carry no middleware; the authenticated
    // router is wrapped by the auth layer; admin routes authenticate through
    // their handler extractor and role-gate inside the handler.
    let api = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .merge(admin::admin_routes());

    // 3. Base router assembly.
    let base_router = Router::new()
        // Documentation: auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Root index.
        .route("/", get(handlers::root))
        // The versionless API surface.
        .nest("/api", api)
        // Uploaded images, exposed at /uploads/<filename>.
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        // Uniform JSON 404 for unmatched routes.
        .fallback(handlers::not_found)
        // Multipart uploads may exceed the framework's default body cap.
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes + 64 * 1024))
        .with_state(state);

    // 4. Observability and correlation layers (outermost).
    base_router
        .layer(
            ServiceBuilder::new()
                // Request ID generation for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Request tracing spanning the whole request/response
                // lifecycle, correlated by the generated id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Return the generated x-request-id header to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS layer.
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the `TraceLayer` span so every log line for a request carries
/// the method, URI and correlation id.
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
