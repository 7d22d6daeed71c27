use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, Uri, header},
};
use serde_json::{Value, json};

use crate::{
    AppState,
    auth::{AuthUser, hash_password, issue_token, require_role, verify_password},
    config::AppConfig,
    error::ApiError,
    models::{
        ArticleList, ArticleListQuery, ArticlePatch, ArticleWithAuthor, AuthPayload,
        LoginRequest, NewArticle, NewUser, Pagination, PublicUser, RegisterRequest, Role,
    },
    repository::ArticleFilter,
    storage::{StorageState, StoredUpload, is_allowed_image_type},
    validation::{self, FieldError, ListInput},
};

// --- Multipart Form Support ---

/// ArticleForm
///
/// Text fields and the optionally-persisted image collected from a multipart
/// article request. By the time this struct exists, any image has already
/// been written to storage; validation failures after that point must delete
/// it again (see `discard_upload`).
#[derive(Debug, Default)]
pub struct ArticleForm {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub image: Option<StoredUpload>,
}

fn malformed_body(detail: impl std::fmt::Display) -> ApiError {
    ApiError::validation(vec![FieldError::new(
        "body",
        format!("Malformed multipart body: {detail}"),
    )])
}

/// Reads an article multipart form. The image field is constrained (accepted
/// mime types, configured size cap) and persisted as it streams past; if any
/// later field fails, the already-persisted image is removed before the
/// error propagates, so no failure path leaks an orphaned upload.
async fn read_article_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<ArticleForm, ApiError> {
    let mut form = ArticleForm::default();

    let result: Result<(), ApiError> = async {
        while let Some(field) = multipart.next_field().await.map_err(malformed_body)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "title" => form.title = Some(field.text().await.map_err(malformed_body)?),
                "content" => form.content = Some(field.text().await.map_err(malformed_body)?),
                "status" => form.status = Some(field.text().await.map_err(malformed_body)?),
                "image" => {
                    let original = field.file_name().unwrap_or("upload.bin").to_string();
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    if !is_allowed_image_type(&content_type) {
                        return Err(ApiError::UnsupportedMediaType(format!(
                            "Unsupported image type: {content_type}. Only JPEG, PNG, GIF and WebP are accepted."
                        )));
                    }

                    let bytes = field.bytes().await.map_err(malformed_body)?;
                    if bytes.len() > state.config.max_upload_bytes {
                        return Err(ApiError::PayloadTooLarge(format!(
                            "Image exceeds the maximum upload size of {} bytes.",
                            state.config.max_upload_bytes
                        )));
                    }

                    let stored = state
                        .storage
                        .store(&original, &bytes)
                        .await
                        .map_err(ApiError::internal)?;
                    form.image = Some(stored);
                }
                // Unknown fields pass through, matching the permissive body
                // contract of the JSON endpoints.
                _ => {}
            }
        }
        Ok(())
    }
    .await;

    if let Err(err) = result {
        discard_upload(&state.storage, &form.image).await;
        return Err(err);
    }

    Ok(form)
}

/// Best-effort removal of an upload that lost its request (validation
/// failure, malformed trailing fields). Failure to delete is logged, never
/// escalated to the caller.
async fn discard_upload(storage: &StorageState, image: &Option<StoredUpload>) {
    if let Some(image) = image {
        if let Err(e) = storage.delete(&image.filename).await {
            tracing::warn!("failed to delete upload after validation failure: {}", e);
        }
    }
}

/// Public URL for a stored upload, built from the requesting client's view of
/// the server (forwarded proto when behind a proxy, Host header).
fn public_upload_url(headers: &HeaderMap, filename: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}/uploads/{filename}")
}

// --- Pagination Arithmetic ---

/// Resolves the listing window: page defaults to 1 and is clamped to a
/// minimum of 1; limit defaults from config and is clamped to the configured
/// maximum. Only an upper clamp applies to limit; a zero limit simply yields
/// an empty page.
pub fn page_window(input: &ListInput, config: &AppConfig) -> (i64, i64, i64) {
    let page = input.page.unwrap_or(1).max(1);
    let limit = input.limit.unwrap_or(config.default_limit).min(config.max_limit);
    let skip = (page - 1) * limit;
    (page, limit, skip)
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 { 0 } else { (total + limit - 1) / limit }
}

// --- Auth Handlers ---

/// register
///
/// [Public Route] Creates a user account: uniqueness check, bcrypt hash,
/// insert, token issuance. The response carries only the non-secret
/// projection.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthPayload),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input = validation::validate_register(&payload).map_err(ApiError::validation)?;

    if state.repo.find_user_by_email(&input.email).await?.is_some() {
        return Err(ApiError::conflict("User with this email already exists"));
    }

    let password_hash = hash_password(input.password, state.config.bcrypt_cost).await?;

    let user = state
        .repo
        .create_user(NewUser {
            email: input.email,
            password_hash,
            name: input.name,
            role: input.role,
        })
        .await?;

    let token = issue_token(user.id, user.role, &state.config)?;
    let payload = AuthPayload {
        user: PublicUser::from(user),
        token,
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "data": payload,
        })),
    ))
}

/// login
///
/// [Public Route] Verifies credentials and issues a fresh token. An unknown
/// email and a wrong password produce the identical response, so account
/// existence is never revealed.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthPayload),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input = validation::validate_login(&payload).map_err(ApiError::validation)?;

    let user = state
        .repo
        .find_user_by_email(&input.email)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("Invalid email or password"))?;

    let valid = verify_password(input.password, user.password_hash.clone()).await?;
    if !valid {
        return Err(ApiError::unauthenticated("Invalid email or password"));
    }

    let token = issue_token(user.id, user.role, &state.config)?;
    let payload = AuthPayload {
        user: PublicUser::from(user),
        token,
    };

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Login successful",
            "data": payload,
        })),
    ))
}

/// me
///
/// [Authenticated Route] The authenticated principal's profile, exactly as
/// resolved by the extractor.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Profile", body = PublicUser),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn me(user: AuthUser) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "user": user.public() },
        })),
    )
}

// --- Article Handlers ---

/// list_articles
///
/// [Public Route] Paginated, filterable listing. Most recent first; each
/// article embeds its author's projection. The search filter matches title or
/// content case-insensitively (ILIKE).
#[utoipa::path(
    get,
    path = "/api/articles",
    params(ArticleListQuery),
    responses(
        (status = 200, description = "One page of articles", body = ArticleList),
        (status = 400, description = "Validation error")
    )
)]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleListQuery>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let input = validation::validate_list_query(&query).map_err(ApiError::validation)?;

    let (page, limit, skip) = page_window(&input, &state.config);

    let (articles, total) = state
        .repo
        .list_articles(ArticleFilter {
            status: input.status,
            search: input.search,
            skip,
            limit,
        })
        .await?;

    let list = ArticleList {
        articles,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: total_pages(total, limit),
        },
    };

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "data": list })),
    ))
}

/// get_article
///
/// [Public Route] Single article with embedded author.
#[utoipa::path(
    get,
    path = "/api/articles/{id}",
    params(("id" = String, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Found", body = ArticleWithAuthor),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = validation::parse_article_id(&id).map_err(ApiError::validation)?;

    let article = state
        .repo
        .find_article_with_author(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "data": { "article": article } })),
    ))
}

/// create_article
///
/// [Authenticated Route: ADMIN or EDITOR] Creates an article from a
/// multipart form. The author is always the authenticated principal; a
/// supplied image becomes the article's public image URL.
#[utoipa::path(
    post,
    path = "/api/articles",
    responses(
        (status = 201, description = "Created", body = ArticleWithAuthor),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Role not allowed")
    )
)]
pub async fn create_article(
    user: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_role(&user, &[Role::Admin, Role::Editor])?;

    let form = read_article_form(&state, multipart).await?;

    let input = match validation::validate_create_article(&form.title, &form.content, &form.status)
    {
        Ok(input) => input,
        Err(errors) => {
            discard_upload(&state.storage, &form.image).await;
            return Err(ApiError::validation(errors));
        }
    };

    let image_url = form
        .image
        .as_ref()
        .map(|image| public_upload_url(&headers, &image.filename));

    let article = state
        .repo
        .create_article(NewArticle {
            title: input.title,
            content: input.content,
            image_url,
            status: input.status,
            author_id: user.id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Article created successfully",
            "data": { "article": article },
        })),
    ))
}

/// update_article
///
/// [Authenticated Route: owner or ADMIN] Partial update: only supplied
/// fields change. The ownership-or-admin rule is evaluated here, after the
/// article is loaded, because it depends on the stored author.
#[utoipa::path(
    put,
    path = "/api/articles/{id}",
    params(("id" = String, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Updated", body = ArticleWithAuthor),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_article(
    user: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    // The id parses before the body is read, so a malformed id cannot leave
    // an uploaded file behind.
    let id = validation::parse_article_id(&id).map_err(ApiError::validation)?;

    let form = read_article_form(&state, multipart).await?;

    let input = match validation::validate_update_article(&form.title, &form.content, &form.status)
    {
        Ok(input) => input,
        Err(errors) => {
            discard_upload(&state.storage, &form.image).await;
            return Err(ApiError::validation(errors));
        }
    };

    let article = state
        .repo
        .find_article(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    if article.author_id != user.id && user.role != Role::Admin {
        return Err(ApiError::forbidden(
            "Access Denied: You can only edit articles that you have authored.",
        ));
    }

    let patch = ArticlePatch {
        title: input.title,
        content: input.content,
        status: input.status,
        image_url: form
            .image
            .as_ref()
            .map(|image| public_upload_url(&headers, &image.filename)),
    };

    let updated = state
        .repo
        .update_article(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Article updated successfully",
            "data": { "article": updated },
        })),
    ))
}

/// delete_article
///
/// [Authenticated Route: ADMIN only] The role gate runs before the existence
/// check: a non-admin receives 403 even for a nonexistent id, so existence is
/// never revealed to unauthorized callers.
#[utoipa::path(
    delete,
    path = "/api/articles/{id}",
    params(("id" = String, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if user.role != Role::Admin {
        return Err(ApiError::forbidden("Only admins can delete articles"));
    }

    let id = validation::parse_article_id(&id).map_err(ApiError::validation)?;

    state
        .repo
        .find_article(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;

    state.repo.delete_article(id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Article deleted successfully",
        })),
    ))
}

// --- Service Endpoints ---

/// health
///
/// [Public Route] Liveness check for monitoring and load balancers.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "status": "ok",
                "timestamp": chrono::Utc::now(),
            },
        })),
    )
}

/// root
///
/// [Public Route] API index: name, version and the endpoint map.
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Secure Content Workspace API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth",
            "articles": "/api/articles",
            "health": "/api/health",
        },
    }))
}

/// not_found
///
/// Global fallback for unmatched routes.
pub async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Route not found",
            "path": uri.path(),
        })),
    )
}
