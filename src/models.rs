use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC field for a user, stored as the Postgres enum `user_role`.
/// Roles are assigned at registration and immutable through the exposed
/// operations (there is no role-update endpoint).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Admin,
    Editor,
    #[default]
    Viewer,
}

/// ArticleStatus
///
/// Publication state of an article, stored as the Postgres enum
/// `article_status`. New articles default to Draft.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "article_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum ArticleStatus {
    #[default]
    Draft,
    Published,
}

/// User
///
/// The canonical identity record from the `users` table. The stored password
/// hash never leaves the process: it is skipped on serialization and the
/// repository exposes `PublicUser` for anything client-facing.
#[derive(Debug, Clone, Serialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// PublicUser
///
/// The non-secret projection of a user: the only user shape that crosses the
/// API boundary (registration/login payloads, embedded article authors,
/// GET /auth/me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Article
///
/// A content unit from the `articles` table. `author_id` references exactly
/// one user, is set at creation and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    // Set by the multipart upload side-channel; served at /uploads.
    pub image_url: Option<String>,
    pub status: ArticleStatus,
    pub author_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ArticleWithAuthor
///
/// An article enriched with its author's non-secret projection. This is the
/// shape every article read/write operation returns to clients.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArticleWithAuthor {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: ArticleStatus,
    pub author_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub author: PublicUser,
}

/// ArticleRow
///
/// Flat row produced by the article/author JOIN queries. The repository maps
/// it into `ArticleWithAuthor` (the aliased `author_*` columns become the
/// embedded projection).
#[derive(Debug, Clone, FromRow)]
pub struct ArticleRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: ArticleStatus,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_email: String,
    pub author_name: String,
    pub author_role: Role,
    pub author_created_at: DateTime<Utc>,
}

impl From<ArticleRow> for ArticleWithAuthor {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            image_url: row.image_url,
            status: row.status,
            author_id: row.author_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author: PublicUser {
                id: row.author_id,
                email: row.author_email,
                name: row.author_name,
                role: row.author_role,
                created_at: row.author_created_at,
            },
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /auth/register. Every field is optional at the
/// deserialization layer so the validators can report all missing/invalid
/// fields at once instead of failing on the first serde mismatch.
#[derive(Debug, Clone, Deserialize, Serialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    /// Optional role; defaults to VIEWER when absent.
    pub role: Option<String>,
}

/// LoginRequest
///
/// Input payload for POST /auth/login.
#[derive(Debug, Clone, Deserialize, Serialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// ArticleListQuery
///
/// Accepted query parameters for GET /articles. Page and limit arrive as raw
/// strings and are checked as digit strings by the validation layer before
/// any arithmetic happens.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct ArticleListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

// --- Repository Inputs ---

/// NewUser
///
/// Insert payload for the users table; built by the register flow after
/// validation and hashing.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
}

/// NewArticle
///
/// Insert payload for the articles table. `author_id` comes from the
/// authenticated principal, never from the request body.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub status: ArticleStatus,
    pub author_id: Uuid,
}

/// ArticlePatch
///
/// Partial update for PUT /articles/{id}: only `Some` fields are applied
/// (COALESCE semantics in the repository), leaving omitted fields unchanged.
#[derive(Debug, Clone, Default)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<ArticleStatus>,
    pub image_url: Option<String>,
}

// --- Response Schemas (Output) ---

/// AuthPayload
///
/// Output of register/login: the user's non-secret projection plus a freshly
/// issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthPayload {
    pub user: PublicUser,
    pub token: String,
}

/// Pagination
///
/// Metadata accompanying every article listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    /// Total rows matching the active filters, not just this page.
    pub total: i64,
    pub total_pages: i64,
}

/// ArticleList
///
/// Output of GET /articles: one page of articles plus pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArticleList {
    pub articles: Vec<ArticleWithAuthor>,
    pub pagination: Pagination,
}
