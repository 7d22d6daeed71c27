use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{
    Article, ArticlePatch, ArticleRow, ArticleStatus, ArticleWithAuthor, NewArticle, NewUser,
    PublicUser, User,
};

/// ArticleFilter
///
/// Listing parameters after validation and clamping: `skip`/`limit` are the
/// final window, `status` is an exact match, `search` a substring match on
/// title or content.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub status: Option<ArticleStatus>,
    pub search: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

/// Repository Trait
///
/// The abstract contract for all persistence operations, constructed once at
/// startup and shared read-only across request handlers. Handlers never see
/// the concrete backend, which keeps tests on in-memory/mock implementations.
///
/// Every method is a single-statement operation; errors propagate as
/// `sqlx::Error` and are classified centrally (`ApiError::from`).
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Full record lookup, hash included. Only the login flow may call this;
    /// everything client-facing goes through `find_public_user`.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    /// Non-secret projection lookup used by authentication.
    async fn find_public_user(&self, id: Uuid) -> Result<Option<PublicUser>, sqlx::Error>;
    /// Inserts a new user. Email uniqueness is enforced by the database
    /// constraint; a duplicate surfaces as a unique-violation error.
    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error>;

    // --- Articles ---
    /// One page of articles with embedded authors, newest first, plus the
    /// total row count matching the filters.
    async fn list_articles(
        &self,
        filter: ArticleFilter,
    ) -> Result<(Vec<ArticleWithAuthor>, i64), sqlx::Error>;
    async fn find_article_with_author(
        &self,
        id: Uuid,
    ) -> Result<Option<ArticleWithAuthor>, sqlx::Error>;
    /// Bare article lookup; the update flow loads this before the
    /// ownership-or-admin decision.
    async fn find_article(&self, id: Uuid) -> Result<Option<Article>, sqlx::Error>;
    async fn create_article(&self, article: NewArticle) -> Result<ArticleWithAuthor, sqlx::Error>;
    /// Applies only the `Some` fields of the patch (COALESCE), returning the
    /// updated article with author, or None when the id does not exist.
    async fn update_article(
        &self,
        id: Uuid,
        patch: ArticlePatch,
    ) -> Result<Option<ArticleWithAuthor>, sqlx::Error>;
    /// Returns true when a row was actually deleted.
    async fn delete_article(&self, id: Uuid) -> Result<bool, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The production implementation, backed by a PostgreSQL connection pool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Shared SELECT list for the article/author join; aliases line up with the
// `ArticleRow` mapping struct.
const ARTICLE_WITH_AUTHOR_SELECT: &str = r#"
    SELECT
        a.id, a.title, a.content, a.image_url, a.status, a.author_id,
        a.created_at, a.updated_at,
        u.email AS author_email, u.name AS author_name,
        u.role AS author_role, u.created_at AS author_created_at
    FROM articles a
    JOIN users u ON a.author_id = u.id
"#;

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, name, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_public_user(&self, id: Uuid) -> Result<Option<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            "SELECT id, email, name, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let new_id = Uuid::new_v4();
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, name, role, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, email, password_hash, name, role, created_at
            "#,
        )
        .bind(new_id)
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.name)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
    }

    /// list_articles
    ///
    /// Builds the filtered listing with QueryBuilder so every client value is
    /// bound, never interpolated. The substring search uses ILIKE and is
    /// therefore case-insensitive; callers and API docs rely on that choice.
    async fn list_articles(
        &self,
        filter: ArticleFilter,
    ) -> Result<(Vec<ArticleWithAuthor>, i64), sqlx::Error> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(ARTICLE_WITH_AUTHOR_SELECT);
        builder.push(" WHERE 1 = 1 ");

        if let Some(status) = filter.status {
            builder.push(" AND a.status = ");
            builder.push_bind(status);
        }

        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            builder.push(" AND (a.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR a.content ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY a.created_at DESC LIMIT ");
        builder.push_bind(filter.limit);
        builder.push(" OFFSET ");
        builder.push_bind(filter.skip);

        let rows: Vec<ArticleRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        // Matching total for the pagination metadata, same filters, no window.
        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM articles a WHERE 1 = 1 ");

        if let Some(status) = filter.status {
            count_builder.push(" AND a.status = ");
            count_builder.push_bind(status);
        }

        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            count_builder.push(" AND (a.title ILIKE ");
            count_builder.push_bind(pattern.clone());
            count_builder.push(" OR a.content ILIKE ");
            count_builder.push_bind(pattern);
            count_builder.push(")");
        }

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(ArticleWithAuthor::from).collect(), total))
    }

    async fn find_article_with_author(
        &self,
        id: Uuid,
    ) -> Result<Option<ArticleWithAuthor>, sqlx::Error> {
        let query = format!("{ARTICLE_WITH_AUTHOR_SELECT} WHERE a.id = $1");
        let row = sqlx::query_as::<_, ArticleRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ArticleWithAuthor::from))
    }

    async fn find_article(&self, id: Uuid) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT id, title, content, image_url, status, author_id, created_at, updated_at
            FROM articles WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// create_article
    ///
    /// Insert and author join in one statement (CTE), so the response shape
    /// comes back without a second round-trip. The author_id FK is the only
    /// existence check on the author.
    async fn create_article(&self, article: NewArticle) -> Result<ArticleWithAuthor, sqlx::Error> {
        let new_id = Uuid::new_v4();
        let row = sqlx::query_as::<_, ArticleRow>(
            r#"
            WITH inserted AS (
                INSERT INTO articles (id, title, content, image_url, status, author_id, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
                RETURNING id, title, content, image_url, status, author_id, created_at, updated_at
            )
            SELECT
                i.id, i.title, i.content, i.image_url, i.status, i.author_id,
                i.created_at, i.updated_at,
                u.email AS author_email, u.name AS author_name,
                u.role AS author_role, u.created_at AS author_created_at
            FROM inserted i
            JOIN users u ON i.author_id = u.id
            "#,
        )
        .bind(new_id)
        .bind(article.title)
        .bind(article.content)
        .bind(article.image_url)
        .bind(article.status)
        .bind(article.author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ArticleWithAuthor::from(row))
    }

    /// update_article
    ///
    /// COALESCE keeps every column whose patch field is None, giving partial
    /// update semantics in a single statement.
    async fn update_article(
        &self,
        id: Uuid,
        patch: ArticlePatch,
    ) -> Result<Option<ArticleWithAuthor>, sqlx::Error> {
        let row = sqlx::query_as::<_, ArticleRow>(
            r#"
            WITH updated AS (
                UPDATE articles
                SET title = COALESCE($2, title),
                    content = COALESCE($3, content),
                    status = COALESCE($4, status),
                    image_url = COALESCE($5, image_url),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING id, title, content, image_url, status, author_id, created_at, updated_at
            )
            SELECT
                p.id, p.title, p.content, p.image_url, p.status, p.author_id,
                p.created_at, p.updated_at,
                u.email AS author_email, u.name AS author_name,
                u.role AS author_role, u.created_at AS author_created_at
            FROM updated p
            JOIN users u ON p.author_id = u.id
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.content)
        .bind(patch.status)
        .bind(patch.image_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ArticleWithAuthor::from))
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
