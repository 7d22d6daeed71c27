use async_trait::async_trait;
use chrono::{Duration, Utc};
use content_workspace::{
    AppConfig, AppState, MockStorageService, create_router,
    models::{
        Article, ArticlePatch, ArticleStatus, ArticleWithAuthor, NewArticle, NewUser, PublicUser,
        Role, User,
    },
    repository::{ArticleFilter, Repository, RepositoryState},
    storage::StorageState,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use uuid::Uuid;

// --- In-Memory Repository ---

// A full, hermetic implementation of the Repository contract, so the entire
// HTTP surface can be exercised end-to-end without external services.
#[derive(Default)]
struct InMemoryRepository {
    users: Mutex<Vec<User>>,
    articles: Mutex<Vec<Article>>,
}

impl InMemoryRepository {
    fn author_of(&self, article: &Article) -> Option<PublicUser> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == article.author_id)
            .cloned()
            .map(PublicUser::from)
    }

    fn with_author(&self, article: &Article) -> Option<ArticleWithAuthor> {
        self.author_of(article).map(|author| ArticleWithAuthor {
            id: article.id,
            title: article.title.clone(),
            content: article.content.clone(),
            image_url: article.image_url.clone(),
            status: article.status,
            author_id: article.author_id,
            created_at: article.created_at,
            updated_at: article.updated_at,
            author,
        })
    }

    fn seed_user(&self, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@seed.test", Uuid::new_v4()),
            password_hash: String::new(),
            name: "Seeded Author".to_string(),
            role,
            created_at: Utc::now(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    fn seed_article(&self, author_id: Uuid, title: &str, content: &str, offset_secs: i64) {
        let stamp = Utc::now() + Duration::seconds(offset_secs);
        self.articles.lock().unwrap().push(Article {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            image_url: None,
            status: ArticleStatus::Draft,
            author_id,
            created_at: stamp,
            updated_at: stamp,
        });
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        // Case-sensitive, matching the unique index on the stored column.
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_public_user(&self, id: Uuid) -> Result<Option<PublicUser>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .map(PublicUser::from))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, sqlx::Error> {
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            role: user.role,
            created_at: Utc::now(),
        };
        self.users.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn list_articles(
        &self,
        filter: ArticleFilter,
    ) -> Result<(Vec<ArticleWithAuthor>, i64), sqlx::Error> {
        let articles = self.articles.lock().unwrap();

        let mut matching: Vec<&Article> = articles
            .iter()
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| {
                filter.search.as_deref().is_none_or(|needle| {
                    let needle = needle.to_lowercase();
                    a.title.to_lowercase().contains(&needle)
                        || a.content.to_lowercase().contains(&needle)
                })
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let page: Vec<ArticleWithAuthor> = matching
            .into_iter()
            .skip(filter.skip.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .filter_map(|a| self.with_author(a))
            .collect();

        Ok((page, total))
    }

    async fn find_article_with_author(
        &self,
        id: Uuid,
    ) -> Result<Option<ArticleWithAuthor>, sqlx::Error> {
        let articles = self.articles.lock().unwrap();
        Ok(articles
            .iter()
            .find(|a| a.id == id)
            .and_then(|a| self.with_author(a)))
    }

    async fn find_article(&self, id: Uuid) -> Result<Option<Article>, sqlx::Error> {
        Ok(self
            .articles
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn create_article(&self, article: NewArticle) -> Result<ArticleWithAuthor, sqlx::Error> {
        let now = Utc::now();
        let created = Article {
            id: Uuid::new_v4(),
            title: article.title,
            content: article.content,
            image_url: article.image_url,
            status: article.status,
            author_id: article.author_id,
            created_at: now,
            updated_at: now,
        };
        self.articles.lock().unwrap().push(created.clone());
        // The FK equivalent: a missing author is a storage-level failure.
        self.with_author(&created).ok_or(sqlx::Error::RowNotFound)
    }

    async fn update_article(
        &self,
        id: Uuid,
        patch: ArticlePatch,
    ) -> Result<Option<ArticleWithAuthor>, sqlx::Error> {
        let mut articles = self.articles.lock().unwrap();
        let Some(article) = articles.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            article.title = title;
        }
        if let Some(content) = patch.content {
            article.content = content;
        }
        if let Some(status) = patch.status {
            article.status = status;
        }
        if let Some(image_url) = patch.image_url {
            article.image_url = Some(image_url);
        }
        article.updated_at = Utc::now();

        let snapshot = article.clone();
        drop(articles);
        Ok(self.with_author(&snapshot))
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut articles = self.articles.lock().unwrap();
        let before = articles.len();
        articles.retain(|a| a.id != id);
        Ok(articles.len() < before)
    }
}

// --- Test App Harness ---

struct TestApp {
    address: String,
    repo: Arc<InMemoryRepository>,
    storage: Arc<MockStorageService>,
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::default());
    let storage = Arc::new(MockStorageService::new());
    let config = AppConfig::default();

    let state = AppState {
        repo: repo.clone() as RepositoryState,
        storage: storage.clone() as StorageState,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        storage,
    }
}

async fn register(
    app: &TestApp,
    client: &reqwest::Client,
    email: &str,
    role: Option<&str>,
) -> (String, Value) {
    let mut body = json!({
        "email": email,
        "password": "secret1",
        "name": "Test Person",
    });
    if let Some(role) = role {
        body["role"] = json!(role);
    }

    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&body)
        .send()
        .await
        .expect("register request failed");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.unwrap();
    let token = body["data"]["token"].as_str().unwrap().to_string();
    (token, body["data"]["user"].clone())
}

fn article_form(title: &str, content: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .text("title", title.to_string())
        .text("content", content.to_string())
}

// --- Service Endpoints ---

#[tokio::test]
async fn health_root_and_fallback() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["data"]["timestamp"].is_string());

    let response = client.get(&app.address).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/api/no-such-route", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
}

// --- Auth Flows ---

#[tokio::test]
async fn register_then_login_flow() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let (token, user) = register(&app, &client, "a@x.com", None).await;
    assert!(!token.is_empty());
    assert_eq!(user["email"], "a@x.com");
    assert_eq!(user["role"], "VIEWER");
    assert!(user.get("password_hash").is_none());

    // Second registration with the same email is a conflict.
    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({"email": "a@x.com", "password": "secret1", "name": "Another"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    // Login with the same credentials issues a working token.
    let response = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({"email": "a@x.com", "password": "secret1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let login_token = body["data"]["token"].as_str().unwrap();

    let response = client
        .get(format!("{}/api/auth/me", app.address))
        .bearer_auth(login_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user"]["email"], "a@x.com");

    // Wrong password and unknown email fail identically.
    let wrong = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({"email": "a@x.com", "password": "nope"}))
        .send()
        .await
        .unwrap();
    let unknown = client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({"email": "ghost@x.com", "password": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);
    assert_eq!(unknown.status(), 401);
    let wrong: Value = wrong.json().await.unwrap();
    let unknown: Value = unknown.json().await.unwrap();
    assert_eq!(wrong["message"], unknown["message"]);

    // /auth/me without a token is rejected.
    let response = client
        .get(format!("{}/api/auth/me", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn register_reports_field_errors() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({"email": "not-an-email", "password": "123", "name": "A"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password", "name"]);
}

// --- Article Flows ---

#[tokio::test]
async fn article_lifecycle_with_roles() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let (editor_token, editor) = register(&app, &client, "editor@x.com", Some("EDITOR")).await;
    let (viewer_token, _) = register(&app, &client, "viewer@x.com", None).await;
    let (admin_token, _) = register(&app, &client, "admin@x.com", Some("ADMIN")).await;

    // Empty public listing with the full pagination shape.
    let response = client
        .get(format!("{}/api/articles", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["articles"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["pagination"]["page"], 1);
    assert_eq!(body["data"]["pagination"]["limit"], 10);
    assert_eq!(body["data"]["pagination"]["total"], 0);

    // Creation requires a token.
    let response = client
        .post(format!("{}/api/articles", app.address))
        .multipart(article_form("Hi there", "1234567890"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // A viewer may not create.
    let response = client
        .post(format!("{}/api/articles", app.address))
        .bearer_auth(&viewer_token)
        .multipart(article_form("Hi there", "1234567890"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // An editor creates; status defaults to DRAFT and the author embeds.
    let response = client
        .post(format!("{}/api/articles", app.address))
        .bearer_auth(&editor_token)
        .multipart(article_form("Hi there", "1234567890"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let article = &body["data"]["article"];
    assert_eq!(article["status"], "DRAFT");
    assert_eq!(article["author"]["email"], editor["email"]);
    let article_id = article["id"].as_str().unwrap().to_string();

    // Fetch by id, and a miss for a random id.
    let response = client
        .get(format!("{}/api/articles/{}", app.address, article_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let response = client
        .get(format!("{}/api/articles/{}", app.address, Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // A non-author, non-admin cannot update, even with a valid payload.
    let response = client
        .put(format!("{}/api/articles/{}", app.address, article_id))
        .bearer_auth(&viewer_token)
        .multipart(reqwest::multipart::Form::new().text("title", "Hostile takeover"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Access Denied: You can only edit articles that you have authored."
    );

    // The author updates one field; the rest stay unchanged.
    let response = client
        .put(format!("{}/api/articles/{}", app.address, article_id))
        .bearer_auth(&editor_token)
        .multipart(reqwest::multipart::Form::new().text("title", "Updated title"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["article"]["title"], "Updated title");
    assert_eq!(body["data"]["article"]["content"], "1234567890");

    // An admin updates a foreign article.
    let response = client
        .put(format!("{}/api/articles/{}", app.address, article_id))
        .bearer_auth(&admin_token)
        .multipart(reqwest::multipart::Form::new().text("status", "PUBLISHED"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["article"]["status"], "PUBLISHED");

    // Deletion: editors are refused even for nonexistent ids.
    let response = client
        .delete(format!("{}/api/articles/{}", app.address, Uuid::new_v4()))
        .bearer_auth(&editor_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Admin deleting a nonexistent id sees the miss.
    let response = client
        .delete(format!("{}/api/articles/{}", app.address, Uuid::new_v4()))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // Admin deletes the real one; it is gone afterwards.
    let response = client
        .delete(format!("{}/api/articles/{}", app.address, article_id))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Article deleted successfully");

    let response = client
        .get(format!("{}/api/articles/{}", app.address, article_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn listing_paginates_filters_and_orders() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let author = app.repo.seed_user(Role::Editor);
    for i in 0..25 {
        app.repo.seed_article(
            author.id,
            &format!("Alpha {i}"),
            &format!("Common body text number {i}"),
            i,
        );
    }

    // Page 1 of 25 at limit 10: ten items, three pages.
    let response = client
        .get(format!("{}/api/articles?page=1&limit=10", app.address))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["articles"].as_array().unwrap().len(), 10);
    assert_eq!(body["data"]["pagination"]["total"], 25);
    assert_eq!(body["data"]["pagination"]["total_pages"], 3);
    // Newest first: the last seeded article leads.
    assert_eq!(body["data"]["articles"][0]["title"], "Alpha 24");

    // Page 3 holds the remaining five.
    let response = client
        .get(format!("{}/api/articles?page=3&limit=10", app.address))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["articles"].as_array().unwrap().len(), 5);

    // A limit above the configured maximum is clamped, never honored.
    let response = client
        .get(format!("{}/api/articles?limit=500", app.address))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["pagination"]["limit"], 100);
    assert_eq!(body["data"]["articles"].as_array().unwrap().len(), 25);

    // Substring search across title and content.
    let response = client
        .get(format!("{}/api/articles?search=number%202", app.address))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    // "number 2" matches 2 and 20..24.
    assert_eq!(body["data"]["pagination"]["total"], 6);

    // Malformed pagination input is a validation error, not a clamp.
    let response = client
        .get(format!("{}/api/articles?page=abc", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

// --- Upload Side-Channel ---

fn png_part() -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("cover.png")
        .mime_str("image/png")
        .unwrap()
}

#[tokio::test]
async fn upload_is_deleted_when_validation_fails() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (editor_token, _) = register(&app, &client, "editor@x.com", Some("EDITOR")).await;

    // Title too short and content missing: the request fails validation
    // after the image was already persisted.
    let form = reqwest::multipart::Form::new()
        .text("title", "Hi")
        .part("image", png_part());

    let response = client
        .post(format!("{}/api/articles", app.address))
        .bearer_auth(&editor_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let stored = app.storage.stored.lock().unwrap().clone();
    let deleted = app.storage.deleted.lock().unwrap().clone();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored, deleted);
}

#[tokio::test]
async fn upload_rejects_non_image_types() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (editor_token, _) = register(&app, &client, "editor@x.com", Some("EDITOR")).await;

    let pdf = reqwest::multipart::Part::bytes(vec![b'%', b'P', b'D', b'F'])
        .file_name("doc.pdf")
        .mime_str("application/pdf")
        .unwrap();
    let form = article_form("Hi there", "1234567890").part("image", pdf);

    let response = client
        .post(format!("{}/api/articles", app.address))
        .bearer_auth(&editor_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Nothing was persisted for the rejected type.
    assert!(app.storage.stored.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upload_sets_public_image_url() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let (editor_token, _) = register(&app, &client, "editor@x.com", Some("EDITOR")).await;

    let form = article_form("Hi there", "1234567890").part("image", png_part());
    let response = client
        .post(format!("{}/api/articles", app.address))
        .bearer_auth(&editor_token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.unwrap();
    let image_url = body["data"]["article"]["image_url"].as_str().unwrap();

    // Built from the request's scheme and host, pointing into /uploads.
    assert!(image_url.starts_with("http://127.0.0.1:"));
    assert!(image_url.contains("/uploads/"));
    assert!(image_url.ends_with(".png"));

    let stored = app.storage.stored.lock().unwrap().clone();
    assert_eq!(stored.len(), 1);
    assert!(image_url.ends_with(&stored[0]));
}
