use content_workspace::{
    models::{ArticleListQuery, ArticleStatus, LoginRequest, RegisterRequest, Role},
    validation::{
        parse_article_id, validate_create_article, validate_list_query, validate_login,
        validate_register, validate_update_article,
    },
};
use uuid::Uuid;

fn register_request(email: &str, password: &str, name: &str) -> RegisterRequest {
    RegisterRequest {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
        name: Some(name.to_string()),
        role: None,
    }
}

// --- Register ---

#[test]
fn register_accepts_valid_input_and_defaults_role() {
    let input = validate_register(&register_request("a@x.com", "secret1", "A")).unwrap();
    assert_eq!(input.email, "a@x.com");
    assert_eq!(input.role, Role::Viewer);
}

#[test]
fn register_accepts_explicit_role() {
    let mut req = register_request("a@x.com", "secret1", "A");
    req.role = Some("EDITOR".to_string());
    let input = validate_register(&req).unwrap();
    assert_eq!(input.role, Role::Editor);
}

#[test]
fn register_rejects_unknown_role() {
    let mut req = register_request("a@x.com", "secret1", "A");
    req.role = Some("SUPERUSER".to_string());
    let errors = validate_register(&req).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "role");
}

#[test]
fn register_rejects_bad_emails() {
    for email in ["not-an-email", "@x.com", "a@", "a@nodot", "a@.com", "a@x."] {
        let errors = validate_register(&register_request(email, "secret1", "A")).unwrap_err();
        assert_eq!(errors[0].field, "email", "email {email:?} should be rejected");
    }
}

#[test]
fn register_rejects_short_password_and_name() {
    let errors = validate_register(&register_request("a@x.com", "12345", "A")).unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"name"));
}

#[test]
fn register_reports_every_missing_field_at_once() {
    let errors = validate_register(&RegisterRequest::default()).unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["email", "password", "name"]);
}

#[test]
fn register_rejects_overlong_password() {
    let errors =
        validate_register(&register_request("a@x.com", &"p".repeat(101), "A")).unwrap_err();
    assert_eq!(errors[0].field, "password");
}

// --- Login ---

#[test]
fn login_accepts_valid_input() {
    let req = LoginRequest {
        email: Some("a@x.com".to_string()),
        password: Some("anything".to_string()),
    };
    assert!(validate_login(&req).is_ok());
}

#[test]
fn login_requires_both_fields() {
    let errors = validate_login(&LoginRequest::default()).unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["email", "password"]);
}

#[test]
fn login_rejects_empty_password() {
    let req = LoginRequest {
        email: Some("a@x.com".to_string()),
        password: Some(String::new()),
    };
    let errors = validate_login(&req).unwrap_err();
    assert_eq!(errors[0].field, "password");
}

// --- List Query ---

#[test]
fn list_query_accepts_digit_strings() {
    let query = ArticleListQuery {
        page: Some("2".to_string()),
        limit: Some("50".to_string()),
        status: Some("PUBLISHED".to_string()),
        search: Some("rust".to_string()),
    };
    let input = validate_list_query(&query).unwrap();
    assert_eq!(input.page, Some(2));
    assert_eq!(input.limit, Some(50));
    assert_eq!(input.status, Some(ArticleStatus::Published));
    assert_eq!(input.search.as_deref(), Some("rust"));
}

#[test]
fn list_query_defaults_to_empty() {
    let input = validate_list_query(&ArticleListQuery::default()).unwrap();
    assert_eq!(input.page, None);
    assert_eq!(input.limit, None);
}

#[test]
fn list_query_rejects_non_digit_page_and_limit() {
    for bad in ["abc", "-1", "1.5", "", " 2"] {
        let query = ArticleListQuery {
            page: Some(bad.to_string()),
            ..ArticleListQuery::default()
        };
        let errors = validate_list_query(&query).unwrap_err();
        assert_eq!(errors[0].field, "page", "page {bad:?} should be rejected");
    }

    let query = ArticleListQuery {
        limit: Some("ten".to_string()),
        ..ArticleListQuery::default()
    };
    assert_eq!(validate_list_query(&query).unwrap_err()[0].field, "limit");
}

#[test]
fn list_query_rejects_unknown_status() {
    let query = ArticleListQuery {
        status: Some("ARCHIVED".to_string()),
        ..ArticleListQuery::default()
    };
    assert_eq!(validate_list_query(&query).unwrap_err()[0].field, "status");
}

// --- Article Bodies ---

#[test]
fn create_article_accepts_minimal_form_and_defaults_draft() {
    let input = validate_create_article(
        &Some("Hi there".to_string()),
        &Some("1234567890".to_string()),
        &None,
    )
    .unwrap();
    assert_eq!(input.status, ArticleStatus::Draft);
}

#[test]
fn create_article_requires_title_and_content() {
    let errors = validate_create_article(&None, &None, &None).unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["title", "content"]);
}

#[test]
fn create_article_enforces_bounds() {
    // Too-short title, too-short content, bad status: three violations.
    let errors = validate_create_article(
        &Some("Hi".to_string()),
        &Some("short".to_string()),
        &Some("LIVE".to_string()),
    )
    .unwrap_err();
    assert_eq!(errors.len(), 3);

    let errors = validate_create_article(
        &Some("t".repeat(201)),
        &Some("long enough content".to_string()),
        &None,
    )
    .unwrap_err();
    assert_eq!(errors[0].field, "title");
}

#[test]
fn update_article_accepts_any_subset() {
    let input = validate_update_article(&None, &None, &None).unwrap();
    assert!(input.title.is_none());
    assert!(input.content.is_none());
    assert!(input.status.is_none());

    let input = validate_update_article(
        &Some("New title".to_string()),
        &None,
        &Some("PUBLISHED".to_string()),
    )
    .unwrap();
    assert_eq!(input.title.as_deref(), Some("New title"));
    assert_eq!(input.status, Some(ArticleStatus::Published));
    assert!(input.content.is_none());
}

#[test]
fn update_article_still_enforces_bounds_on_present_fields() {
    let errors =
        validate_update_article(&Some("Hi".to_string()), &Some("short".to_string()), &None)
            .unwrap_err();
    assert_eq!(errors.len(), 2);
}

// --- Path Ids ---

#[test]
fn article_id_parses_uuids_only() {
    let id = Uuid::new_v4();
    assert_eq!(parse_article_id(&id.to_string()).unwrap(), id);

    let errors = parse_article_id("123").unwrap_err();
    assert_eq!(errors[0].field, "id");
    assert_eq!(errors[0].message, "Invalid article ID");
}
