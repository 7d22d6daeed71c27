use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{ArticleListQuery, ArticleStatus, LoginRequest, RegisterRequest, Role};

/// FieldError
///
/// One structured violation: which field failed and why. Validation runs
/// before any business logic and reports every violation at once, so a
/// request with three bad fields gets three entries, not one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// --- Validated Inputs ---

/// Register payload after validation: all fields present and within bounds,
/// role defaulted to Viewer when absent.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// List query after validation. Page/limit are parsed integers; defaulting
/// and clamping stay with the listing operation, which only relies on these
/// being well-formed numbers.
#[derive(Debug, Clone, Default)]
pub struct ListInput {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<ArticleStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateArticleInput {
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateArticleInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<ArticleStatus>,
}

// --- Field Predicates ---

/// Minimal structural email check: exactly one `@`, a non-empty local part,
/// and a domain with a dot that is neither leading nor trailing.
fn is_valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let (local, domain) = match (parts.next(), parts.next()) {
        (Some(l), Some(d)) => (l, d),
        _ => return false,
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.find('.') {
        Some(idx) => idx > 0 && idx < domain.len() - 1,
        None => false,
    }
}

fn parse_role(value: &str) -> Option<Role> {
    match value {
        "ADMIN" => Some(Role::Admin),
        "EDITOR" => Some(Role::Editor),
        "VIEWER" => Some(Role::Viewer),
        _ => None,
    }
}

fn parse_status(value: &str) -> Option<ArticleStatus> {
    match value {
        "DRAFT" => Some(ArticleStatus::Draft),
        "PUBLISHED" => Some(ArticleStatus::Published),
        _ => None,
    }
}

/// The original page/limit contract: a plain digit string. Signs, blanks and
/// decimals are rejected here; clamping happens later in the listing flow.
fn parse_digits(value: &str) -> Option<i64> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

// --- Route Validators ---

pub fn validate_register(req: &RegisterRequest) -> Result<RegisterInput, Vec<FieldError>> {
    let mut errors = Vec::new();

    let email = match req.email.as_deref() {
        Some(e) if is_valid_email(e) => Some(e.to_string()),
        Some(_) => {
            errors.push(FieldError::new("email", "Invalid email address"));
            None
        }
        None => {
            errors.push(FieldError::new("email", "Email is required"));
            None
        }
    };

    let password = match req.password.as_deref() {
        Some(p) if p.chars().count() < 6 => {
            errors.push(FieldError::new(
                "password",
                "Password must be at least 6 characters",
            ));
            None
        }
        Some(p) if p.chars().count() > 100 => {
            errors.push(FieldError::new("password", "Password is too long"));
            None
        }
        Some(p) => Some(p.to_string()),
        None => {
            errors.push(FieldError::new("password", "Password is required"));
            None
        }
    };

    let name = match req.name.as_deref() {
        Some(n) if n.chars().count() < 2 => {
            errors.push(FieldError::new("name", "Name must be at least 2 characters"));
            None
        }
        Some(n) if n.chars().count() > 100 => {
            errors.push(FieldError::new("name", "Name is too long"));
            None
        }
        Some(n) => Some(n.to_string()),
        None => {
            errors.push(FieldError::new("name", "Name is required"));
            None
        }
    };

    let role = match req.role.as_deref() {
        Some(r) => match parse_role(r) {
            Some(role) => Some(role),
            None => {
                errors.push(FieldError::new(
                    "role",
                    "Role must be one of ADMIN, EDITOR, VIEWER",
                ));
                None
            }
        },
        None => Some(Role::Viewer),
    };

    if errors.is_empty() {
        Ok(RegisterInput {
            email: email.unwrap(),
            password: password.unwrap(),
            name: name.unwrap(),
            role: role.unwrap(),
        })
    } else {
        Err(errors)
    }
}

pub fn validate_login(req: &LoginRequest) -> Result<LoginInput, Vec<FieldError>> {
    let mut errors = Vec::new();

    let email = match req.email.as_deref() {
        Some(e) if is_valid_email(e) => Some(e.to_string()),
        Some(_) => {
            errors.push(FieldError::new("email", "Invalid email address"));
            None
        }
        None => {
            errors.push(FieldError::new("email", "Email is required"));
            None
        }
    };

    let password = match req.password.as_deref() {
        Some(p) if !p.is_empty() => Some(p.to_string()),
        _ => {
            errors.push(FieldError::new("password", "Password is required"));
            None
        }
    };

    if errors.is_empty() {
        Ok(LoginInput {
            email: email.unwrap(),
            password: password.unwrap(),
        })
    } else {
        Err(errors)
    }
}

pub fn validate_list_query(query: &ArticleListQuery) -> Result<ListInput, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut input = ListInput {
        search: query.search.clone(),
        ..ListInput::default()
    };

    if let Some(page) = query.page.as_deref() {
        match parse_digits(page) {
            Some(p) => input.page = Some(p),
            None => errors.push(FieldError::new("page", "Page must be a positive integer")),
        }
    }

    if let Some(limit) = query.limit.as_deref() {
        match parse_digits(limit) {
            Some(l) => input.limit = Some(l),
            None => errors.push(FieldError::new("limit", "Limit must be a positive integer")),
        }
    }

    if let Some(status) = query.status.as_deref() {
        match parse_status(status) {
            Some(s) => input.status = Some(s),
            None => errors.push(FieldError::new(
                "status",
                "Status must be one of DRAFT, PUBLISHED",
            )),
        }
    }

    if errors.is_empty() { Ok(input) } else { Err(errors) }
}

/// Path ids are accepted as raw strings and parsed here so a malformed id
/// yields the same field-error shape as any other validation failure.
pub fn parse_article_id(raw: &str) -> Result<Uuid, Vec<FieldError>> {
    Uuid::parse_str(raw).map_err(|_| vec![FieldError::new("id", "Invalid article ID")])
}

fn check_title(title: &str, errors: &mut Vec<FieldError>) -> bool {
    let len = title.chars().count();
    if len < 3 {
        errors.push(FieldError::new("title", "Title must be at least 3 characters"));
        false
    } else if len > 200 {
        errors.push(FieldError::new("title", "Title is too long"));
        false
    } else {
        true
    }
}

fn check_content(content: &str, errors: &mut Vec<FieldError>) -> bool {
    if content.chars().count() < 10 {
        errors.push(FieldError::new(
            "content",
            "Content must be at least 10 characters",
        ));
        false
    } else {
        true
    }
}

pub fn validate_create_article(
    title: &Option<String>,
    content: &Option<String>,
    status: &Option<String>,
) -> Result<CreateArticleInput, Vec<FieldError>> {
    let mut errors = Vec::new();

    match title.as_deref() {
        Some(t) => {
            check_title(t, &mut errors);
        }
        None => errors.push(FieldError::new("title", "Title is required")),
    }

    match content.as_deref() {
        Some(c) => {
            check_content(c, &mut errors);
        }
        None => errors.push(FieldError::new("content", "Content is required")),
    }

    let status = match status.as_deref() {
        Some(s) => match parse_status(s) {
            Some(parsed) => parsed,
            None => {
                errors.push(FieldError::new(
                    "status",
                    "Status must be one of DRAFT, PUBLISHED",
                ));
                ArticleStatus::Draft
            }
        },
        None => ArticleStatus::Draft,
    };

    if errors.is_empty() {
        Ok(CreateArticleInput {
            title: title.clone().unwrap(),
            content: content.clone().unwrap(),
            status,
        })
    } else {
        Err(errors)
    }
}

/// Update allows any subset of fields; bounds apply only to the fields that
/// are actually present.
pub fn validate_update_article(
    title: &Option<String>,
    content: &Option<String>,
    status: &Option<String>,
) -> Result<UpdateArticleInput, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut input = UpdateArticleInput::default();

    if let Some(t) = title.as_deref() {
        if check_title(t, &mut errors) {
            input.title = Some(t.to_string());
        }
    }

    if let Some(c) = content.as_deref() {
        if check_content(c, &mut errors) {
            input.content = Some(c.to_string());
        }
    }

    if let Some(s) = status.as_deref() {
        match parse_status(s) {
            Some(parsed) => input.status = Some(parsed),
            None => errors.push(FieldError::new(
                "status",
                "Status must be one of DRAFT, PUBLISHED",
            )),
        }
    }

    if errors.is_empty() { Ok(input) } else { Err(errors) }
}
