//! Input validation for registration, login, news and comments.
//!
//! Validators collect every failing rule and return them together, so a
//! client sees all problems with a submission at once.

use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::models::content::{Category, NewsChanges, NewsStatus};

const NAME_LEN: (usize, usize) = (3, 50);
const EMAIL_MAX_LEN: usize = 100;
const PASSWORD_LEN: (usize, usize) = (6, 50);
const TITLE_LEN: (usize, usize) = (10, 200);
const CONTENT_LEN: (usize, usize) = (50, 10_000);
const COMMENT_LEN: (usize, usize) = (1, 1_000);

/// One or more failed validation rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.join(", "))]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }
}

/// Accumulates rule failures.
#[derive(Default)]
struct Checker(Vec<String>);

impl Checker {
    fn check(&mut self, ok: bool, message: &str) {
        if !ok {
            self.0.push(message.to_string());
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors(self.0))
        }
    }
}

fn len_within(value: &str, (min, max): (usize, usize)) -> bool {
    (min..=max).contains(&value.chars().count())
}

/// Trim and lowercase an email address.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Validate registration input: name 3–50 letters/spaces, a plausible email
/// of at most 100 characters, password 6–50 characters with at least one digit.
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
) -> Result<Registration, ValidationErrors> {
    let name = name.trim();
    let email = normalize_email(email);
    let mut c = Checker::default();

    c.check(!name.is_empty(), "Name is required");
    c.check(len_within(name, NAME_LEN), "Name must be 3-50 characters");
    c.check(
        name.chars().all(|ch| ch.is_alphabetic() || ch == ' '),
        "Name may only contain letters and spaces",
    );
    c.check(!email.is_empty(), "Email is required");
    c.check(looks_like_email(&email), "Email address is not valid");
    c.check(email.chars().count() <= EMAIL_MAX_LEN, "Email is too long");
    c.check(!password.is_empty(), "Password is required");
    c.check(
        len_within(password, PASSWORD_LEN),
        "Password must be 6-50 characters",
    );
    c.check(
        password.chars().any(|ch| ch.is_ascii_digit()),
        "Password must contain at least one digit",
    );

    c.finish(Registration {
        name: name.to_string(),
        email,
        password: password.to_string(),
    })
}

/// Validate login input, returning the normalized email.
pub fn validate_login(email: &str, password: &str) -> Result<String, ValidationErrors> {
    let email = normalize_email(email);
    let mut c = Checker::default();
    c.check(!email.is_empty(), "Email is required");
    c.check(looks_like_email(&email), "Email address is not valid");
    c.check(!password.is_empty(), "Password is required");
    c.finish(email)
}

/// Parse a category, accepting `None` or empty as "not given".
pub fn parse_category(raw: Option<&str>) -> Result<Option<Category>, ValidationErrors> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ValidationErrors::single("Invalid category")),
    }
}

/// Parse a publication status.
pub fn parse_status(raw: &str) -> Result<NewsStatus, ValidationErrors> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationErrors::single("Status must be 'draft' or 'published'"))
}

/// Parse a record id from a path or query parameter.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ValidationErrors> {
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationErrors::single(format!("Invalid {what} id")))
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}

/// Validated news draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsDraft {
    pub title: String,
    pub content: String,
    pub category: Category,
    pub image: Option<String>,
}

/// Validate a new news article. Category defaults to `general`.
pub fn validate_news_draft(
    title: &str,
    content: &str,
    category: Option<&str>,
    image: Option<&str>,
) -> Result<NewsDraft, ValidationErrors> {
    let title = title.trim();
    let content = content.trim();
    let image = image.map(str::trim).filter(|s| !s.is_empty());
    let mut c = Checker::default();

    c.check(!title.is_empty(), "Title is required");
    c.check(len_within(title, TITLE_LEN), "Title must be 10-200 characters");
    c.check(!content.is_empty(), "Content is required");
    c.check(
        len_within(content, CONTENT_LEN),
        "Content must be 50-10000 characters",
    );
    let category = match parse_category(category) {
        Ok(category) => category.unwrap_or_default(),
        Err(e) => {
            c.0.extend(e.0);
            Category::default()
        }
    };
    c.check(image.is_none_or(is_http_url), "Image must be a valid URL");

    c.finish(NewsDraft {
        title: title.to_string(),
        content: content.to_string(),
        category,
        image: image.map(str::to_string),
    })
}

/// Validate a partial news update. Absent or empty fields are left unchanged.
pub fn validate_news_changes(
    title: Option<&str>,
    content: Option<&str>,
    category: Option<&str>,
    image: Option<&str>,
) -> Result<NewsChanges, ValidationErrors> {
    let present = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let title = present(title);
    let content = present(content);
    // An empty image value clears the stored one.
    let image = image.map(|v| Some(v.trim()).filter(|s| !s.is_empty()).map(str::to_string));
    let mut c = Checker::default();

    if let Some(title) = &title {
        c.check(len_within(title, TITLE_LEN), "Title must be 10-200 characters");
    }
    if let Some(content) = &content {
        c.check(
            len_within(content, CONTENT_LEN),
            "Content must be 50-10000 characters",
        );
    }
    let category = match parse_category(category) {
        Ok(category) => category,
        Err(e) => {
            c.0.extend(e.0);
            None
        }
    };
    if let Some(Some(image)) = &image {
        c.check(is_http_url(image), "Image must be a valid URL");
    }

    c.finish(NewsChanges {
        title,
        content,
        category,
        image,
    })
}

/// Validate comment content (1–1000 characters after trimming).
pub fn validate_comment(content: &str) -> Result<String, ValidationErrors> {
    let content = content.trim();
    let mut c = Checker::default();
    c.check(!content.is_empty(), "Comment content is required");
    c.check(
        len_within(content, COMMENT_LEN),
        "Comment must be 1-1000 characters",
    );
    c.finish(content.to_string())
}
