//! Book (catalog) model, list query and form

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::form::{clean_text, parse_count, parse_date, parse_id, FormErrors};

/// Digits, optionally ending in an ISBN-10 `X` check character
static ISBN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,12}[0-9Xx]$").unwrap());

fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    if ISBN_RE.is_match(isbn) {
        Ok(())
    } else {
        Err(ValidationError::new("isbn"))
    }
}

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category_id: i32,
    pub publication_date: NaiveDate,
    pub total_copies: i32,
    pub available_copies: i32,
    pub description: String,
    pub added_at: DateTime<Utc>,
}

impl Book {
    /// At least one copy is on the shelf
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.title, self.author)
    }
}

/// Book joined with its category name, as listed
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookWithCategory {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub book: Book,
    pub category_name: String,
}

/// Selectable book in the loan form
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookChoice {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub available_copies: i32,
}

/// Book ranked by number of loans
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookLoanCount {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub loan_count: i64,
}

/// Book list query parameters
#[serde_as]
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BookQuery {
    /// Restrict to one category id
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    pub category: Option<i32>,
    /// Case-insensitive match on title, author or ISBN
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    pub search: Option<String>,
}

/// Book form as submitted
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BookForm {
    #[serde(default)]
    #[validate(
        required(message = "This field is required."),
        length(max = 200, message = "Ensure this value has at most 200 characters.")
    )]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(
        required(message = "This field is required."),
        length(max = 100, message = "Ensure this value has at most 100 characters.")
    )]
    pub author: Option<String>,
    #[serde(default)]
    #[validate(
        required(message = "This field is required."),
        length(max = 13, message = "Ensure this value has at most 13 characters."),
        custom(function = "validate_isbn", message = "Enter a valid ISBN (digits only).")
    )]
    pub isbn: Option<String>,
    #[serde(default)]
    #[validate(required(message = "This field is required."))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(required(message = "This field is required."))]
    pub publication_date: Option<String>,
    #[serde(default)]
    #[validate(required(message = "This field is required."))]
    pub total_copies: Option<String>,
    #[serde(default)]
    #[validate(required(message = "This field is required."))]
    pub available_copies: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl Default for BookForm {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            isbn: None,
            category: None,
            publication_date: None,
            total_copies: Some("1".to_string()),
            available_copies: Some("1".to_string()),
            description: String::new(),
        }
    }
}

/// Validated book payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub category_id: i32,
    pub publication_date: NaiveDate,
    pub total_copies: i32,
    pub available_copies: i32,
    pub description: String,
}

impl BookForm {
    /// Pre-filled form for editing an existing book
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: Some(book.title.clone()),
            author: Some(book.author.clone()),
            isbn: Some(book.isbn.clone()),
            category: Some(book.category_id.to_string()),
            publication_date: Some(book.publication_date.format("%Y-%m-%d").to_string()),
            total_copies: Some(book.total_copies.to_string()),
            available_copies: Some(book.available_copies.to_string()),
            description: book.description.clone(),
        }
    }

    pub fn clean(&self) -> Result<BookInput, FormErrors> {
        let form = Self {
            title: clean_text(self.title.clone()),
            author: clean_text(self.author.clone()),
            isbn: clean_text(self.isbn.clone()),
            category: clean_text(self.category.clone()),
            publication_date: clean_text(self.publication_date.clone()),
            total_copies: clean_text(self.total_copies.clone()),
            available_copies: clean_text(self.available_copies.clone()),
            description: self.description.trim().to_string(),
        };

        let mut errors = FormErrors::new();
        if let Err(e) = form.validate() {
            errors.merge(e.into());
        }

        let category_id = parse_id(&mut errors, "category", form.category.as_deref());
        let publication_date =
            parse_date(&mut errors, "publication_date", form.publication_date.as_deref());
        let total_copies = parse_count(&mut errors, "total_copies", form.total_copies.as_deref());
        let available_copies =
            parse_count(&mut errors, "available_copies", form.available_copies.as_deref());

        if let (Some(total), Some(available)) = (total_copies, available_copies) {
            if available > total {
                errors.add(
                    "available_copies",
                    "Available copies cannot exceed total copies.",
                );
            }
        }

        errors.into_result()?;

        Ok(BookInput {
            title: form.title.unwrap_or_default(),
            author: form.author.unwrap_or_default(),
            isbn: form.isbn.unwrap_or_default().to_uppercase(),
            category_id: category_id.unwrap_or_default(),
            publication_date: publication_date.unwrap_or_default(),
            total_copies: total_copies.unwrap_or_default(),
            available_copies: available_copies.unwrap_or_default(),
            description: form.description,
        })
    }
}
