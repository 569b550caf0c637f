//! Category model and form

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::form::{clean_text, FormErrors, REQUIRED};

/// Category model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: String,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Category annotated with the number of books filed under it
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryWithBookCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub book_count: i64,
}

/// Category form as submitted
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryForm {
    #[serde(default)]
    #[validate(
        required(message = "This field is required."),
        length(max = 50, message = "Ensure this value has at most 50 characters.")
    )]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Validated category payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
}

impl CategoryForm {
    /// Pre-filled form for editing an existing category
    pub fn from_category(category: &Category) -> Self {
        Self {
            name: Some(category.name.clone()),
            description: category.description.clone(),
        }
    }

    pub fn clean(&self) -> Result<CategoryInput, FormErrors> {
        let form = Self {
            name: clean_text(self.name.clone()),
            description: self.description.trim().to_string(),
        };

        let mut errors = FormErrors::new();
        if let Err(e) = form.validate() {
            errors.merge(e.into());
        }
        errors.into_result()?;

        match form.name {
            Some(name) => Ok(CategoryInput {
                name,
                description: form.description,
            }),
            None => Err(FormErrors::field("name", REQUIRED)),
        }
    }
}
