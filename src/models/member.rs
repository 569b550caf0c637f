//! Library member model and form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::form::{checkbox, clean_text, FormErrors};

/// Member model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub registered_at: DateTime<Utc>,
    pub active: bool,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Member annotated with the number of loans still out
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberWithActiveLoans {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub member: Member,
    pub active_loans: i64,
}

/// Selectable member in the loan form
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberChoice {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
}

/// Member ranked by number of loans
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberLoanCount {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub loan_count: i64,
}

/// Member form as submitted.
///
/// `active` is a checkbox and only shows up on the edit form; new members
/// always start active.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct MemberForm {
    #[serde(default)]
    #[validate(
        required(message = "This field is required."),
        length(max = 100, message = "Ensure this value has at most 100 characters.")
    )]
    pub first_name: Option<String>,
    #[serde(default)]
    #[validate(
        required(message = "This field is required."),
        length(max = 100, message = "Ensure this value has at most 100 characters.")
    )]
    pub last_name: Option<String>,
    #[serde(default)]
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address.")
    )]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "Ensure this value has at most 20 characters."))]
    pub phone: String,
    #[serde(default)]
    pub active: Option<String>,
}

/// Validated member payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub active: bool,
}

impl MemberForm {
    /// Pre-filled form for editing an existing member
    pub fn from_member(member: &Member) -> Self {
        Self {
            first_name: Some(member.first_name.clone()),
            last_name: Some(member.last_name.clone()),
            email: Some(member.email.clone()),
            phone: member.phone.clone(),
            active: member.active.then(|| "on".to_string()),
        }
    }

    pub fn clean(&self) -> Result<MemberInput, FormErrors> {
        let form = Self {
            first_name: clean_text(self.first_name.clone()),
            last_name: clean_text(self.last_name.clone()),
            email: clean_text(self.email.clone()).map(|e| e.to_lowercase()),
            phone: self.phone.trim().to_string(),
            active: self.active.clone(),
        };

        let mut errors = FormErrors::new();
        if let Err(e) = form.validate() {
            errors.merge(e.into());
        }
        errors.into_result()?;

        Ok(MemberInput {
            active: checkbox(form.active.as_deref()),
            first_name: form.first_name.unwrap_or_default(),
            last_name: form.last_name.unwrap_or_default(),
            email: form.email.unwrap_or_default(),
            phone: form.phone,
        })
    }
}
