//! Loan model, status and form

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use sqlx::{Decode, Encode, FromRow, Postgres};
use validator::Validate;

use super::form::{clean_text, parse_date, parse_id, FormErrors};

/// Loan status as stored.
///
/// Only `Loaned` and `Returned` are ever written. `Overdue` is accepted as a
/// list filter and selects the computed predicate (see [`Loan::is_overdue`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Loaned,
    Returned,
    Overdue,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Loaned => "loaned",
            LoanStatus::Returned => "returned",
            LoanStatus::Overdue => "overdue",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loaned" => Ok(LoanStatus::Loaned),
            "returned" => Ok(LoanStatus::Returned),
            "overdue" => Ok(LoanStatus::Overdue),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i32,
    pub member_id: i32,
    pub book_id: i32,
    pub loaned_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub notes: String,
}

impl Loan {
    /// Not returned and the due date is behind `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        if self.status == LoanStatus::Returned {
            return false;
        }
        today > self.due_date
    }
}

/// Loan with book and member names for display
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LoanDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub loan: Loan,
    pub book_title: String,
    pub member_first_name: String,
    pub member_last_name: String,
    #[sqlx(skip)]
    pub is_overdue: bool,
}

impl LoanDetails {
    pub fn with_overdue(mut self, today: NaiveDate) -> Self {
        self.is_overdue = self.loan.is_overdue(today);
        self
    }
}

impl std::fmt::Display for LoanDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} {}",
            self.book_title, self.member_first_name, self.member_last_name
        )
    }
}

/// Loan counters for the dashboard and the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct LoanCounts {
    pub total: i64,
    /// Status `loaned`
    pub active: i64,
    /// Status `loaned` and due before today
    pub overdue: i64,
}

/// Loan list query parameters
#[serde_as]
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoanQuery {
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    pub status: Option<LoanStatus>,
}

/// Due date offered for a loan created on `today`
pub fn default_due_date(today: NaiveDate, loan_period_days: i64) -> NaiveDate {
    today + Duration::days(loan_period_days)
}

/// Loan form as submitted
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct LoanForm {
    #[serde(default)]
    #[validate(required(message = "This field is required."))]
    pub member: Option<String>,
    #[serde(default)]
    #[validate(required(message = "This field is required."))]
    pub book: Option<String>,
    #[serde(default)]
    #[validate(required(message = "This field is required."))]
    pub due_date: Option<String>,
    #[serde(default)]
    pub notes: String,
}

/// Validated loan payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanInput {
    pub member_id: i32,
    pub book_id: i32,
    pub due_date: NaiveDate,
    pub notes: String,
}

impl LoanForm {
    /// Blank form for a new loan, due date pre-filled
    pub fn initial(today: NaiveDate, loan_period_days: i64) -> Self {
        Self {
            due_date: Some(
                default_due_date(today, loan_period_days)
                    .format("%Y-%m-%d")
                    .to_string(),
            ),
            ..Self::default()
        }
    }

    pub fn clean(&self) -> Result<LoanInput, FormErrors> {
        let form = Self {
            member: clean_text(self.member.clone()),
            book: clean_text(self.book.clone()),
            due_date: clean_text(self.due_date.clone()),
            notes: self.notes.trim().to_string(),
        };

        let mut errors = FormErrors::new();
        if let Err(e) = form.validate() {
            errors.merge(e.into());
        }

        let member_id = parse_id(&mut errors, "member", form.member.as_deref());
        let book_id = parse_id(&mut errors, "book", form.book.as_deref());
        let due_date = parse_date(&mut errors, "due_date", form.due_date.as_deref());

        errors.into_result()?;

        Ok(LoanInput {
            member_id: member_id.unwrap_or_default(),
            book_id: book_id.unwrap_or_default(),
            due_date: due_date.unwrap_or_default(),
            notes: form.notes,
        })
    }
}
