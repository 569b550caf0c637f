//! Repository layer for database operations

pub mod books;
pub mod categories;
pub mod loans;
pub mod members;

use sqlx::{Pool, Postgres};

use crate::{error::{is_unique_violation, AppError}, models::FormErrors};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub categories: categories::CategoriesRepository,
    pub books: books::BooksRepository,
    pub members: members::MembersRepository,
    pub loans: loans::LoansRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            categories: categories::CategoriesRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            members: members::MembersRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database (readiness check)
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// `%term%` for ILIKE, with the user's own wildcards matched literally
pub fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Turn a UNIQUE violation on `field` into the same field error the form
/// check would have produced
pub(crate) fn unique_as_field_error(err: sqlx::Error, field: &str, message: &str) -> AppError {
    if is_unique_violation(&err) {
        AppError::Validation(FormErrors::field(field, message))
    } else {
        AppError::Database(err)
    }
}
