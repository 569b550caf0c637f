//! Loans repository for database operations

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        form::{FormErrors, INVALID_CHOICE},
        loan::{Loan, LoanCounts, LoanDetails, LoanInput, LoanStatus},
    },
};

const LOAN_DETAILS_SELECT: &str = r#"
    SELECT l.id, l.member_id, l.book_id, l.loaned_at, l.due_date, l.returned_at,
           l.status, l.notes,
           b.title AS book_title,
           m.first_name AS member_first_name,
           m.last_name AS member_last_name
    FROM loans l
    JOIN books b ON b.id = l.book_id
    JOIN members m ON m.id = l.member_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, member_id, book_id, loaned_at, due_date, returned_at, status, notes
            FROM loans
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// List loans newest first, optionally filtered by status.
    ///
    /// `Overdue` is never stored: it selects unreturned loans whose due date
    /// is before `today`.
    pub async fn list(
        &self,
        status: Option<LoanStatus>,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>> {
        let (stored_status, overdue_before) = match status {
            Some(LoanStatus::Overdue) => (None, Some(today)),
            other => (other, None),
        };

        let loans = sqlx::query_as::<_, LoanDetails>(&format!(
            r#"
            {}
            WHERE ($1::text IS NULL OR l.status = $1)
              AND ($2::date IS NULL OR (l.status = 'loaned' AND l.due_date < $2))
            ORDER BY l.loaned_at DESC, l.id DESC
            "#,
            LOAN_DETAILS_SELECT
        ))
        .bind(stored_status)
        .bind(overdue_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans.into_iter().map(|l| l.with_overdue(today)).collect())
    }

    /// Most recent loans of one book
    pub async fn recent_for_book(
        &self,
        book_id: i32,
        limit: i64,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>> {
        let loans = sqlx::query_as::<_, LoanDetails>(&format!(
            r#"
            {}
            WHERE l.book_id = $1
            ORDER BY l.loaned_at DESC, l.id DESC
            LIMIT $2
            "#,
            LOAN_DETAILS_SELECT
        ))
        .bind(book_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans.into_iter().map(|l| l.with_overdue(today)).collect())
    }

    /// Create a loan and take one copy off the shelf, atomically.
    ///
    /// The member must be active and the book must still have a copy when
    /// the transaction runs; otherwise nothing is written and every offending
    /// field is reported.
    pub async fn create(&self, loan: &LoanInput, now: DateTime<Utc>) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;
        let mut errors = FormErrors::new();

        let member_active: Option<bool> =
            sqlx::query_scalar("SELECT active FROM members WHERE id = $1 FOR SHARE")
                .bind(loan.member_id)
                .fetch_optional(&mut *tx)
                .await?;

        if member_active != Some(true) {
            errors.add("member", INVALID_CHOICE);

            let book_available: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM books WHERE id = $1 AND available_copies > 0)",
            )
            .bind(loan.book_id)
            .fetch_one(&mut *tx)
            .await?;

            if !book_available {
                errors.add("book", INVALID_CHOICE);
            }
            return Err(AppError::Validation(errors));
        }

        let decremented: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE books SET available_copies = available_copies - 1
            WHERE id = $1 AND available_copies > 0
            RETURNING available_copies
            "#,
        )
        .bind(loan.book_id)
        .fetch_optional(&mut *tx)
        .await?;

        if decremented.is_none() {
            errors.add("book", INVALID_CHOICE);
            return Err(AppError::Validation(errors));
        }

        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (member_id, book_id, loaned_at, due_date, returned_at, status, notes)
            VALUES ($1, $2, $3, $4, NULL, $5, $6)
            RETURNING id, member_id, book_id, loaned_at, due_date, returned_at, status, notes
            "#,
        )
        .bind(loan.member_id)
        .bind(loan.book_id)
        .bind(now)
        .bind(loan.due_date)
        .bind(LoanStatus::Loaned)
        .bind(&loan.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Mark a loan returned and put the copy back on the shelf, atomically.
    ///
    /// Only a `loaned` loan transitions; anything else is a business-rule
    /// error and nothing changes.
    pub async fn return_loan(&self, loan_id: i32, now: DateTime<Utc>) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let returned = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET status = $2, returned_at = $3
            WHERE id = $1 AND status = $4
            RETURNING id, member_id, book_id, loaned_at, due_date, returned_at, status, notes
            "#,
        )
        .bind(loan_id)
        .bind(LoanStatus::Returned)
        .bind(now)
        .bind(LoanStatus::Loaned)
        .fetch_optional(&mut *tx)
        .await?;

        let loan = match returned {
            Some(loan) => loan,
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE id = $1)")
                        .bind(loan_id)
                        .fetch_one(&mut *tx)
                        .await?;
                return Err(if exists {
                    AppError::BusinessRule("This book has already been returned.".to_string())
                } else {
                    AppError::NotFound(format!("Loan with id {} not found", loan_id))
                });
            }
        };

        sqlx::query("UPDATE books SET available_copies = available_copies + 1 WHERE id = $1")
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(loan)
    }

    /// All loans, loans still out and overdue loans, read from one snapshot
    /// so `overdue <= active <= total` always holds
    pub async fn counts(&self, today: NaiveDate) -> AppResult<LoanCounts> {
        let counts = sqlx::query_as::<_, LoanCounts>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'loaned') AS active,
                   COUNT(*) FILTER (WHERE status = 'loaned' AND due_date < $1) AS overdue
            FROM loans
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}
