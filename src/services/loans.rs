//! Loan management service

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookChoice,
        loan::{Loan, LoanDetails, LoanForm, LoanQuery},
        member::MemberChoice,
    },
    repository::Repository,
};

/// What the loan form may offer: books with a copy on the shelf and members
/// allowed to borrow
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoanChoices {
    pub books: Vec<BookChoice>,
    pub members: Vec<MemberChoice>,
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Loans newest first, optionally filtered by status
    pub async fn list_loans(&self, query: &LoanQuery, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.list(query.status, today).await
    }

    /// Selectable books and members for the loan form
    pub async fn choices(&self) -> AppResult<LoanChoices> {
        Ok(LoanChoices {
            books: self.repository.books.list_available().await?,
            members: self.repository.members.list_active().await?,
        })
    }

    /// Validate and create a loan (borrow a book).
    ///
    /// The chosen book must still have a copy and the member must be active;
    /// both are checked inside the transaction that takes the copy.
    pub async fn create_loan(&self, form: &LoanForm, now: DateTime<Utc>) -> AppResult<Loan> {
        let input = form.clean()?;

        let loan = self.repository.loans.create(&input, now).await?;
        tracing::info!(
            loan_id = loan.id,
            book_id = loan.book_id,
            member_id = loan.member_id,
            due_date = %loan.due_date,
            "Loan created"
        );
        Ok(loan)
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, loan_id: i32, now: DateTime<Utc>) -> AppResult<Loan> {
        match self.repository.loans.return_loan(loan_id, now).await {
            Ok(loan) => {
                tracing::info!(loan_id, book_id = loan.book_id, "Loan returned");
                Ok(loan)
            }
            Err(AppError::BusinessRule(msg)) => {
                tracing::warn!(loan_id, "Return refused: {}", msg);
                Err(AppError::BusinessRule(msg))
            }
            Err(e) => Err(e),
        }
    }
}
