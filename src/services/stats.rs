//! Statistics service (home dashboard and reports)

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    error::AppResult,
    models::{book::BookLoanCount, member::MemberLoanCount},
    repository::Repository,
};

/// Counters shown on the home page
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub total_books: i64,
    pub active_members: i64,
    pub active_loans: i64,
    pub overdue_loans: i64,
}

/// Library-wide figures and rankings for the reports page
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub total_books: i64,
    pub total_members: i64,
    pub active_members: i64,
    pub total_loans: i64,
    pub active_loans: i64,
    pub overdue_loans: i64,
    pub most_borrowed_books: Vec<BookLoanCount>,
    pub most_active_members: Vec<MemberLoanCount>,
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn summary(&self, today: NaiveDate) -> AppResult<Summary> {
        let (total_books, active_members, loans) = tokio::try_join!(
            self.repository.books.count(),
            self.repository.members.count_active(),
            self.repository.loans.counts(today),
        )?;

        Ok(Summary {
            total_books,
            active_members,
            active_loans: loans.active,
            overdue_loans: loans.overdue,
        })
    }

    /// Full report. Rankings hold at most `top` entries and leave out
    /// books and members with no loans.
    pub async fn report(&self, today: NaiveDate, top: i64) -> AppResult<Report> {
        let (total_books, total_members, active_members, loans) = tokio::try_join!(
            self.repository.books.count(),
            self.repository.members.count(),
            self.repository.members.count_active(),
            self.repository.loans.counts(today),
        )?;

        let (most_borrowed_books, most_active_members) = tokio::try_join!(
            self.repository.books.most_borrowed(top),
            self.repository.members.most_active(top),
        )?;

        Ok(Report {
            total_books,
            total_members,
            active_members,
            total_loans: loans.total,
            active_loans: loans.active,
            overdue_loans: loans.overdue,
            most_borrowed_books,
            most_active_members,
        })
    }
}
