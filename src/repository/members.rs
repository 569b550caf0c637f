//! Members repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::member::{Member, MemberChoice, MemberInput, MemberLoanCount, MemberWithActiveLoans},
};

use super::unique_as_field_error;

const DUPLICATE_EMAIL: &str = "Member with this email already exists.";

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get member by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            SELECT id, first_name, last_name, email, phone, registered_at, active
            FROM members
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// All members with the number of loans each still has out
    pub async fn list_with_active_loans(&self) -> AppResult<Vec<MemberWithActiveLoans>> {
        let members = sqlx::query_as::<_, MemberWithActiveLoans>(
            r#"
            SELECT m.id, m.first_name, m.last_name, m.email, m.phone, m.registered_at, m.active,
                   COUNT(l.id) FILTER (WHERE l.status = 'loaned') AS active_loans
            FROM members m
            LEFT JOIN loans l ON l.member_id = m.id
            GROUP BY m.id
            ORDER BY m.last_name, m.first_name, m.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Members allowed to borrow (loan form choices)
    pub async fn list_active(&self) -> AppResult<Vec<MemberChoice>> {
        let members = sqlx::query_as::<_, MemberChoice>(
            r#"
            SELECT id, first_name, last_name
            FROM members
            WHERE active
            ORDER BY last_name, first_name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM members WHERE LOWER(email) = LOWER($1) AND ($2::int IS NULL OR id != $2))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Members ranked by how many loans they ever had, zero-loan members
    /// excluded. Ties go to the lower id.
    pub async fn most_active(&self, limit: i64) -> AppResult<Vec<MemberLoanCount>> {
        let members = sqlx::query_as::<_, MemberLoanCount>(
            r#"
            SELECT m.id, m.first_name, m.last_name, COUNT(l.id) AS loan_count
            FROM members m
            JOIN loans l ON l.member_id = m.id
            GROUP BY m.id
            ORDER BY loan_count DESC, m.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members WHERE active")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Create a new member (always active)
    pub async fn create(&self, member: &MemberInput) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (first_name, last_name, email, phone, active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING id, first_name, last_name, email, phone, registered_at, active
            "#,
        )
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_as_field_error(e, "email", DUPLICATE_EMAIL))
    }

    /// Update an existing member, including the active flag
    pub async fn update(&self, id: i32, member: &MemberInput) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET
                first_name = $1, last_name = $2, email = $3, phone = $4, active = $5
            WHERE id = $6
            RETURNING id, first_name, last_name, email, phone, registered_at, active
            "#,
        )
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(member.active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_as_field_error(e, "email", DUPLICATE_EMAIL))?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))
    }

    /// Delete a member with no loan out. Loan creation takes a share lock on
    /// the member row, so the guard cannot race a checkout.
    pub async fn delete(&self, id: i32) -> AppResult<Member> {
        let mut tx = self.pool.begin().await?;

        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, first_name, last_name, email, phone, registered_at, active
            FROM members
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member with id {} not found", id)))?;

        let has_active_loans: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE member_id = $1 AND status = 'loaned')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if has_active_loans {
            return Err(AppError::BusinessRule(
                "Cannot delete the member because they have active loans.".to_string(),
            ));
        }

        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(member)
    }
}
