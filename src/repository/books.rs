//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookChoice, BookInput, BookLoanCount, BookQuery, BookWithCategory},
        form::FormErrors,
    },
};

use super::{contains_pattern, unique_as_field_error};

const DUPLICATE_ISBN: &str = "Book with this ISBN already exists.";

const BOOK_COLUMNS: &str = "b.id, b.title, b.author, b.isbn, b.category_id, b.publication_date, \
     b.total_copies, b.available_copies, b.description, b.added_at";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books b WHERE b.id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book with its category name
    pub async fn get_with_category(&self, id: i32) -> AppResult<BookWithCategory> {
        sqlx::query_as::<_, BookWithCategory>(&format!(
            r#"
            SELECT {}, c.name AS category_name
            FROM books b
            JOIN categories c ON c.id = b.category_id
            WHERE b.id = $1
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    /// List books, optionally restricted to a category and/or matching a
    /// search term in title, author or ISBN (case-insensitive)
    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<BookWithCategory>> {
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let books = sqlx::query_as::<_, BookWithCategory>(&format!(
            r#"
            SELECT {}, c.name AS category_name
            FROM books b
            JOIN categories c ON c.id = b.category_id
            WHERE ($1::int IS NULL OR b.category_id = $1)
              AND ($2::text IS NULL
                   OR b.title ILIKE $2
                   OR b.author ILIKE $2
                   OR b.isbn ILIKE $2)
            ORDER BY b.id
            "#,
            BOOK_COLUMNS
        ))
        .bind(query.category)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Books with at least one copy on the shelf (loan form choices)
    pub async fn list_available(&self) -> AppResult<Vec<BookChoice>> {
        let books = sqlx::query_as::<_, BookChoice>(
            r#"
            SELECT id, title, author, available_copies
            FROM books
            WHERE available_copies > 0
            ORDER BY title, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Check if an ISBN is taken
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE UPPER(isbn) = UPPER($1) AND ($2::int IS NULL OR id != $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Books ranked by how many loans they ever had, zero-loan books excluded.
    /// Ties go to the lower id.
    pub async fn most_borrowed(&self, limit: i64) -> AppResult<Vec<BookLoanCount>> {
        let books = sqlx::query_as::<_, BookLoanCount>(
            r#"
            SELECT b.id, b.title, b.author, COUNT(l.id) AS loan_count
            FROM books b
            JOIN loans l ON l.book_id = b.id
            GROUP BY b.id
            ORDER BY loan_count DESC, b.id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Create a new book
    pub async fn create(&self, book: &BookInput) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, category_id, publication_date,
                               total_copies, available_copies, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, author, isbn, category_id, publication_date,
                      total_copies, available_copies, description, added_at
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.category_id)
        .bind(book.publication_date)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(&book.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_as_field_error(e, "isbn", DUPLICATE_ISBN))
    }

    /// Update an existing book.
    ///
    /// Copies on loan are not on the shelf, so `available_copies` may not
    /// exceed `total_copies` minus the loans still out. The row lock keeps a
    /// concurrent checkout or return from moving the counter under the check.
    pub async fn update(&self, id: i32, book: &BookInput) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let on_loan: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE book_id = $1 AND status = 'loaned'",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let shelf_limit = i64::from(book.total_copies) - on_loan;
        if i64::from(book.available_copies) > shelf_limit {
            return Err(AppError::Validation(FormErrors::field(
                "available_copies",
                format!(
                    "{} copies are on loan; at most {} can be available.",
                    on_loan,
                    shelf_limit.max(0)
                ),
            )));
        }

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = $1, author = $2, isbn = $3, category_id = $4,
                publication_date = $5, total_copies = $6, available_copies = $7,
                description = $8
            WHERE id = $9
            RETURNING id, title, author, isbn, category_id, publication_date,
                      total_copies, available_copies, description, added_at
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.category_id)
        .bind(book.publication_date)
        .bind(book.total_copies)
        .bind(book.available_copies)
        .bind(&book.description)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_as_field_error(e, "isbn", DUPLICATE_ISBN))?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Delete a book that has no loan out.
    ///
    /// Loan creation decrements the book row, so locking it here serializes
    /// the guard check against concurrent checkouts.
    pub async fn delete(&self, id: i32) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books b WHERE b.id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let has_active_loans: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND status = 'loaned')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if has_active_loans {
            return Err(AppError::BusinessRule(
                "Cannot delete the book because it has active loans.".to_string(),
            ));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(book)
    }
}
