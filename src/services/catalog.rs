//! Catalog management service (books and categories)

use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookForm, BookQuery, BookWithCategory},
        category::{Category, CategoryForm, CategoryWithBookCount},
        form::{FormErrors, INVALID_CHOICE},
        loan::LoanDetails,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<BookWithCategory>> {
        self.repository.books.search(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Book with its category and most recent loans
    pub async fn get_book_detail(
        &self,
        id: i32,
        recent_loans: i64,
        today: NaiveDate,
    ) -> AppResult<(BookWithCategory, Vec<LoanDetails>)> {
        let book = self.repository.books.get_with_category(id).await?;
        let loans = self
            .repository
            .loans
            .recent_for_book(id, recent_loans, today)
            .await?;
        Ok((book, loans))
    }

    /// Validate and create a book
    pub async fn create_book(&self, form: &BookForm) -> AppResult<Book> {
        let input = form.clean()?;
        self.check_book_references(&input.isbn, input.category_id, None)
            .await?;

        let book = self.repository.books.create(&input).await?;
        tracing::info!(book_id = book.id, isbn = %book.isbn, "Book created");
        Ok(book)
    }

    /// Validate and update a book
    pub async fn update_book(&self, id: i32, form: &BookForm) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await?;
        let input = form.clean()?;
        self.check_book_references(&input.isbn, input.category_id, Some(id))
            .await?;

        let book = self.repository.books.update(id, &input).await?;
        tracing::info!(book_id = book.id, "Book updated");
        Ok(book)
    }

    /// Delete a book unless one of its copies is out
    pub async fn delete_book(&self, id: i32) -> AppResult<Book> {
        match self.repository.books.delete(id).await {
            Ok(book) => {
                tracing::info!(book_id = id, "Book deleted");
                Ok(book)
            }
            Err(AppError::BusinessRule(msg)) => {
                tracing::warn!(book_id = id, "Book delete refused: {}", msg);
                Err(AppError::BusinessRule(msg))
            }
            Err(e) => Err(e),
        }
    }

    async fn check_book_references(
        &self,
        isbn: &str,
        category_id: i32,
        exclude_id: Option<i32>,
    ) -> AppResult<()> {
        let mut errors = FormErrors::new();

        if self.repository.books.isbn_exists(isbn, exclude_id).await? {
            errors.add("isbn", "Book with this ISBN already exists.");
        }

        match self.repository.categories.get_by_id(category_id).await {
            Ok(_) => {}
            Err(AppError::NotFound(_)) => errors.add("category", INVALID_CHOICE),
            Err(e) => return Err(e),
        }

        errors.into_result().map_err(AppError::Validation)
    }

    // =========================================================================
    // CATEGORIES
    // =========================================================================

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    /// Categories with the number of books in each
    pub async fn list_categories_with_counts(&self) -> AppResult<Vec<CategoryWithBookCount>> {
        self.repository.categories.list_with_book_counts().await
    }

    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    /// Validate and create a category
    pub async fn create_category(&self, form: &CategoryForm) -> AppResult<Category> {
        let input = form.clean()?;
        if self.repository.categories.name_exists(&input.name, None).await? {
            return Err(AppError::Validation(FormErrors::field(
                "name",
                "Category with this name already exists.",
            )));
        }

        let category = self.repository.categories.create(&input).await?;
        tracing::info!(category_id = category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Validate and update a category
    pub async fn update_category(&self, id: i32, form: &CategoryForm) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await?;
        let input = form.clean()?;
        if self
            .repository
            .categories
            .name_exists(&input.name, Some(id))
            .await?
        {
            return Err(AppError::Validation(FormErrors::field(
                "name",
                "Category with this name already exists.",
            )));
        }

        let category = self.repository.categories.update(id, &input).await?;
        tracing::info!(category_id = category.id, "Category updated");
        Ok(category)
    }

    /// Delete a category unless books are filed under it
    pub async fn delete_category(&self, id: i32) -> AppResult<Category> {
        match self.repository.categories.delete(id).await {
            Ok(category) => {
                tracing::info!(category_id = id, "Category deleted");
                Ok(category)
            }
            Err(AppError::BusinessRule(msg)) => {
                tracing::warn!(category_id = id, "Category delete refused: {}", msg);
                Err(AppError::BusinessRule(msg))
            }
            Err(e) => Err(e),
        }
    }
}
