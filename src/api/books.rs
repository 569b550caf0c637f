//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookForm, BookQuery, BookWithCategory},
        category::Category,
        form::FormErrors,
        loan::LoanDetails,
    },
    AppState,
};

use super::{flash::Level, invalid_form, page, redirect_with, FormPage, Page};

const BOOK_LIST: &str = "/libros/";

#[derive(Serialize)]
pub struct BookListPage {
    pub books: Vec<BookWithCategory>,
    pub categories: Vec<Category>,
    pub selected_category: Option<i32>,
    pub search: String,
}

#[derive(Serialize)]
pub struct BookDetailPage {
    pub book: BookWithCategory,
    pub is_available: bool,
    /// Most recent loans of this book, newest first
    pub loans: Vec<LoanDetails>,
}

#[derive(Serialize)]
pub struct CategoryChoices {
    pub categories: Vec<Category>,
}

pub type BookFormPage = FormPage<BookForm, CategoryChoices>;

async fn form_page(
    state: &AppState,
    heading: &'static str,
    form: BookForm,
    errors: FormErrors,
) -> AppResult<BookFormPage> {
    Ok(FormPage {
        heading,
        form,
        errors,
        choices: CategoryChoices {
            categories: state.services.catalog.list_categories().await?,
        },
    })
}

/// List books, filtered by category and/or a search term
pub async fn list_books(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<BookQuery>,
) -> AppResult<(CookieJar, Json<Page<BookListPage>>)> {
    let books = state.services.catalog.search_books(&query).await?;
    let categories = state.services.catalog.list_categories().await?;

    Ok(page(
        jar,
        BookListPage {
            books,
            categories,
            selected_category: query.category,
            search: query.search.unwrap_or_default(),
        },
    ))
}

/// Book detail with its latest loans
pub async fn book_detail(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> AppResult<(CookieJar, Json<Page<BookDetailPage>>)> {
    let today = Utc::now().date_naive();
    let (book, loans) = state
        .services
        .catalog
        .get_book_detail(id, state.config.library.recent_loans_limit, today)
        .await?;

    Ok(page(
        jar,
        BookDetailPage {
            is_available: book.book.is_available(),
            book,
            loans,
        },
    ))
}

/// Empty book form
pub async fn new_book(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Page<BookFormPage>>)> {
    let content = form_page(&state, "Add book", BookForm::default(), FormErrors::new()).await?;
    Ok(page(jar, content))
}

/// Add a book
pub async fn create_book(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<BookForm>,
) -> AppResult<Response> {
    match state.services.catalog.create_book(&form).await {
        Ok(_) => Ok(redirect_with(jar, Level::Success, "Book added successfully.", BOOK_LIST)),
        Err(AppError::Validation(errors)) => {
            let content = form_page(&state, "Add book", form, errors).await?;
            Ok(invalid_form(jar, content))
        }
        Err(e) => Err(e),
    }
}

/// Book form filled with the stored values
pub async fn edit_book(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> AppResult<(CookieJar, Json<Page<BookFormPage>>)> {
    let book = state.services.catalog.get_book(id).await?;
    let content = form_page(&state, "Edit book", BookForm::from_book(&book), FormErrors::new()).await?;
    Ok(page(jar, content))
}

/// Save changes to a book
pub async fn update_book(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
    Form(form): Form<BookForm>,
) -> AppResult<Response> {
    match state.services.catalog.update_book(id, &form).await {
        Ok(_) => Ok(redirect_with(jar, Level::Success, "Book updated successfully.", BOOK_LIST)),
        Err(AppError::Validation(errors)) => {
            let content = form_page(&state, "Edit book", form, errors).await?;
            Ok(invalid_form(jar, content))
        }
        Err(e) => Err(e),
    }
}

/// Delete a book unless it has loans out
pub async fn delete_book(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    match state.services.catalog.delete_book(id).await {
        Ok(_) => Ok(redirect_with(jar, Level::Success, "Book deleted successfully.", BOOK_LIST)),
        Err(AppError::BusinessRule(msg)) => Ok(redirect_with(jar, Level::Error, msg, BOOK_LIST)),
        Err(e) => Err(e),
    }
}
