//! HTTP handlers for the library endpoints
//!
//! GET handlers answer with a JSON page bundle. Mutations answer with a
//! `303 See Other` redirect and a flash message, or re-send the form bundle
//! with `422` when the submission does not validate.

pub mod books;
pub mod categories;
pub mod flash;
pub mod health;
pub mod home;
pub mod loans;
pub mod members;
pub mod reports;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::{models::form::FormErrors, AppState};

use flash::{FlashMessage, Level};

/// Page bundle: handler content plus the pending flash messages
#[derive(Serialize)]
pub struct Page<T> {
    #[serde(flatten)]
    pub content: T,
    pub messages: Vec<FlashMessage>,
}

/// Form page bundle: submitted (or initial) values, field errors and the
/// choices the form offers
#[derive(Serialize)]
pub struct FormPage<F, C> {
    pub heading: &'static str,
    pub form: F,
    pub errors: FormErrors,
    #[serde(flatten)]
    pub choices: C,
}

/// Wrap content into a page bundle, consuming pending flash messages
pub fn page<T: Serialize>(jar: CookieJar, content: T) -> (CookieJar, Json<Page<T>>) {
    let (jar, messages) = flash::take(jar);
    (jar, Json(Page { content, messages }))
}

/// Re-send a form that did not validate
pub fn invalid_form<T: Serialize>(jar: CookieJar, content: T) -> Response {
    let (jar, body) = page(jar, content);
    (StatusCode::UNPROCESSABLE_ENTITY, jar, body).into_response()
}

/// Redirect after a mutation, with a message for the next page
pub fn redirect_with(jar: CookieJar, level: Level, text: impl Into<String>, to: &str) -> Response {
    (flash::push(jar, level, text), Redirect::to(to)).into_response()
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        // Books
        .route("/libros/", get(books::list_books))
        .route(
            "/libros/agregar/",
            get(books::new_book).post(books::create_book),
        )
        .route("/libros/:id/", get(books::book_detail))
        .route(
            "/libros/:id/editar/",
            get(books::edit_book).post(books::update_book),
        )
        .route("/libros/:id/eliminar/", post(books::delete_book))
        // Members
        .route("/usuarios/", get(members::list_members))
        .route(
            "/usuarios/agregar/",
            get(members::new_member).post(members::create_member),
        )
        .route(
            "/usuarios/:id/editar/",
            get(members::edit_member).post(members::update_member),
        )
        .route("/usuarios/:id/eliminar/", post(members::delete_member))
        // Loans
        .route("/prestamos/", get(loans::list_loans))
        .route(
            "/prestamos/agregar/",
            get(loans::new_loan).post(loans::create_loan),
        )
        .route("/prestamos/:id/devolver/", post(loans::return_loan))
        // Categories
        .route("/categorias/", get(categories::list_categories))
        .route(
            "/categorias/agregar/",
            get(categories::new_category).post(categories::create_category),
        )
        .route(
            "/categorias/:id/editar/",
            get(categories::edit_category).post(categories::update_category),
        )
        .route(
            "/categorias/:id/eliminar/",
            post(categories::delete_category),
        )
        // Reports
        .route("/reportes/", get(reports::report))
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
