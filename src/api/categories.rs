//! Category endpoints

use axum::{
    extract::{Path, State},
    response::Response,
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::{
        category::{CategoryForm, CategoryWithBookCount},
        form::FormErrors,
    },
    AppState,
};

use super::{flash::Level, invalid_form, page, redirect_with, FormPage, Page};

const CATEGORY_LIST: &str = "/categorias/";

#[derive(Serialize)]
pub struct CategoryListPage {
    pub categories: Vec<CategoryWithBookCount>,
}

/// The category form offers no choices
#[derive(Serialize)]
pub struct NoChoices {}

pub type CategoryFormPage = FormPage<CategoryForm, NoChoices>;

fn form_page(heading: &'static str, form: CategoryForm, errors: FormErrors) -> CategoryFormPage {
    FormPage {
        heading,
        form,
        errors,
        choices: NoChoices {},
    }
}

/// Categories with their book counts
pub async fn list_categories(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Page<CategoryListPage>>)> {
    let categories = state.services.catalog.list_categories_with_counts().await?;
    Ok(page(jar, CategoryListPage { categories }))
}

pub async fn new_category(jar: CookieJar) -> (CookieJar, Json<Page<CategoryFormPage>>) {
    page(
        jar,
        form_page("Add category", CategoryForm::default(), FormErrors::new()),
    )
}

pub async fn create_category(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    match state.services.catalog.create_category(&form).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Level::Success,
            "Category added successfully.",
            CATEGORY_LIST,
        )),
        Err(AppError::Validation(errors)) => {
            Ok(invalid_form(jar, form_page("Add category", form, errors)))
        }
        Err(e) => Err(e),
    }
}

pub async fn edit_category(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> AppResult<(CookieJar, Json<Page<CategoryFormPage>>)> {
    let category = state.services.catalog.get_category(id).await?;
    Ok(page(
        jar,
        form_page(
            "Edit category",
            CategoryForm::from_category(&category),
            FormErrors::new(),
        ),
    ))
}

pub async fn update_category(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    match state.services.catalog.update_category(id, &form).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Level::Success,
            "Category updated successfully.",
            CATEGORY_LIST,
        )),
        Err(AppError::Validation(errors)) => {
            Ok(invalid_form(jar, form_page("Edit category", form, errors)))
        }
        Err(e) => Err(e),
    }
}

/// Delete a category unless books are filed under it
pub async fn delete_category(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    match state.services.catalog.delete_category(id).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Level::Success,
            "Category deleted successfully.",
            CATEGORY_LIST,
        )),
        Err(AppError::BusinessRule(msg)) => {
            Ok(redirect_with(jar, Level::Error, msg, CATEGORY_LIST))
        }
        Err(e) => Err(e),
    }
}
