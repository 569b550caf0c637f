//! Loan endpoints

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
        form::FormErrors,
        loan::{LoanDetails, LoanForm, LoanQuery, LoanStatus},
    },
    services::loans::LoanChoices,
    AppState,
};

use super::{flash::Level, invalid_form, page, redirect_with, FormPage, Page};

const LOAN_LIST: &str = "/prestamos/";

#[derive(Serialize)]
pub struct LoanListPage {
    pub loans: Vec<LoanDetails>,
    pub selected_status: Option<LoanStatus>,
}

pub type LoanFormPage = FormPage<LoanForm, LoanChoices>;

async fn form_page(state: &AppState, form: LoanForm, errors: FormErrors) -> AppResult<LoanFormPage> {
    Ok(FormPage {
        heading: "New loan",
        form,
        errors,
        choices: state.services.loans.choices().await?,
    })
}

/// Loans newest first, optionally filtered by status
pub async fn list_loans(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoanQuery>,
) -> AppResult<(CookieJar, Json<Page<LoanListPage>>)> {
    let today = Utc::now().date_naive();
    let loans = state.services.loans.list_loans(&query, today).await?;
    Ok(page(
        jar,
        LoanListPage {
            loans,
            selected_status: query.status,
        },
    ))
}

/// Loan form with the due date pre-filled
pub async fn new_loan(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Page<LoanFormPage>>)> {
    let today = Utc::now().date_naive();
    let form = LoanForm::initial(today, state.config.library.loan_period_days);
    let content = form_page(&state, form, FormErrors::new()).await?;
    Ok(page(jar, content))
}

/// Lend a book
pub async fn create_loan(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoanForm>,
) -> AppResult<Response> {
    match state.services.loans.create_loan(&form, Utc::now()).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Level::Success,
            "Loan registered successfully.",
            LOAN_LIST,
        )),
        Err(AppError::Validation(errors)) => {
            let content = form_page(&state, form, errors).await?;
            Ok(invalid_form(jar, content))
        }
        Err(e) => Err(e),
    }
}

/// Mark a loan returned
pub async fn return_loan(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    match state.services.loans.return_loan(id, Utc::now()).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Level::Success,
            "Book returned successfully.",
            LOAN_LIST,
        )),
        Err(AppError::BusinessRule(msg)) => Ok(redirect_with(jar, Level::Error, msg, LOAN_LIST)),
        Err(e) => Err(e),
    }
}
