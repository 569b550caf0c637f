//! Member endpoints

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
        form::FormErrors,
        member::{MemberForm, MemberWithActiveLoans},
    },
    AppState,
};

use super::{flash::Level, invalid_form, page, redirect_with, FormPage, Page};

const MEMBER_LIST: &str = "/usuarios/";

#[derive(Serialize)]
pub struct MemberListPage {
    pub members: Vec<MemberWithActiveLoans>,
}

/// Whether the form shows the `active` checkbox (edit only)
#[derive(Serialize)]
pub struct MemberFormOptions {
    pub editing: bool,
}

pub type MemberFormPage = FormPage<MemberForm, MemberFormOptions>;

fn form_page(editing: bool, form: MemberForm, errors: FormErrors) -> MemberFormPage {
    FormPage {
        heading: if editing { "Edit member" } else { "Add member" },
        form,
        errors,
        choices: MemberFormOptions { editing },
    }
}

/// Members with the number of books each has out
pub async fn list_members(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Page<MemberListPage>>)> {
    let members = state.services.members.list_members().await?;
    Ok(page(jar, MemberListPage { members }))
}

pub async fn new_member(jar: CookieJar) -> (CookieJar, Json<Page<MemberFormPage>>) {
    page(jar, form_page(false, MemberForm::default(), FormErrors::new()))
}

/// Register a member
pub async fn create_member(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<MemberForm>,
) -> AppResult<Response> {
    match state.services.members.create_member(&form).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Level::Success,
            "Member added successfully.",
            MEMBER_LIST,
        )),
        Err(AppError::Validation(errors)) => Ok(invalid_form(jar, form_page(false, form, errors))),
        Err(e) => Err(e),
    }
}

pub async fn edit_member(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> AppResult<(CookieJar, Json<Page<MemberFormPage>>)> {
    let member = state.services.members.get_member(id).await?;
    Ok(page(
        jar,
        form_page(true, MemberForm::from_member(&member), FormErrors::new()),
    ))
}

/// Save changes to a member, including activation
pub async fn update_member(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
    Form(form): Form<MemberForm>,
) -> AppResult<Response> {
    match state.services.members.update_member(id, &form).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Level::Success,
            "Member updated successfully.",
            MEMBER_LIST,
        )),
        Err(AppError::Validation(errors)) => Ok(invalid_form(jar, form_page(true, form, errors))),
        Err(e) => Err(e),
    }
}

/// Delete a member unless they have books out
pub async fn delete_member(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i32>,
) -> AppResult<Response> {
    match state.services.members.delete_member(id).await {
        Ok(_) => Ok(redirect_with(
            jar,
            Level::Success,
            "Member deleted successfully.",
            MEMBER_LIST,
        )),
        Err(AppError::BusinessRule(msg)) => Ok(redirect_with(jar, Level::Error, msg, MEMBER_LIST)),
        Err(e) => Err(e),
    }
}
