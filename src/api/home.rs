//! Home page counters

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use crate::{error::AppResult, services::stats::Summary};

use super::{page, Page};

/// Books, active members, loans out and overdue loans
pub async fn index(
    State(state): State<crate::AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Page<Summary>>)> {
    let today = Utc::now().date_naive();
    let summary = state.services.stats.summary(today).await?;
    Ok(page(jar, summary))
}
