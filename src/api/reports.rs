//! Library report

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use crate::{error::AppResult, services::stats::Report};

use super::{page, Page};

/// Totals plus the most borrowed books and most active members
pub async fn report(
    State(state): State<crate::AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Page<Report>>)> {
    let today = Utc::now().date_naive();
    let report = state
        .services
        .stats
        .report(today, state.config.library.report_top_limit)
        .await?;
    Ok(page(jar, report))
}
