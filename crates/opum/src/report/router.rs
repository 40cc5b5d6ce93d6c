use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::utilization::UtilizationReport;
use crate::error::AppError;

pub const REPORT_FILENAME: &str = "utilization.csv";

pub fn report_router() -> Router {
    Router::new().route("/api/v1/reports/utilization", post(utilization_report))
}

async fn utilization_report(Json(report): Json<UtilizationReport>) -> Result<Response, AppError> {
    let csv = report.to_csv()?;
    tracing::info!(rows = report.rows.len(), "utilization report rendered");

    let disposition = format!("attachment; filename={REPORT_FILENAME}");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}
