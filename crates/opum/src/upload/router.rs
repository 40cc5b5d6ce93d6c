use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::domain::Employee;
use super::repository::{EmployeeStore, Notifier};
use super::response::{render_error, SERVER_ERROR_MESSAGE, UPLOAD_SUCCESS_MESSAGE};
use super::service::{EmployeeUploadService, UploadError, UploadReceipt};
use super::validation::Validator;

/// Router builder exposing the roster upload endpoint. The body is the raw CSV.
pub fn upload_router<V, S, N>(service: Arc<EmployeeUploadService<V, S, N>>) -> Router
where
    V: Validator<Employee> + 'static,
    S: EmployeeStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/v1/employees/upload", post(upload_handler::<V, S, N>))
        .with_state(service)
}

#[derive(Debug, Serialize)]
struct UploadAccepted {
    message: &'static str,
    #[serde(flatten)]
    receipt: UploadReceipt,
}

pub(crate) async fn upload_handler<V, S, N>(
    State(service): State<Arc<EmployeeUploadService<V, S, N>>>,
    body: String,
) -> Response
where
    V: Validator<Employee> + 'static,
    S: EmployeeStore + 'static,
    N: Notifier + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || service.upload(&body)).await;

    match outcome {
        Ok(Ok(receipt)) => {
            let payload = UploadAccepted {
                message: UPLOAD_SUCCESS_MESSAGE,
                receipt,
            };
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(Err(err)) => {
            let payload = json!({
                "error": render_error(&err),
            });
            (status_for(&err), axum::Json(payload)).into_response()
        }
        Err(join_error) => {
            error!(error = %join_error, "roster upload task did not complete");
            let payload = json!({
                "error": SERVER_ERROR_MESSAGE,
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) fn status_for(error: &UploadError) -> StatusCode {
    match error {
        UploadError::EmptyInput => StatusCode::BAD_REQUEST,
        UploadError::InvalidRow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        UploadError::Duplicate { .. } => StatusCode::CONFLICT,
        UploadError::Directory(_) | UploadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        UploadError::Notification(_) => StatusCode::BAD_GATEWAY,
    }
}
