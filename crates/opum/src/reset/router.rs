use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::mailer::MailTransport;
use super::service::{
    CredentialStore, PasswordResetService, ResetError, ResetPassword, ResetPasswordToken,
};

type SharedResetService<S, M> = Arc<PasswordResetService<S, M>>;

pub fn reset_router<S, M>(service: SharedResetService<S, M>) -> Router
where
    S: CredentialStore + 'static,
    M: MailTransport + 'static,
{
    Router::new()
        .route("/api/v1/password/reset-links", post(send_links::<S, M>))
        .route("/api/v1/password/validate-token", post(validate_token::<S, M>))
        .route("/api/v1/password/reset", post(reset_password::<S, M>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct ResetLinkRequest {
    pub recipients: Vec<String>,
}

async fn send_links<S, M>(
    State(service): State<SharedResetService<S, M>>,
    Json(request): Json<ResetLinkRequest>,
) -> Response
where
    S: CredentialStore + 'static,
    M: MailTransport + 'static,
{
    let outcome =
        tokio::task::spawn_blocking(move || service.email_reset_links(&request.recipients)).await;

    match outcome {
        Ok(Ok(sent)) => (StatusCode::OK, Json(json!({ "sent": sent }))).into_response(),
        Ok(Err(err)) => error_response(&err),
        Err(join_error) => join_failure(join_error),
    }
}

async fn validate_token<S, M>(
    State(service): State<SharedResetService<S, M>>,
    Json(request): Json<ResetPasswordToken>,
) -> Response
where
    S: CredentialStore + 'static,
    M: MailTransport + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || service.validate_token(&request)).await;

    match outcome {
        Ok(Ok(valid)) => (StatusCode::OK, Json(json!({ "valid": valid }))).into_response(),
        Ok(Err(err)) => error_response(&err),
        Err(join_error) => join_failure(join_error),
    }
}

async fn reset_password<S, M>(
    State(service): State<SharedResetService<S, M>>,
    Json(request): Json<ResetPassword>,
) -> Response
where
    S: CredentialStore + 'static,
    M: MailTransport + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || service.reset_password(&request)).await;

    match outcome {
        Ok(Ok(())) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(err)) => error_response(&err),
        Err(join_error) => join_failure(join_error),
    }
}

fn error_response(err: &ResetError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        error!(error = %err, "password reset request failed");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn join_failure(join_error: tokio::task::JoinError) -> Response {
    error!(error = %join_error, "password reset task did not complete");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "password reset failed" })),
    )
        .into_response()
}

pub(crate) fn status_for(error: &ResetError) -> StatusCode {
    match error {
        ResetError::UnknownAccount { .. } => StatusCode::NOT_FOUND,
        ResetError::InvalidToken => StatusCode::UNAUTHORIZED,
        ResetError::WeakPassword(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ResetError::Mail { .. } => StatusCode::BAD_GATEWAY,
        ResetError::Hash(_) | ResetError::Token(_) | ResetError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reset::mailer::MailError;
    use crate::upload::repository::StoreError;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            status_for(&ResetError::UnknownAccount {
                email: "ghost@x.com".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ResetError::InvalidToken),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&ResetError::WeakPassword("too short".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&ResetError::Mail {
                recipient: "jane@x.com".to_string(),
                source: MailError::Build("no relay".to_string()),
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ResetError::Store(StoreError::Unavailable("down".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
