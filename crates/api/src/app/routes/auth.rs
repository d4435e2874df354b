use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{Instrument, Span, field, info_span};
use uuid::Uuid;

use crate::app::dto::{AuthRequest, AuthResponse};
use crate::app::errors::{AuthError, CORS_HEADERS};
use crate::app::services::AuthPipeline;

/// Preflight cache lifetime, seconds.
const PREFLIGHT_MAX_AGE: &str = "3600";

/// `/auth`: every method lands here so the method table is applied in one
/// place, with the same CORS headers on every outcome.
pub async fn authenticate(
    Extension(pipeline): Extension<Arc<AuthPipeline>>,
    method: Method,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return preflight();
    }

    let span = info_span!(
        "auth_request",
        request_id = %Uuid::now_v7(),
        user = field::Empty,
        domain = field::Empty,
    );

    async move {
        match handle(&pipeline, method, &body).await {
            Ok(response) => response,
            Err(err) => {
                err.log();
                err.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn handle(pipeline: &AuthPipeline, method: Method, body: &[u8]) -> Result<Response, AuthError> {
    if method != Method::POST {
        return Err(AuthError::MethodNotAllowed(method));
    }

    let request: AuthRequest =
        serde_json::from_slice(body).map_err(|e| AuthError::malformed_body(&e))?;
    let (credential, role_hint) = request.into_credential()?;

    let span = Span::current();
    span.record("user", credential.username());
    span.record("domain", credential.domain().as_str());

    let outcome = pipeline.authenticate(&credential).await?;

    let response = AuthResponse {
        user_id: credential.username().to_string(),
        is_authenticated: true,
        role: role_hint.unwrap_or(outcome.identity.role),
        token: outcome.token,
    };
    Ok((StatusCode::OK, CORS_HEADERS, Json(response)).into_response())
}

fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        CORS_HEADERS,
        [(header::ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE)],
    )
        .into_response()
}
