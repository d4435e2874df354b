use axum::http::{HeaderName, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use authgate_auth::TokenError;
use authgate_core::ValidationError;
use authgate_directory::{DirectoryError, DiscoveryError};

use crate::app::dto::ErrorResponse;

pub const INVALID_REQUEST: &str = "invalid request";
pub const AUTHENTICATION_FAILED: &str = "authentication failed";
pub const TOKEN_GENERATION_FAILED: &str = "token generation failed";
pub const INTERNAL_ERROR: &str = "internal error";

/// Headers sent on every `/auth` response, preflight included.
pub const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization"),
];

/// Why an `/auth` request did not produce a token.
///
/// `Display` carries the full cause for operator logs. Clients only ever see
/// [`AuthError::public_message`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    /// Only the position is kept: serde messages can quote field values.
    #[error("malformed request body at line {line}, column {column}")]
    MalformedBody { line: usize, column: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl AuthError {
    pub fn malformed_body(err: &serde_json::Error) -> Self {
        Self::MalformedBody {
            line: err.line(),
            column: err.column(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::MalformedBody { .. } | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Discovery(e) if e.is_configuration() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Discovery(_) | Self::Directory(_) => StatusCode::UNAUTHORIZED,
            Self::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) | Self::MalformedBody { .. } | Self::Validation(_) => {
                INVALID_REQUEST
            }
            Self::Discovery(e) if e.is_configuration() => INTERNAL_ERROR,
            Self::Discovery(_) | Self::Directory(_) => AUTHENTICATION_FAILED,
            Self::Token(_) => TOKEN_GENERATION_FAILED,
        }
    }

    /// Stable label for the `failure` log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::MalformedBody { .. } => "malformed_body",
            Self::Validation(_) => "validation",
            Self::Discovery(e) if e.is_configuration() => "unsupported_platform",
            Self::Discovery(_) => "lookup_failure",
            Self::Directory(e) => e.kind(),
            Self::Token(_) => "token_generation",
        }
    }

    pub fn log(&self) {
        let status = self.status();
        if status.is_server_error() {
            error!(failure = self.kind(), status = status.as_u16(), error = %self, "auth request failed");
        } else {
            warn!(failure = self.kind(), status = status.as_u16(), error = %self, "auth request rejected");
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.public_message())
    }
}

pub fn json_error(status: StatusCode, message: &'static str) -> Response {
    (
        status,
        CORS_HEADERS,
        axum::Json(ErrorResponse { error: message }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_map_to_generic_statuses() {
        let cases: Vec<(AuthError, StatusCode, &str)> = vec![
            (
                AuthError::MethodNotAllowed(Method::GET),
                StatusCode::METHOD_NOT_ALLOWED,
                INVALID_REQUEST,
            ),
            (
                AuthError::MalformedBody { line: 1, column: 2 },
                StatusCode::BAD_REQUEST,
                INVALID_REQUEST,
            ),
            (
                ValidationError::MissingField("UserID").into(),
                StatusCode::BAD_REQUEST,
                INVALID_REQUEST,
            ),
            (
                DiscoveryError::UnsupportedPlatform("plan9".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR,
            ),
            (
                DiscoveryError::NoHosts("example.com".into()).into(),
                StatusCode::UNAUTHORIZED,
                AUTHENTICATION_FAILED,
            ),
            (
                DirectoryError::InvalidCredentials.into(),
                StatusCode::UNAUTHORIZED,
                AUTHENTICATION_FAILED,
            ),
            (
                DirectoryError::Timeout("bind").into(),
                StatusCode::UNAUTHORIZED,
                AUTHENTICATION_FAILED,
            ),
            (
                DirectoryError::connection("tls handshake failed").into(),
                StatusCode::UNAUTHORIZED,
                AUTHENTICATION_FAILED,
            ),
            (
                DirectoryError::LookupFailure(DiscoveryError::NoHosts("x".into())).into(),
                StatusCode::UNAUTHORIZED,
                AUTHENTICATION_FAILED,
            ),
            (
                TokenError::MissingSecret.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                TOKEN_GENERATION_FAILED,
            ),
        ];

        for (err, status, message) in cases {
            assert_eq!(err.status(), status, "{err}");
            assert_eq!(err.public_message(), message, "{err}");
        }
    }

    #[test]
    fn directory_failures_keep_distinct_kinds() {
        let kinds: Vec<&str> = [
            DirectoryError::InvalidCredentials,
            DirectoryError::Timeout("connect"),
            DirectoryError::connection("refused"),
            DirectoryError::LookupFailure(DiscoveryError::NoHosts("x".into())),
        ]
        .into_iter()
        .map(|e| AuthError::from(e).kind())
        .collect();

        assert_eq!(
            kinds,
            vec!["invalid_credentials", "timeout", "connection_failure", "lookup_failure"]
        );
    }
}
