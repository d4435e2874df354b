use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use authgate_core::{Credential, Domain, Role, ValidationError, ValidationResult};

// -------------------------
// Request DTOs
// -------------------------

/// `POST /auth` body. Missing fields deserialize as empty and are rejected
/// by [`AuthRequest::into_credential`].
#[derive(Deserialize)]
pub struct AuthRequest {
    #[serde(rename = "UserID", default)]
    pub user_id: String,

    #[serde(rename = "Password", default)]
    pub password: String,

    #[serde(rename = "Domain", default)]
    pub domain: String,

    /// Role hint; echoed back instead of the directory role when non-empty.
    #[serde(rename = "Role", default)]
    pub role: Option<String>,
}

impl core::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("user_id", &self.user_id)
            .field("password", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("role", &self.role)
            .finish()
    }
}

impl AuthRequest {
    /// Validate the body and move the password into a secret.
    pub fn into_credential(self) -> ValidationResult<(Credential, Option<Role>)> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingField("UserID"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("Password"));
        }
        let domain = Domain::parse(&self.domain)?;

        let role_hint = self
            .role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .map(Role::new);

        let credential = Credential::new(
            self.user_id.trim(),
            SecretString::from(self.password),
            domain,
        );
        Ok((credential, role_hint))
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(rename = "UserID")]
    pub user_id: String,

    #[serde(rename = "IsAuthenticated")]
    pub is_authenticated: bool,

    #[serde(rename = "Role")]
    pub role: Role,

    #[serde(rename = "Token")]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "Error")]
    pub error: &'static str,
}
