//! Login credential.

use secrecy::{ExposeSecret, SecretString};

use crate::domain::Domain;

/// `(username, password, domain)` presented for a single verification.
///
/// The password lives in a [`SecretString`]: it is zeroized on drop and its
/// `Debug` output is redacted, so logging a `Credential` never leaks it.
#[derive(Debug)]
pub struct Credential {
    username: String,
    password: SecretString,
    domain: Domain,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: SecretString, domain: Domain) -> Self {
        Self {
            username: username.into(),
            password,
            domain,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Password for the bind call. Do not log or store the returned value.
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Both username and password are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.expose_secret().is_empty()
    }

    /// Principal presented to the directory.
    ///
    /// `user` becomes `user@domain`; names already in UPN (`user@realm`) or
    /// down-level (`REALM\user`) form are passed through untouched.
    pub fn principal(&self) -> String {
        let user = self.username.trim();
        if user.contains('@') || user.contains('\\') {
            user.to_string()
        } else {
            format!("{user}@{}", self.domain)
        }
    }
}
