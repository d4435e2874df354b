use thiserror::Error;

/// Failure to turn a domain into at least one directory host.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No discovery strategy exists for this operating system.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("failed to run discovery command `{program}`: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("discovery command `{program}` exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("discovery command `{program}` timed out")]
    CommandTimeout { program: String },

    #[error("no hosts found for {0}")]
    NoHosts(String),
}

impl DiscoveryError {
    /// `true` when the failure is a deployment problem rather than a lookup
    /// that simply came back empty or broken.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnsupportedPlatform(_))
    }
}

/// Failure outcome of a bind attempt.
///
/// The variants are kept apart for operators even though callers of the
/// HTTP endpoint all see the same generic rejection.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory rejected the principal/password pair, or the credential
    /// was incomplete and never sent.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("directory {0} timed out")]
    Timeout(&'static str),

    #[error("directory connection failed: {0}")]
    ConnectionFailure(String),

    /// Host discovery failed before any connection was attempted.
    #[error("directory host lookup failed: {0}")]
    LookupFailure(#[from] DiscoveryError),
}

impl DirectoryError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionFailure(msg.into())
    }

    /// Stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::Timeout(_) => "timeout",
            Self::ConnectionFailure(_) => "connection_failure",
            Self::LookupFailure(_) => "lookup_failure",
        }
    }
}
