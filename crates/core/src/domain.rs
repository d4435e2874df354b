//! Directory realm and host address types.

use core::net::Ipv6Addr;
use core::str::FromStr;
use serde::Serialize;

use crate::error::{ValidationError, ValidationResult};

const MAX_DOMAIN_LEN: usize = 253;

/// DNS-style name of a directory realm (e.g. `corp.example.com`).
///
/// # Invariants
/// - Never empty.
/// - Only ASCII alphanumerics, `-`, `_` and `.`; no empty labels.
/// - Stored lowercased.
///
/// The character set matters beyond DNS hygiene: the domain ends up in a
/// discovery command line and in LDAP DNs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        let trimmed = raw.trim().trim_end_matches('.');
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField("Domain"));
        }
        if trimmed.len() > MAX_DOMAIN_LEN {
            return Err(ValidationError::invalid_domain("domain exceeds 253 characters"));
        }
        if let Some(c) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(ValidationError::invalid_domain(format!(
                "unexpected character {c:?}"
            )));
        }
        if trimmed.split('.').any(str::is_empty) {
            return Err(ValidationError::invalid_domain("empty label"));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base DN of the realm: `corp.example.com` → `dc=corp,dc=example,dc=com`.
    pub fn base_dn(&self) -> String {
        self.0
            .split('.')
            .map(|label| format!("dc={label}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// SRV owner name used to locate domain controllers for this realm.
    pub fn ldap_srv_name(&self) -> String {
        format!("_ldap._tcp.dc._msdcs.{}", self.0)
    }
}

impl FromStr for Domain {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl core::fmt::Display for Domain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One directory host produced by discovery.
///
/// Either a bare hostname, an IPv4 or bracketed IPv6 address, or any of those
/// with a `:port` suffix. The fully-qualified root dot that SRV answers carry
/// is stripped, and bare IPv6 literals (`fe80::1`) are stored bracketed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HostCandidate(String);

impl HostCandidate {
    /// Parse a single discovery token. Blank tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        let host = token.trim().trim_end_matches('.');
        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return None;
        }
        if !host.starts_with('[') && host.matches(':').count() > 1 {
            let addr = host.parse::<Ipv6Addr>().ok()?;
            return Some(Self(format!("[{addr}]")));
        }
        Some(Self(host.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `host:port`, keeping an explicit port already present on the candidate.
    pub fn address(&self, default_port: u16) -> String {
        if let Some(rest) = self.0.strip_prefix('[') {
            return match rest.split_once("]:") {
                Some((_, port)) if port.parse::<u16>().is_ok() => self.0.clone(),
                _ => format!("{}:{default_port}", self.0),
            };
        }
        match self.0.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                self.0.clone()
            }
            _ => format!("{}:{default_port}", self.0),
        }
    }
}

impl core::fmt::Display for HostCandidate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
