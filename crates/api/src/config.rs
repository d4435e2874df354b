//! Service configuration, read from the process environment.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use authgate_core::{Domain, HostCandidate};

pub const LISTEN_ADDR: &str = "AUTH_LISTEN_ADDR";
pub const JWT_SECRET: &str = "JWT_SECRET";
pub const TOKEN_EXPIRY: &str = "TOKEN_EXPIRY";
pub const TOKEN_ISSUER: &str = "TOKEN_ISSUER";
pub const TOKEN_AUDIENCE: &str = "TOKEN_AUDIENCE";
pub const LDAP_PORT: &str = "LDAP_PORT";
pub const LDAP_CONNECT_TIMEOUT: &str = "LDAP_CONNECT_TIMEOUT";
pub const LDAP_OPERATION_TIMEOUT: &str = "LDAP_OPERATION_TIMEOUT";
pub const DISCOVERY_TIMEOUT: &str = "DISCOVERY_TIMEOUT";
pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
pub const LDAP_ADMIN_GROUPS: &str = "LDAP_ADMIN_GROUPS";
pub const LDAP_RESOLVE_ROLES: &str = "LDAP_RESOLVE_ROLES";
pub const STATIC_DIRECTORY_HOSTS: &str = "STATIC_DIRECTORY_HOSTS";

/// Upper bound for network and request timeouts.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
/// Upper bound for token lifetime; keeps `exp` well inside `i64` seconds.
pub const MAX_TOKEN_EXPIRY: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            reason: reason.into(),
        }
    }
}

/// Everything the binary needs to wire the `/auth` pipeline.
#[derive(Debug)]
pub struct AuthServiceConfig {
    pub listen_addr: SocketAddr,
    pub jwt_secret: SecretString,
    pub token_expiry: Duration,
    pub token_issuer: String,
    pub token_audience: Vec<String>,
    pub ldap_port: u16,
    pub ldap_connect_timeout: Duration,
    pub ldap_operation_timeout: Duration,
    pub discovery_timeout: Duration,
    pub request_timeout: Duration,
    pub admin_groups: Vec<String>,
    pub resolve_roles: bool,
    /// Pinned hosts per domain. When set, platform discovery is not used.
    pub static_hosts: Option<HashMap<Domain, Vec<HostCandidate>>>,
}

impl AuthServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get(JWT_SECRET)
            .map(SecretString::from)
            .ok_or(ConfigError::Missing(JWT_SECRET))?;

        let listen_addr = match get(LISTEN_ADDR) {
            Some(raw) => raw
                .trim()
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::invalid(LISTEN_ADDR, format!("{e}")))?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let ldap_port = match get(LDAP_PORT) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| ConfigError::invalid(LDAP_PORT, format!("`{raw}` is not a port")))?,
            None => 636,
        };

        let resolve_roles = match get(LDAP_RESOLVE_ROLES) {
            Some(raw) => parse_bool(LDAP_RESOLVE_ROLES, &raw)?,
            None => true,
        };

        let token_audience = get(TOKEN_AUDIENCE)
            .map(|raw| split_list(&raw, ','))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec![authgate_auth::issuer::DEFAULT_AUDIENCE.to_string()]);

        let admin_groups = get(LDAP_ADMIN_GROUPS)
            .map(|raw| split_list(&raw, ','))
            .unwrap_or_else(|| vec!["cn=admins".to_string()]);

        let static_hosts = get(STATIC_DIRECTORY_HOSTS)
            .map(|raw| parse_static_hosts(&raw))
            .transpose()?;

        let config = Self {
            listen_addr,
            jwt_secret,
            token_expiry: duration(
                &get,
                TOKEN_EXPIRY,
                Duration::from_secs(24 * 60 * 60),
                MAX_TOKEN_EXPIRY,
            )?,
            token_issuer: get(TOKEN_ISSUER)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| authgate_auth::issuer::DEFAULT_ISSUER.to_string()),
            token_audience,
            ldap_port,
            ldap_connect_timeout: duration(
                &get,
                LDAP_CONNECT_TIMEOUT,
                Duration::from_secs(10),
                MAX_TIMEOUT,
            )?,
            ldap_operation_timeout: duration(
                &get,
                LDAP_OPERATION_TIMEOUT,
                Duration::from_secs(5),
                MAX_TIMEOUT,
            )?,
            discovery_timeout: duration(
                &get,
                DISCOVERY_TIMEOUT,
                Duration::from_secs(5),
                MAX_TIMEOUT,
            )?,
            request_timeout: duration(
                &get,
                REQUEST_TIMEOUT,
                Duration::from_secs(30),
                MAX_TIMEOUT,
            )?,
            admin_groups,
            resolve_roles,
            static_hosts,
        };

        if config.token_expiry.as_secs() == 0 {
            return Err(ConfigError::invalid(TOKEN_EXPIRY, "must be at least 1s"));
        }
        if config.jwt_secret.expose_secret().len() < 16 {
            tracing::warn!("{JWT_SECRET} is shorter than 16 bytes");
        }
        Ok(config)
    }
}

fn duration(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Duration,
    max: Duration,
) -> Result<Duration, ConfigError> {
    let Some(raw) = get(var) else {
        return Ok(default);
    };
    let parsed = humantime::parse_duration(raw.trim())
        .map_err(|e| ConfigError::invalid(var, format!("`{raw}`: {e}")))?;
    if parsed.is_zero() {
        return Err(ConfigError::invalid(var, "must be greater than zero"));
    }
    if parsed > max {
        return Err(ConfigError::invalid(
            var,
            format!("`{raw}` exceeds {}", humantime::format_duration(max)),
        ));
    }
    Ok(parsed)
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(var, format!("`{other}` is not a boolean"))),
    }
}

fn split_list(raw: &str, sep: char) -> Vec<String> {
    raw.split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `example.com=dc1.example.com,dc2.example.com;corp.local=10.0.0.5:636`
fn parse_static_hosts(raw: &str) -> Result<HashMap<Domain, Vec<HostCandidate>>, ConfigError> {
    let mut map = HashMap::new();
    for entry in split_list(raw, ';') {
        let (domain, hosts) = entry.split_once('=').ok_or_else(|| {
            ConfigError::invalid(STATIC_DIRECTORY_HOSTS, format!("`{entry}` is not domain=hosts"))
        })?;
        let domain = Domain::parse(domain)
            .map_err(|e| ConfigError::invalid(STATIC_DIRECTORY_HOSTS, e.to_string()))?;
        let hosts: Vec<HostCandidate> = hosts.split(',').filter_map(HostCandidate::parse).collect();
        if hosts.is_empty() {
            return Err(ConfigError::invalid(
                STATIC_DIRECTORY_HOSTS,
                format!("no hosts listed for {domain}"),
            ));
        }
        map.entry(domain).or_insert_with(Vec::new).extend(hosts);
    }
    Ok(map)
}
