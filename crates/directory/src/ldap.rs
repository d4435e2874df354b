//! `ldap3`-backed implementation of the directory session seam.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use tracing::{debug, warn};

use crate::client::{LdapDialer, LdapSession};
use crate::error::DirectoryError;

const MEMBER_OF: &str = "memberOf";

/// `invalidCredentials` (RFC 4511 §4.1.9).
const RC_INVALID_CREDENTIALS: u32 = 49;
/// `timeLimitExceeded`.
const RC_TIME_LIMIT_EXCEEDED: u32 = 3;

/// Dials real servers. TLS comes from the `ldaps://` scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldap3Dialer;

#[async_trait]
impl LdapDialer for Ldap3Dialer {
    async fn dial(&self, url: &str, timeout: Duration) -> Result<Box<dyn LdapSession>, DirectoryError> {
        let settings = LdapConnSettings::new().set_conn_timeout(timeout);

        // The connect timeout covers TCP only; bound the TLS handshake too.
        let (conn, ldap) =
            match tokio::time::timeout(timeout, LdapConnAsync::with_settings(settings, url)).await {
                Ok(result) => result.map_err(|e| classify(e, "connect"))?,
                Err(_) => return Err(DirectoryError::Timeout("connect")),
            };

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "ldap connection driver stopped");
            }
        });

        Ok(Box::new(Ldap3Session { ldap }))
    }
}

struct Ldap3Session {
    ldap: Ldap,
}

#[async_trait]
impl LdapSession for Ldap3Session {
    async fn bind(
        &mut self,
        principal: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<(), DirectoryError> {
        self.ldap
            .with_timeout(timeout)
            .simple_bind(principal, password)
            .await
            .and_then(|res| res.success())
            .map(|_| ())
            .map_err(|e| classify(e, "bind"))
    }

    async fn search_member_of(
        &mut self,
        base_dn: &str,
        filter: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, DirectoryError> {
        let (entries, _) = self
            .ldap
            .with_timeout(timeout)
            .search(base_dn, Scope::Subtree, filter, vec![MEMBER_OF])
            .await
            .and_then(|res| res.success())
            .map_err(|e| classify(e, "search"))?;

        let groups = entries
            .into_iter()
            .next()
            .map(SearchEntry::construct)
            .and_then(|entry| {
                entry
                    .attrs
                    .into_iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(MEMBER_OF))
                    .map(|(_, values)| values)
            })
            .unwrap_or_default();

        Ok(groups)
    }

    async fn unbind(&mut self) {
        if let Err(e) = self.ldap.unbind().await {
            debug!(error = %e, "ldap unbind failed");
        }
    }
}

fn classify(err: LdapError, stage: &'static str) -> DirectoryError {
    match err {
        LdapError::LdapResult { result } => classify_result_code(result.rc, &result.text, stage),
        LdapError::Timeout { .. } => DirectoryError::Timeout(stage),
        other => DirectoryError::connection(format!("{stage}: {other}")),
    }
}

/// Map a non-success LDAP result code to the failure taxonomy.
pub fn classify_result_code(rc: u32, text: &str, stage: &'static str) -> DirectoryError {
    match rc {
        RC_INVALID_CREDENTIALS => DirectoryError::InvalidCredentials,
        RC_TIME_LIMIT_EXCEEDED => DirectoryError::Timeout(stage),
        rc => DirectoryError::connection(format!("{stage} failed with result code {rc}: {text}")),
    }
}
