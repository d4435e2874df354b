//! Credential verification against a directory host.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use authgate_core::{Credential, HostCandidate, Role};

use crate::error::DirectoryError;
use crate::ldap::Ldap3Dialer;

/// Everything needed for one bind attempt against one host.
#[derive(Debug)]
pub struct BindRequest<'a> {
    pub host: &'a HostCandidate,
    pub port: u16,
    pub credential: &'a Credential,
    /// Absolute deadline of the inbound request; caps every network step.
    pub deadline: Instant,
}

/// Successful bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundIdentity {
    pub subject: String,
    pub role: Role,
}

/// Verifies a credential against a selected directory host.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn authenticate(&self, request: BindRequest<'_>) -> Result<BoundIdentity, DirectoryError>;
}

/// Open connection to a directory server.
#[async_trait]
pub trait LdapSession: Send {
    async fn bind(
        &mut self,
        principal: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<(), DirectoryError>;

    /// `memberOf` values of the first entry matching `filter` under `base_dn`.
    async fn search_member_of(
        &mut self,
        base_dn: &str,
        filter: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, DirectoryError>;

    /// Best effort; errors are swallowed.
    async fn unbind(&mut self);
}

/// Opens [`LdapSession`]s. The network seam of [`LdapDirectoryClient`].
#[async_trait]
pub trait LdapDialer: Send + Sync {
    async fn dial(&self, url: &str, timeout: Duration) -> Result<Box<dyn LdapSession>, DirectoryError>;
}

#[derive(Debug, Clone)]
pub struct LdapClientConfig {
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
    /// Run the `memberOf` search after a successful bind.
    pub resolve_roles: bool,
    /// Group values that promote a subject to [`Role::admin`].
    pub admin_groups: Vec<String>,
}

impl Default for LdapClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(5),
            resolve_roles: true,
            admin_groups: vec!["cn=admins".to_string()],
        }
    }
}

/// LDAPS client: one connection per call, opened and closed here.
pub struct LdapDirectoryClient {
    config: LdapClientConfig,
    dialer: Arc<dyn LdapDialer>,
}

impl LdapDirectoryClient {
    pub fn new(config: LdapClientConfig) -> Self {
        Self::with_dialer(config, Arc::new(Ldap3Dialer))
    }

    pub fn with_dialer(config: LdapClientConfig, dialer: Arc<dyn LdapDialer>) -> Self {
        Self { config, dialer }
    }

    async fn bind_and_resolve(
        &self,
        session: &mut dyn LdapSession,
        request: &BindRequest<'_>,
    ) -> Result<BoundIdentity, DirectoryError> {
        let credential = request.credential;
        let principal = credential.principal();

        let timeout = step_timeout(self.config.operation_timeout, request.deadline, "bind")?;
        session
            .bind(&principal, credential.expose_password(), timeout)
            .await?;

        let role = if self.config.resolve_roles {
            let timeout = step_timeout(self.config.operation_timeout, request.deadline, "search")?;
            let filter = format!(
                "(&(objectClass=user)(userPrincipalName={}))",
                ldap3::ldap_escape(principal.as_str())
            );
            let groups = session
                .search_member_of(&credential.domain().base_dn(), &filter, timeout)
                .await?;
            resolve_role(&groups, &self.config.admin_groups)
        } else {
            Role::user()
        };

        Ok(BoundIdentity {
            subject: credential.username().to_string(),
            role,
        })
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectoryClient {
    async fn authenticate(&self, request: BindRequest<'_>) -> Result<BoundIdentity, DirectoryError> {
        if !request.credential.is_complete() {
            warn!(host = %request.host, "empty credentials provided; not contacting directory");
            return Err(DirectoryError::InvalidCredentials);
        }

        let url = format!("ldaps://{}", request.host.address(request.port));
        let timeout = step_timeout(self.config.connect_timeout, request.deadline, "connect")?;
        let mut session = self.dialer.dial(&url, timeout).await?;

        let outcome = self.bind_and_resolve(session.as_mut(), &request).await;
        session.unbind().await;

        match &outcome {
            Ok(identity) => info!(
                user = request.credential.username(),
                host = %request.host,
                role = %identity.role,
                "directory bind succeeded"
            ),
            Err(e) => debug!(
                user = request.credential.username(),
                host = %request.host,
                failure = e.kind(),
                "directory bind failed"
            ),
        }
        outcome
    }
}

/// `step`, shortened to whatever is left before `deadline`.
fn step_timeout(
    step: Duration,
    deadline: Instant,
    stage: &'static str,
) -> Result<Duration, DirectoryError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(DirectoryError::Timeout(stage));
    }
    Ok(step.min(remaining))
}

/// [`Role::admin`] when any membership value names an admin group, either
/// verbatim (`cn=admins`) or as the leading RDN of a full DN
/// (`CN=Admins,OU=Groups,DC=example,DC=com`). Case-insensitive.
pub fn resolve_role(member_of: &[String], admin_groups: &[String]) -> Role {
    let is_admin = member_of.iter().any(|value| {
        let value = value.trim().to_ascii_lowercase();
        admin_groups.iter().any(|group| {
            let group = group.trim().to_ascii_lowercase();
            !group.is_empty()
                && (value == group
                    || value
                        .strip_prefix(group.as_str())
                        .is_some_and(|rest| rest.starts_with(',')))
        })
    });

    if is_admin { Role::admin() } else { Role::user() }
}
