//! The `/auth` pipeline: resolve, select, verify, issue.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::info;

use authgate_auth::{Hs256TokenIssuer, TokenIssuer, TokenIssuerConfig};
use authgate_core::Credential;
use authgate_directory::{
    BindRequest, BoundIdentity, DirectoryClient, DirectoryError, DirectoryResolver, DiscoveryError,
    HostLocator, HostSelector, LdapClientConfig, LdapDirectoryClient, Platform, StaticResolver,
    TokioCommandRunner, resolver_for_platform,
};
use secrecy::ExposeSecret;

use crate::app::errors::AuthError;
use crate::config::AuthServiceConfig;

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub ldap_port: u16,
    /// Budget for one request, measured from entry into the pipeline.
    pub request_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            ldap_port: 636,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct AuthOutcome {
    pub identity: BoundIdentity,
    pub token: String,
}

/// Shared, read-only per process. Every stage is a trait object so tests can
/// stub any of them.
pub struct AuthPipeline {
    locator: HostLocator,
    directory: Arc<dyn DirectoryClient>,
    issuer: Arc<dyn TokenIssuer>,
    settings: PipelineSettings,
}

impl AuthPipeline {
    pub fn new(
        locator: HostLocator,
        directory: Arc<dyn DirectoryClient>,
        issuer: Arc<dyn TokenIssuer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            locator,
            directory,
            issuer,
            settings,
        }
    }

    /// Production wiring from configuration.
    pub fn from_config(config: &AuthServiceConfig) -> Self {
        let resolver: Box<dyn DirectoryResolver> = match &config.static_hosts {
            Some(hosts) => Box::new(StaticResolver::new(hosts.clone())),
            None => resolver_for_platform(
                &Platform::current(),
                Arc::new(TokioCommandRunner::new(config.discovery_timeout)),
            ),
        };
        let locator = HostLocator::new(resolver, HostSelector::from_os_rng());

        let directory = LdapDirectoryClient::new(LdapClientConfig {
            connect_timeout: config.ldap_connect_timeout,
            operation_timeout: config.ldap_operation_timeout,
            resolve_roles: config.resolve_roles,
            admin_groups: config.admin_groups.clone(),
        });

        let mut token_config = TokenIssuerConfig::new(
            config.jwt_secret.expose_secret().as_bytes(),
            config.token_expiry,
        );
        token_config.issuer = config.token_issuer.clone();
        token_config.audience = config.token_audience.clone();

        info!(
            strategy = locator.strategy(),
            ldap_port = config.ldap_port,
            resolve_roles = config.resolve_roles,
            "auth pipeline configured"
        );

        Self::new(
            locator,
            Arc::new(directory),
            Arc::new(Hs256TokenIssuer::new(token_config)),
            PipelineSettings {
                ldap_port: config.ldap_port,
                request_timeout: config.request_timeout,
            },
        )
    }

    pub async fn authenticate(&self, credential: &Credential) -> Result<AuthOutcome, AuthError> {
        let deadline = deadline_after(self.settings.request_timeout);

        let host = self
            .locator
            .locate(credential.domain())
            .await
            .map_err(lookup_error)?;

        let identity = self
            .directory
            .authenticate(BindRequest {
                host: &host,
                port: self.settings.ldap_port,
                credential,
                deadline,
            })
            .await?;

        let token = self.issuer.issue_token(&identity.subject)?;

        info!(host = %host, role = %identity.role, "authentication succeeded");
        Ok(AuthOutcome { identity, token })
    }
}

/// Now plus `timeout`, saturating at a far-future instant instead of
/// overflowing.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// About 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Deployment problems stay visible as such; any other discovery failure is
/// just another reason the credential could not be verified.
fn lookup_error(err: DiscoveryError) -> AuthError {
    if err.is_configuration() {
        AuthError::Discovery(err)
    } else {
        AuthError::Directory(DirectoryError::LookupFailure(err))
    }
}
