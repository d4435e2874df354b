//! `authgate-directory`: locating a directory host and verifying credentials
//! against it.
//!
//! - `resolver`: platform-specific discovery of candidate hosts for a realm
//! - `selector`: picking one candidate (uniform random, per-instance RNG)
//! - `client`: LDAP bind + optional group lookup over TLS
//!
//! Nothing here caches hosts, pools connections, or retries: every
//! authentication attempt discovers once, tries one host, binds once.

pub mod client;
pub mod command;
pub mod error;
pub mod ldap;
pub mod platform;
pub mod resolver;
pub mod selector;

pub use client::{
    BindRequest, BoundIdentity, DirectoryClient, LdapClientConfig, LdapDialer, LdapDirectoryClient,
    LdapSession,
};
pub use command::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use error::{DirectoryError, DiscoveryError};
pub use ldap::Ldap3Dialer;
pub use platform::Platform;
pub use resolver::{
    resolver_for_platform, DirectoryResolver, NslookupResolver, SrvHostResolver, StaticResolver,
    UnsupportedPlatformResolver,
};
pub use selector::{HostLocator, HostSelector};
