//! Candidate host discovery.
//!
//! One [`DirectoryResolver`] is chosen at startup (see
//! [`resolver_for_platform`]) and used for every request. Each call runs
//! exactly one discovery; results are never cached.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use authgate_core::{Domain, HostCandidate};

use crate::command::CommandRunner;
use crate::error::DiscoveryError;
use crate::platform::Platform;

/// Produces the candidate directory hosts for a realm.
#[async_trait]
pub trait DirectoryResolver: Send + Sync {
    /// Never returns an empty `Vec`: no hosts is `DiscoveryError::NoHosts`.
    async fn resolve_hosts(&self, domain: &Domain) -> Result<Vec<HostCandidate>, DiscoveryError>;

    /// Short name used in logs.
    fn strategy(&self) -> &'static str;
}

/// Pick the discovery strategy for `platform`.
pub fn resolver_for_platform(
    platform: &Platform,
    runner: Arc<dyn CommandRunner>,
) -> Box<dyn DirectoryResolver> {
    match platform {
        Platform::Linux | Platform::MacOs => Box::new(SrvHostResolver::new(runner)),
        Platform::Windows => Box::new(NslookupResolver::new(runner)),
        Platform::Other(os) => Box::new(UnsupportedPlatformResolver::new(os.clone())),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unix: `host -t SRV`
// ─────────────────────────────────────────────────────────────────────────────

/// SRV lookup through the `host` utility (Linux, macOS).
pub struct SrvHostResolver {
    runner: Arc<dyn CommandRunner>,
}

impl SrvHostResolver {
    pub const PROGRAM: &'static str = "host";

    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl DirectoryResolver for SrvHostResolver {
    async fn resolve_hosts(&self, domain: &Domain) -> Result<Vec<HostCandidate>, DiscoveryError> {
        let args = vec!["-t".to_string(), "SRV".to_string(), domain.ldap_srv_name()];
        discover(
            self.runner.as_ref(),
            Self::PROGRAM,
            &args,
            domain,
            parse_host_srv_output,
        )
        .await
    }

    fn strategy(&self) -> &'static str {
        "host-srv"
    }
}

/// Target host of every `... has SRV record <prio> <weight> <port> <target>`
/// line; anything else (`not found`, `;;` diagnostics) is ignored.
pub fn parse_host_srv_output(output: &str) -> Vec<HostCandidate> {
    output
        .lines()
        .filter(|line| line.contains("has SRV record"))
        .filter_map(|line| line.split_whitespace().last())
        .filter_map(HostCandidate::parse)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Windows: `nslookup -type=SRV`
// ─────────────────────────────────────────────────────────────────────────────

/// SRV lookup through `nslookup` (Windows).
pub struct NslookupResolver {
    runner: Arc<dyn CommandRunner>,
}

impl NslookupResolver {
    pub const PROGRAM: &'static str = "nslookup";

    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl DirectoryResolver for NslookupResolver {
    async fn resolve_hosts(&self, domain: &Domain) -> Result<Vec<HostCandidate>, DiscoveryError> {
        let args = vec!["-type=SRV".to_string(), domain.ldap_srv_name()];
        discover(
            self.runner.as_ref(),
            Self::PROGRAM,
            &args,
            domain,
            parse_nslookup_srv_output,
        )
        .await
    }

    fn strategy(&self) -> &'static str {
        "nslookup-srv"
    }
}

/// Host of every `svr hostname = <target>` line.
pub fn parse_nslookup_srv_output(output: &str) -> Vec<HostCandidate> {
    output
        .lines()
        .filter(|line| line.contains("svr hostname"))
        .filter_map(|line| line.split_whitespace().nth(3))
        .filter_map(HostCandidate::parse)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Fallbacks
// ─────────────────────────────────────────────────────────────────────────────

/// Always fails; selected on platforms without a discovery strategy.
pub struct UnsupportedPlatformResolver {
    os: String,
}

impl UnsupportedPlatformResolver {
    pub fn new(os: impl Into<String>) -> Self {
        Self { os: os.into() }
    }
}

#[async_trait]
impl DirectoryResolver for UnsupportedPlatformResolver {
    async fn resolve_hosts(&self, _domain: &Domain) -> Result<Vec<HostCandidate>, DiscoveryError> {
        Err(DiscoveryError::UnsupportedPlatform(self.os.clone()))
    }

    fn strategy(&self) -> &'static str {
        "unsupported"
    }
}

/// Fixed domain → hosts mapping from configuration, used instead of
/// discovery when an operator pins the directory hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<Domain, Vec<HostCandidate>>,
}

impl StaticResolver {
    pub fn new(hosts: HashMap<Domain, Vec<HostCandidate>>) -> Self {
        Self { hosts }
    }

    pub fn with_domain(mut self, domain: Domain, hosts: Vec<HostCandidate>) -> Self {
        self.hosts.insert(domain, hosts);
        self
    }
}

#[async_trait]
impl DirectoryResolver for StaticResolver {
    async fn resolve_hosts(&self, domain: &Domain) -> Result<Vec<HostCandidate>, DiscoveryError> {
        match self.hosts.get(domain) {
            Some(hosts) if !hosts.is_empty() => Ok(hosts.clone()),
            _ => Err(DiscoveryError::NoHosts(domain.to_string())),
        }
    }

    fn strategy(&self) -> &'static str {
        "static"
    }
}

async fn discover(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
    domain: &Domain,
    parse: fn(&str) -> Vec<HostCandidate>,
) -> Result<Vec<HostCandidate>, DiscoveryError> {
    let output = runner.run(program, args).await.map_err(|source| {
        if source.kind() == io::ErrorKind::TimedOut {
            DiscoveryError::CommandTimeout {
                program: program.to_string(),
            }
        } else {
            DiscoveryError::CommandSpawn {
                program: program.to_string(),
                source,
            }
        }
    })?;

    if !output.success {
        return Err(DiscoveryError::CommandFailed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let hosts = parse(&String::from_utf8_lossy(&output.stdout));
    if hosts.is_empty() {
        return Err(DiscoveryError::NoHosts(domain.to_string()));
    }

    debug!(%domain, program, count = hosts.len(), "discovered directory hosts");
    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::command::CommandOutput;

    const HOST_OUTPUT: &str = "\
_ldap._tcp.dc._msdcs.example.com has SRV record 0 100 389 dc1.example.com.
_ldap._tcp.dc._msdcs.example.com has SRV record 0 100 389 dc2.example.com.
";

    const NSLOOKUP_OUTPUT: &str = "\
Server:  resolver.example.com
Address:  10.0.0.1

_ldap._tcp.dc._msdcs.example.com\tSRV service location:
          priority       = 0
          weight         = 100
          port           = 389
          svr hostname   = dc1.example.com
_ldap._tcp.dc._msdcs.example.com\tSRV service location:
          priority       = 0
          weight         = 100
          port           = 389
          svr hostname   = dc2.example.com
";

    /// Scripted runner that records every invocation.
    struct FakeRunner {
        result: Mutex<Option<io::Result<CommandOutput>>>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeRunner {
        fn new(result: io::Result<CommandOutput>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(result)),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn succeeding(stdout: &str) -> Arc<Self> {
            Self::new(Ok(CommandOutput {
                success: true,
                status: "exit status: 0".to_string(),
                stdout: stdout.as_bytes().to_vec(),
                stderr: Vec::new(),
            }))
        }

        fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));
            self.result
                .lock()
                .unwrap()
                .take()
                .expect("runner invoked more than once")
        }
    }

    fn domain() -> Domain {
        Domain::parse("example.com").unwrap()
    }

    fn names(hosts: &[HostCandidate]) -> Vec<&str> {
        hosts.iter().map(HostCandidate::as_str).collect()
    }

    #[test]
    fn parses_host_output() {
        let hosts = parse_host_srv_output(HOST_OUTPUT);
        assert_eq!(names(&hosts), vec!["dc1.example.com", "dc2.example.com"]);
    }

    #[test]
    fn host_output_without_records_parses_to_nothing() {
        let out = "Host _ldap._tcp.dc._msdcs.example.com not found: 3(NXDOMAIN)\n";
        assert!(parse_host_srv_output(out).is_empty());
    }

    #[test]
    fn parses_nslookup_output() {
        let hosts = parse_nslookup_srv_output(NSLOOKUP_OUTPUT);
        assert_eq!(names(&hosts), vec!["dc1.example.com", "dc2.example.com"]);
    }

    #[tokio::test]
    async fn srv_resolver_runs_host_once_without_a_shell() {
        let runner = FakeRunner::succeeding(HOST_OUTPUT);
        let resolver = SrvHostResolver::new(runner.clone());

        let hosts = resolver.resolve_hosts(&domain()).await.unwrap();
        assert_eq!(hosts.len(), 2);

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "host");
        assert_eq!(
            calls[0].1,
            vec!["-t", "SRV", "_ldap._tcp.dc._msdcs.example.com"]
        );
    }

    #[tokio::test]
    async fn nslookup_resolver_passes_srv_type() {
        let runner = FakeRunner::succeeding(NSLOOKUP_OUTPUT);
        let resolver = NslookupResolver::new(runner.clone());

        let hosts = resolver.resolve_hosts(&domain()).await.unwrap();
        assert_eq!(names(&hosts), vec!["dc1.example.com", "dc2.example.com"]);
        assert_eq!(runner.calls()[0].0, "nslookup");
        assert_eq!(runner.calls()[0].1[0], "-type=SRV");
    }

    #[tokio::test]
    async fn non_zero_exit_is_command_failed() {
        let runner = FakeRunner::new(Ok(CommandOutput {
            success: false,
            status: "exit status: 1".to_string(),
            stdout: Vec::new(),
            stderr: b"connection timed out; no servers could be reached\n".to_vec(),
        }));
        let err = SrvHostResolver::new(runner)
            .resolve_hosts(&domain())
            .await
            .unwrap_err();

        match err {
            DiscoveryError::CommandFailed { program, stderr, .. } => {
                assert_eq!(program, "host");
                assert!(stderr.contains("no servers"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparsable_output_is_no_hosts() {
        let runner = FakeRunner::succeeding(";; garbage\n");
        let err = SrvHostResolver::new(runner)
            .resolve_hosts(&domain())
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::NoHosts(d) if d == "example.com"));
    }

    #[tokio::test]
    async fn runner_timeout_and_spawn_errors_are_distinguished() {
        let timed_out = FakeRunner::new(Err(io::Error::new(io::ErrorKind::TimedOut, "slow")));
        let err = SrvHostResolver::new(timed_out)
            .resolve_hosts(&domain())
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::CommandTimeout { .. }));

        let missing = FakeRunner::new(Err(io::Error::new(io::ErrorKind::NotFound, "no host")));
        let err = SrvHostResolver::new(missing)
            .resolve_hosts(&domain())
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::CommandSpawn { .. }));
    }

    #[tokio::test]
    async fn unsupported_platform_never_runs_a_command() {
        let runner = FakeRunner::succeeding(HOST_OUTPUT);
        let resolver =
            resolver_for_platform(&Platform::Other("plan9".to_string()), runner.clone());

        assert_eq!(resolver.strategy(), "unsupported");
        let err = resolver.resolve_hosts(&domain()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::UnsupportedPlatform(ref os) if os == "plan9"));
        assert!(err.is_configuration());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn strategy_follows_platform() {
        let runner = FakeRunner::succeeding("");
        assert_eq!(
            resolver_for_platform(&Platform::Linux, runner.clone()).strategy(),
            "host-srv"
        );
        assert_eq!(
            resolver_for_platform(&Platform::MacOs, runner.clone()).strategy(),
            "host-srv"
        );
        assert_eq!(
            resolver_for_platform(&Platform::Windows, runner).strategy(),
            "nslookup-srv"
        );
    }

    #[tokio::test]
    async fn static_resolver_returns_configured_hosts() {
        let resolver = StaticResolver::default().with_domain(
            domain(),
            vec![HostCandidate::parse("ldap.example.com").unwrap()],
        );

        let hosts = resolver.resolve_hosts(&domain()).await.unwrap();
        assert_eq!(names(&hosts), vec!["ldap.example.com"]);

        let other = Domain::parse("other.org").unwrap();
        assert!(matches!(
            resolver.resolve_hosts(&other).await,
            Err(DiscoveryError::NoHosts(_))
        ));
    }
}
