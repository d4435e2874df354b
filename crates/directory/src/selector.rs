//! Host selection.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use authgate_core::{Domain, HostCandidate};

use crate::error::DiscoveryError;
use crate::resolver::DirectoryResolver;

/// Uniform random choice among candidate hosts.
///
/// Each selector owns its RNG; nothing is shared process-wide, and no memory
/// of earlier picks is kept. The lock only guards drawing one index.
#[derive(Debug)]
pub struct HostSelector {
    rng: Mutex<StdRng>,
}

impl HostSelector {
    pub fn from_os_rng() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic selector (tests, reproducible runs).
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// `None` for an empty slice; callers must treat that as a failure.
    pub fn select(&self, candidates: &[HostCandidate]) -> Option<HostCandidate> {
        if candidates.is_empty() {
            return None;
        }
        let index = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..candidates.len());
        candidates.get(index).cloned()
    }
}

impl Default for HostSelector {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

/// Resolver + selector: domain in, one host out.
pub struct HostLocator {
    resolver: Box<dyn DirectoryResolver>,
    selector: HostSelector,
}

impl HostLocator {
    pub fn new(resolver: Box<dyn DirectoryResolver>, selector: HostSelector) -> Self {
        Self { resolver, selector }
    }

    pub fn strategy(&self) -> &'static str {
        self.resolver.strategy()
    }

    pub async fn locate(&self, domain: &Domain) -> Result<HostCandidate, DiscoveryError> {
        let candidates = self.resolver.resolve_hosts(domain).await?;
        let host = self
            .selector
            .select(&candidates)
            .ok_or_else(|| DiscoveryError::NoHosts(domain.to_string()))?;

        debug!(
            %domain,
            %host,
            candidates = candidates.len(),
            strategy = self.resolver.strategy(),
            "selected directory host"
        );
        Ok(host)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use crate::resolver::StaticResolver;

    fn hosts(names: &[&str]) -> Vec<HostCandidate> {
        names.iter().filter_map(|n| HostCandidate::parse(n)).collect()
    }

    #[test]
    fn empty_candidates_select_nothing() {
        assert!(HostSelector::seeded(1).select(&[]).is_none());
    }

    #[test]
    fn single_candidate_is_always_chosen() {
        let only = hosts(&["dc1.example.com"]);
        let selector = HostSelector::seeded(7);
        for _ in 0..20 {
            assert_eq!(selector.select(&only).as_ref(), only.first());
        }
    }

    #[test]
    fn every_host_is_eventually_selected() {
        let all = hosts(&["h1", "h2", "h3", "h4", "h5"]);
        let selector = HostSelector::from_os_rng();

        let mut seen: HashMap<HostCandidate, usize> = HashMap::new();
        for _ in 0..1000 {
            let picked = selector.select(&all).unwrap();
            *seen.entry(picked).or_default() += 1;
        }

        for h in &all {
            assert!(seen.get(h).copied().unwrap_or(0) > 0, "{h} never selected");
        }
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let all = hosts(&["a", "b", "c", "d"]);
        let left = HostSelector::seeded(42);
        let right = HostSelector::seeded(42);
        for _ in 0..50 {
            assert_eq!(left.select(&all), right.select(&all));
        }
    }

    proptest! {
        #[test]
        fn selection_is_a_member(names in prop::collection::vec("[a-z]{1,8}", 1..16), seed in any::<u64>()) {
            let candidates: Vec<HostCandidate> =
                names.iter().filter_map(|n| HostCandidate::parse(n)).collect();
            let picked = HostSelector::seeded(seed).select(&candidates);
            prop_assert!(picked.is_some());
            prop_assert!(candidates.contains(&picked.unwrap()));
        }
    }

    #[tokio::test]
    async fn locator_returns_one_resolved_host() {
        let domain = Domain::parse("example.com").unwrap();
        let resolver = StaticResolver::default()
            .with_domain(domain.clone(), hosts(&["dc1.example.com", "dc2.example.com"]));
        let locator = HostLocator::new(Box::new(resolver), HostSelector::seeded(3));

        let host = locator.locate(&domain).await.unwrap();
        assert!(["dc1.example.com", "dc2.example.com"].contains(&host.as_str()));
        assert_eq!(locator.strategy(), "static");
    }

    #[tokio::test]
    async fn locator_propagates_discovery_failure() {
        let locator = HostLocator::new(Box::new(StaticResolver::default()), HostSelector::seeded(3));
        let err = locator
            .locate(&Domain::parse("example.com").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::NoHosts(_)));
    }
}
