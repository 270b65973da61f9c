//! Discovery settings and node identity, with environment overrides.

use std::env;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 4_000;
const DEFAULT_PROBE_INTERVAL_MS: u64 = 100;

/// Timing of a [`BusDetector`](crate::BusDetector) discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Give up after this long without a `Hello`.
    pub timeout: Duration,
    /// Resend the probe this often.
    pub probe_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            probe_interval: Duration::from_millis(DEFAULT_PROBE_INTERVAL_MS),
        }
    }
}

impl DiscoveryConfig {
    /// Settings with explicit values, ignoring the environment.
    #[must_use]
    pub const fn new(timeout: Duration, probe_interval: Duration) -> Self {
        Self {
            timeout,
            probe_interval,
        }
    }

    /// Reads overrides from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `DMS_DISCOVERY_TIMEOUT_MS`: overall deadline (default: 4000)
    /// - `DMS_DISCOVERY_PROBE_INTERVAL_MS`: probe period (default: 100)
    ///
    /// Missing or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            timeout: Duration::from_millis(millis("DMS_DISCOVERY_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)),
            probe_interval: Duration::from_millis(millis(
                "DMS_DISCOVERY_PROBE_INTERVAL_MS",
                DEFAULT_PROBE_INTERVAL_MS,
            )),
        }
    }

    /// Deadline in whole milliseconds, as reported by timeout errors.
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Who this node is, as announced in `Hello` replies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    /// Host name announced to discovery probes.
    pub host_name: String,
    /// Program name announced to discovery probes.
    pub program: String,
    /// Process id announced to discovery probes.
    pub pid: u32,
}

impl NodeIdentity {
    /// An identity with explicit values.
    #[must_use]
    pub fn new(host_name: impl Into<String>, program: impl Into<String>, pid: u32) -> Self {
        Self {
            host_name: host_name.into(),
            program: program.into(),
            pid,
        }
    }

    /// Identity of the current process running `program`.
    ///
    /// The host name comes from `DMS_HOST_NAME`, then `HOSTNAME`, then
    /// falls back to `localhost`.
    #[must_use]
    pub fn for_program(program: impl Into<String>) -> Self {
        Self::new(
            Self::host_name_from(|key| env::var(key).ok()),
            program,
            std::process::id(),
        )
    }

    fn host_name_from(lookup: impl Fn(&str) -> Option<String>) -> String {
        ["DMS_HOST_NAME", "HOSTNAME"]
            .into_iter()
            .filter_map(|key| lookup(key))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(4));
        assert_eq!(config.probe_interval, Duration::from_millis(100));
        assert_eq!(config.timeout_ms(), 4000);
    }

    #[test]
    fn test_overrides() {
        let config = DiscoveryConfig::from_lookup(lookup(&[
            ("DMS_DISCOVERY_TIMEOUT_MS", "250"),
            ("DMS_DISCOVERY_PROBE_INTERVAL_MS", " 10 "),
        ]));
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.probe_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = DiscoveryConfig::from_lookup(lookup(&[("DMS_DISCOVERY_TIMEOUT_MS", "soon")]));
        assert_eq!(config, DiscoveryConfig::default());
    }

    #[test]
    fn test_host_name_resolution() {
        assert_eq!(
            NodeIdentity::host_name_from(lookup(&[("DMS_HOST_NAME", "magi"), ("HOSTNAME", "x")])),
            "magi"
        );
        assert_eq!(
            NodeIdentity::host_name_from(lookup(&[("DMS_HOST_NAME", " "), ("HOSTNAME", "nina")])),
            "nina"
        );
        assert_eq!(NodeIdentity::host_name_from(lookup(&[])), "localhost");
    }

    #[test]
    fn test_for_program() {
        let identity = NodeIdentity::for_program("data-processor");
        assert_eq!(identity.program, "data-processor");
        assert_eq!(identity.pid, std::process::id());
        assert!(!identity.host_name.is_empty());
    }
}
