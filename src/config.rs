//! Node configuration.
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::consts::DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS;
use crate::consts::DEFAULT_FIX_FINGER_INTERVAL_MS;
use crate::consts::DEFAULT_MAX_IDLE_MS;
use crate::consts::DEFAULT_RPC_TIMEOUT_MS;
use crate::consts::DEFAULT_STABILIZE_INTERVAL_MS;
use crate::error::Error;
use crate::error::Result;

/// Everything a ring node is parameterized by. Loadable from YAML via
/// [Config::from_file]; all durations are milliseconds there.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit identity string hashed into the ring id. When unset,
    /// the bind address is hashed instead.
    pub id: Option<String>,

    /// Network location peers dial to reach this node.
    pub addr: String,

    /// Period of the stabilization cycle.
    pub stabilize_interval_ms: u64,

    /// Period of the finger-fixing cycle; one finger per tick.
    pub fix_finger_interval_ms: u64,

    /// Period of the predecessor liveness probe.
    pub check_predecessor_interval_ms: u64,

    /// Upper bound on any single remote call.
    pub rpc_timeout_ms: u64,

    /// Idle duration after which a pooling transport evicts a cached
    /// per-address connection.
    pub max_idle_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: None,
            addr: String::new(),
            stabilize_interval_ms: DEFAULT_STABILIZE_INTERVAL_MS,
            fix_finger_interval_ms: DEFAULT_FIX_FINGER_INTERVAL_MS,
            check_predecessor_interval_ms: DEFAULT_CHECK_PREDECESSOR_INTERVAL_MS,
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            max_idle_ms: DEFAULT_MAX_IDLE_MS,
        }
    }
}

impl Config {
    /// Default configuration bound to `addr`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Use an explicit identity instead of hashing the address.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Read a YAML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&raw).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.addr.is_empty() {
            return Err(Error::InvalidConfig("addr must not be empty".into()));
        }
        for (name, value) in [
            ("stabilize_interval_ms", self.stabilize_interval_ms),
            ("fix_finger_interval_ms", self.fix_finger_interval_ms),
            (
                "check_predecessor_interval_ms",
                self.check_predecessor_interval_ms,
            ),
            ("rpc_timeout_ms", self.rpc_timeout_ms),
            ("max_idle_ms", self.max_idle_ms),
        ] {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    pub fn stabilize_interval(&self) -> Duration {
        Duration::from_millis(self.stabilize_interval_ms)
    }

    pub fn fix_finger_interval(&self) -> Duration {
        Duration::from_millis(self.fix_finger_interval_ms)
    }

    pub fn check_predecessor_interval(&self) -> Duration {
        Duration::from_millis(self.check_predecessor_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn max_idle(&self) -> Duration {
        Duration::from_millis(self.max_idle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates_once_addr_is_set() {
        assert!(Config::default().validate().is_err());
        let config = Config::new("127.0.0.1:9000");
        config.validate().unwrap();
        assert_eq!(config.stabilize_interval(), Duration::from_secs(1));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut config = Config::new("127.0.0.1:9000");
        config.fix_finger_interval_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn from_file_reads_yaml_and_fills_defaults() {
        let path = std::env::temp_dir().join("ringkv-config-test.yaml");
        std::fs::write(
            &path,
            "addr: \"127.0.0.1:9000\"\nid: \"alpha\"\nstabilize_interval_ms: 500\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.id.as_deref(), Some("alpha"));
        assert_eq!(config.stabilize_interval_ms, 500);
        // Unmentioned fields keep their defaults.
        assert_eq!(config.rpc_timeout_ms, DEFAULT_RPC_TIMEOUT_MS);
        config.validate().unwrap();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Config::from_file("/definitely/not/here.yaml"),
            Err(Error::IOError(_))
        ));
    }
}
