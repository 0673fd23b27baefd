//! Controller configuration
//!
//! Loaded from an optional YAML file; CLI flags and environment variables
//! override individual fields after loading.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecyclePolicy;
use crate::{
    Error, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_SYNCS, DEFAULT_MONITOR_PERIOD_SECS,
    DEFAULT_SCALE_DOWN_THRESHOLD_PERCENT, DEFAULT_SCALE_UP_THRESHOLD_PERCENT,
    DEFAULT_TIME_TO_LIVE_SECS,
};

/// Namespace whose pods count as system pods unless configured otherwise
pub const DEFAULT_RESERVED_NAMESPACE: &str = "kube-system";

/// Secret data key holding a member kubeconfig unless the cluster names one
pub const DEFAULT_KUBECONFIG_SECRET_KEY: &str = "kubeconfig";

/// Log output format
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Plain,
    /// One JSON object per line
    Json,
}

/// Settings for the reconciliation engine and its loops
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Seconds between full reconciliation passes
    pub monitor_period_secs: u64,
    /// Idle TTL used when a cluster has no override
    pub default_time_to_live_secs: i64,
    /// Scale-up threshold used when a cluster has no override
    pub default_scale_up_threshold_percent: i64,
    /// Scale-down threshold used when a cluster has no override
    pub default_scale_down_threshold_percent: i64,
    /// Namespaces whose pods count as system pods
    pub reserved_namespaces: Vec<String>,
    /// Deadline for every remote call, in seconds
    pub call_timeout_secs: u64,
    /// Clusters evaluated concurrently during a pass
    pub max_concurrent_syncs: usize,
    /// Default Secret data key for member kubeconfigs
    pub kubeconfig_secret_key: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            monitor_period_secs: DEFAULT_MONITOR_PERIOD_SECS,
            default_time_to_live_secs: DEFAULT_TIME_TO_LIVE_SECS,
            default_scale_up_threshold_percent: DEFAULT_SCALE_UP_THRESHOLD_PERCENT,
            default_scale_down_threshold_percent: DEFAULT_SCALE_DOWN_THRESHOLD_PERCENT,
            reserved_namespaces: vec![DEFAULT_RESERVED_NAMESPACE.to_string()],
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
            max_concurrent_syncs: DEFAULT_MAX_CONCURRENT_SYNCS,
            kubeconfig_secret_key: DEFAULT_KUBECONFIG_SECRET_KEY.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl ControllerConfig {
    /// Parse a configuration document; missing fields take their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid controller config: {e}")))
    }

    /// Read and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("read {}: {e}", path.display())))?;
        Self::from_yaml(&raw)
    }

    /// Reject values the controller cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.monitor_period_secs == 0 {
            return Err(Error::config("monitorPeriodSecs must be greater than zero"));
        }
        if self.call_timeout_secs == 0 {
            return Err(Error::config("callTimeoutSecs must be greater than zero"));
        }
        if self.max_concurrent_syncs == 0 {
            return Err(Error::config("maxConcurrentSyncs must be greater than zero"));
        }
        for (field, value) in [
            (
                "defaultScaleUpThresholdPercent",
                self.default_scale_up_threshold_percent,
            ),
            (
                "defaultScaleDownThresholdPercent",
                self.default_scale_down_threshold_percent,
            ),
        ] {
            if !(0..=100).contains(&value) {
                return Err(Error::config(format!(
                    "{field} must be between 0 and 100, got {value}"
                )));
            }
        }
        if self.kubeconfig_secret_key.is_empty() {
            return Err(Error::config("kubeconfigSecretKey must not be empty"));
        }
        Ok(())
    }

    /// Decision-engine defaults derived from this configuration
    pub fn policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            default_ttl_secs: self.default_time_to_live_secs,
            default_scale_up_threshold: self.default_scale_up_threshold_percent,
            default_scale_down_threshold: self.default_scale_down_threshold_percent,
        }
    }

    /// Interval between full reconciliation passes
    pub fn monitor_period(&self) -> Duration {
        Duration::from_secs(self.monitor_period_secs)
    }

    /// Deadline applied to each remote call
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}
