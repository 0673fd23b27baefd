//! Annotation keys and value parsing
//!
//! Everything the controller persists lives in these annotations on the
//! MemberCluster record. Values are plain strings; parsing is lenient and
//! falls back to a default whenever a value is missing or malformed.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Lifecycle state of the cluster
pub const LIFECYCLE_STATE: &str = "corral.dev/lifecycle-state";
/// Allocatable pod slots across all nodes
pub const CAPACITY_ALLOCATABLE_PODS: &str = "corral.dev/capacity-allocatable-pods";
/// Total pod capacity across all nodes
pub const CAPACITY_TOTAL_PODS: &str = "corral.dev/capacity-total-pods";
/// Pending or Running pods in all namespaces
pub const CAPACITY_USED_PODS: &str = "corral.dev/capacity-used-pods";
/// Pods in reserved system namespaces
pub const CAPACITY_SYSTEM_PODS: &str = "corral.dev/capacity-system-pods";
/// When the cluster was first observed with no user pods
pub const SHUTDOWN_START_TIME: &str = "corral.dev/shutdown-start-time";
/// Idle seconds before the cluster is marked for shutdown
pub const TIME_TO_LIVE_SECONDS: &str = "corral.dev/time-to-live-seconds";
/// Enables threshold-based autoscale marking
pub const AUTOSCALE_ENABLED: &str = "corral.dev/autoscale-enabled";
/// Utilisation percent at or above which the cluster scales up
pub const SCALE_UP_THRESHOLD_PERCENT: &str = "corral.dev/scale-up-threshold-percent";
/// Utilisation percent at or below which the cluster scales down
pub const SCALE_DOWN_THRESHOLD_PERCENT: &str = "corral.dev/scale-down-threshold-percent";

/// The four capacity annotations, always written together
pub const CAPACITY_KEYS: [&str; 4] = [
    CAPACITY_ALLOCATABLE_PODS,
    CAPACITY_TOTAL_PODS,
    CAPACITY_USED_PODS,
    CAPACITY_SYSTEM_PODS,
];

/// Layout of timestamps written by older controller releases (`date` style)
const LEGACY_TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S UTC %Y";

/// Integer value of an annotation, or `default` if missing, empty, or malformed
pub fn integer_value(annotations: &BTreeMap<String, String>, key: &str, default: i64) -> i64 {
    annotations
        .get(key)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Boolean value of an annotation, `None` if missing or malformed
///
/// Accepts `1`, `t`, `T`, `true`, `TRUE`, `True` and their false counterparts.
pub fn bool_value(annotations: &BTreeMap<String, String>, key: &str) -> Option<bool> {
    match annotations.get(key)?.as_str() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Format a timestamp for the shutdown-start-time annotation
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Parse a shutdown-start-time value (RFC 3339, or the legacy `date` layout)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Returns true if all four capacity annotations are present
pub fn has_capacity_data(annotations: &BTreeMap<String, String>) -> bool {
    CAPACITY_KEYS.iter().all(|k| annotations.contains_key(*k))
}
