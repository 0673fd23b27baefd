//! Lifecycle decision engine
//!
//! A pure function of a cluster's annotations, a fresh metrics snapshot, the
//! policy defaults, and the current time. It rewrites the annotation map in
//! place and reports which rules fired. Four rules run on every evaluation,
//! in order, and more than one may fire:
//!
//! 1. **Capacity** - record the snapshot if any capacity annotation is missing
//!    or stale
//! 2. **Idle timer** - start the shutdown timer when only system pods remain on
//!    a Ready cluster; cancel it when user pods come back
//! 3. **TTL expiry** - mark the cluster `PendingShutdown` once the timer has run
//!    for at least the time-to-live
//! 4. **Threshold scaling** - on a Ready cluster with autoscale enabled, mark
//!    `PendingScaleUp` or `PendingScaleDown` from user-pod utilisation

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::annotations::{
    bool_value, format_timestamp, has_capacity_data, integer_value, parse_timestamp,
    AUTOSCALE_ENABLED, CAPACITY_ALLOCATABLE_PODS, CAPACITY_SYSTEM_PODS, CAPACITY_TOTAL_PODS,
    CAPACITY_USED_PODS, SCALE_DOWN_THRESHOLD_PERCENT, SCALE_UP_THRESHOLD_PERCENT,
    SHUTDOWN_START_TIME, TIME_TO_LIVE_SECONDS,
};
use super::state::{set_state, LifecycleState, StateAnnotation};

/// Pod capacity sampled from a member cluster in one pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Allocatable pod slots across all nodes
    pub allocatable_pods: u64,
    /// Total pod capacity across all nodes
    pub total_pods: u64,
    /// Pending or Running pods in all namespaces
    pub used_pods: u64,
    /// Pods in reserved system namespaces
    pub used_system_pods: u64,
}

impl MetricsSnapshot {
    fn values(&self) -> [(&'static str, u64); 4] {
        [
            (CAPACITY_ALLOCATABLE_PODS, self.allocatable_pods),
            (CAPACITY_TOTAL_PODS, self.total_pods),
            (CAPACITY_USED_PODS, self.used_pods),
            (CAPACITY_SYSTEM_PODS, self.used_system_pods),
        ]
    }
}

/// Defaults used when a cluster does not override them via annotations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Idle seconds before shutdown
    pub default_ttl_secs: i64,
    /// Scale-up threshold percent
    pub default_scale_up_threshold: i64,
    /// Scale-down threshold percent
    pub default_scale_down_threshold: i64,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            default_ttl_secs: crate::DEFAULT_TIME_TO_LIVE_SECS,
            default_scale_up_threshold: crate::DEFAULT_SCALE_UP_THRESHOLD_PERCENT,
            default_scale_down_threshold: crate::DEFAULT_SCALE_DOWN_THRESHOLD_PERCENT,
        }
    }
}

/// A rule that fired during an evaluation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Capacity annotations were written from the snapshot
    RecordCapacity,
    /// The idle shutdown timer was started
    StartShutdownTimer,
    /// The idle shutdown timer was cancelled because user pods appeared
    ClearShutdownTimer,
    /// The idle TTL expired and the cluster was marked for shutdown
    MarkPendingShutdown {
        /// TTL that expired
        ttl_secs: i64,
    },
    /// Utilisation reached the scale-up threshold
    MarkScaleUp {
        /// Utilisation that triggered the mark
        used_percent: i64,
        /// Threshold in effect
        threshold: i64,
    },
    /// Utilisation fell to the scale-down threshold
    MarkScaleDown {
        /// Utilisation that triggered the mark
        used_percent: i64,
        /// Threshold in effect
        threshold: i64,
    },
}

/// Outcome of one evaluation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decision {
    /// Rules that fired, in evaluation order
    pub actions: Vec<LifecycleAction>,
}

impl Decision {
    /// Returns true if the annotations were modified
    pub fn changed(&self) -> bool {
        !self.actions.is_empty()
    }
}

/// Run all four rules against `annotations`, mutating them in place
pub fn evaluate(
    annotations: &mut BTreeMap<String, String>,
    snapshot: &MetricsSnapshot,
    policy: &LifecyclePolicy,
    now: DateTime<Utc>,
) -> Decision {
    let mut decision = Decision::default();

    if record_capacity(annotations, snapshot) {
        decision.actions.push(LifecycleAction::RecordCapacity);
    }
    if let Some(action) = update_idle_timer(annotations, now) {
        decision.actions.push(action);
    }
    if let Some(action) = expire_ttl(annotations, policy, now) {
        decision.actions.push(action);
    }
    if let Some(action) = mark_for_scaling(annotations, policy) {
        decision.actions.push(action);
    }

    decision
}

fn record_capacity(annotations: &mut BTreeMap<String, String>, snapshot: &MetricsSnapshot) -> bool {
    let stale = !has_capacity_data(annotations)
        || snapshot
            .values()
            .iter()
            .any(|(key, value)| integer_value(annotations, key, 0) != *value as i64);

    if stale {
        for (key, value) in snapshot.values() {
            annotations.insert(key.to_string(), value.to_string());
        }
    }
    stale
}

fn update_idle_timer(
    annotations: &mut BTreeMap<String, String>,
    now: DateTime<Utc>,
) -> Option<LifecycleAction> {
    let used = integer_value(annotations, CAPACITY_USED_PODS, 0);
    let system = integer_value(annotations, CAPACITY_SYSTEM_PODS, 0);
    let timer_running = annotations.contains_key(SHUTDOWN_START_TIME);

    if used == system {
        let ready = StateAnnotation::read(annotations).is(LifecycleState::Ready);
        if ready && !timer_running {
            annotations.insert(SHUTDOWN_START_TIME.to_string(), format_timestamp(now));
            return Some(LifecycleAction::StartShutdownTimer);
        }
    } else if timer_running {
        annotations.remove(SHUTDOWN_START_TIME);
        return Some(LifecycleAction::ClearShutdownTimer);
    }
    None
}

fn expire_ttl(
    annotations: &mut BTreeMap<String, String>,
    policy: &LifecyclePolicy,
    now: DateTime<Utc>,
) -> Option<LifecycleAction> {
    let started = annotations
        .get(SHUTDOWN_START_TIME)
        .and_then(|raw| parse_timestamp(raw))?;
    let ttl_secs = integer_value(annotations, TIME_TO_LIVE_SECONDS, policy.default_ttl_secs);

    if ttl_secs > 0 && (now - started).num_seconds() >= ttl_secs {
        set_state(annotations, LifecycleState::PendingShutdown);
        annotations.remove(SHUTDOWN_START_TIME);
        return Some(LifecycleAction::MarkPendingShutdown { ttl_secs });
    }
    None
}

fn mark_for_scaling(
    annotations: &mut BTreeMap<String, String>,
    policy: &LifecyclePolicy,
) -> Option<LifecycleAction> {
    if bool_value(annotations, AUTOSCALE_ENABLED) != Some(true) {
        return None;
    }
    if !StateAnnotation::read(annotations).is(LifecycleState::Ready) {
        return None;
    }

    let used = integer_value(annotations, CAPACITY_USED_PODS, 0);
    let system = integer_value(annotations, CAPACITY_SYSTEM_PODS, 0);
    let capacity = integer_value(annotations, CAPACITY_TOTAL_PODS, 0);
    let up = integer_value(
        annotations,
        SCALE_UP_THRESHOLD_PERCENT,
        policy.default_scale_up_threshold,
    );
    let down = integer_value(
        annotations,
        SCALE_DOWN_THRESHOLD_PERCENT,
        policy.default_scale_down_threshold,
    );

    let user_pods = used - system;
    let user_capacity = capacity - system;
    // No room for user pods at all: utilisation is undefined, skip this pass.
    if user_capacity <= 0 {
        return None;
    }
    let used_percent = user_pods * 100 / user_capacity;

    if used_percent >= up {
        set_state(annotations, LifecycleState::PendingScaleUp);
        Some(LifecycleAction::MarkScaleUp {
            used_percent,
            threshold: up,
        })
    } else if used_percent <= down {
        set_state(annotations, LifecycleState::PendingScaleDown);
        Some(LifecycleAction::MarkScaleDown {
            used_percent,
            threshold: down,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::annotations::LIFECYCLE_STATE;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap()
    }

    fn snapshot(total: u64, used: u64, system: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            allocatable_pods: total,
            total_pods: total,
            used_pods: used,
            used_system_pods: system,
        }
    }

    fn ready_annotations() -> BTreeMap<String, String> {
        let mut a = BTreeMap::new();
        set_state(&mut a, LifecycleState::Ready);
        a
    }

    fn autoscaled(mut a: BTreeMap<String, String>) -> BTreeMap<String, String> {
        a.insert(AUTOSCALE_ENABLED.to_string(), "true".to_string());
        a
    }

    fn state_of(a: &BTreeMap<String, String>) -> StateAnnotation {
        StateAnnotation::read(a)
    }

    /// Annotations as they look after a previous pass recorded `snap`
    fn recorded(mut a: BTreeMap<String, String>, snap: &MetricsSnapshot) -> BTreeMap<String, String> {
        for (key, value) in snap.values() {
            a.insert(key.to_string(), value.to_string());
        }
        a
    }

    // =========================================================================
    // Rule 1: Capacity
    // =========================================================================

    mod capacity {
        use super::*;

        #[test]
        fn missing_capacity_is_written() {
            let mut a = ready_annotations();
            let snap = snapshot(110, 40, 10);
            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());

            assert!(decision.changed());
            assert_eq!(decision.actions[0], LifecycleAction::RecordCapacity);
            assert_eq!(a[CAPACITY_TOTAL_PODS], "110");
            assert_eq!(a[CAPACITY_ALLOCATABLE_PODS], "110");
            assert_eq!(a[CAPACITY_USED_PODS], "40");
            assert_eq!(a[CAPACITY_SYSTEM_PODS], "10");
        }

        #[test]
        fn one_missing_key_rewrites_all_four() {
            let snap = snapshot(110, 40, 10);
            let mut a = recorded(ready_annotations(), &snap);
            a.remove(CAPACITY_ALLOCATABLE_PODS);
            a.insert(CAPACITY_TOTAL_PODS.to_string(), "999".to_string());

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());

            assert_eq!(decision.actions, vec![LifecycleAction::RecordCapacity]);
            assert_eq!(a[CAPACITY_TOTAL_PODS], "110");
            assert_eq!(a[CAPACITY_ALLOCATABLE_PODS], "110");
        }

        #[test]
        fn stale_value_is_overwritten() {
            let mut a = recorded(ready_annotations(), &snapshot(110, 40, 10));
            let decision = evaluate(
                &mut a,
                &snapshot(110, 41, 10),
                &LifecyclePolicy::default(),
                now(),
            );
            assert_eq!(decision.actions, vec![LifecycleAction::RecordCapacity]);
            assert_eq!(a[CAPACITY_USED_PODS], "41");
        }

        #[test]
        fn unparsable_value_compares_as_zero() {
            let mut a = recorded(ready_annotations(), &snapshot(110, 40, 10));
            a.insert(CAPACITY_USED_PODS.to_string(), "forty".to_string());

            let decision = evaluate(
                &mut a,
                &snapshot(110, 40, 10),
                &LifecyclePolicy::default(),
                now(),
            );
            assert!(decision.actions.contains(&LifecycleAction::RecordCapacity));
            assert_eq!(a[CAPACITY_USED_PODS], "40");
        }

        #[test]
        fn matching_values_are_left_alone() {
            let snap = snapshot(110, 40, 10);
            let mut a = recorded(ready_annotations(), &snap);
            let before = a.clone();

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());

            assert!(!decision.changed());
            assert_eq!(a, before);
        }
    }

    // =========================================================================
    // Rules 2 and 3: Idle timer and TTL
    // =========================================================================

    mod idle_shutdown {
        use super::*;

        /// Story: the last user workload leaves a Ready cluster, so the idle
        /// timer starts; a new workload arriving later cancels it.
        #[test]
        fn story_idle_timer_starts_then_cancels() {
            let mut a = ready_annotations();

            let first = evaluate(
                &mut a,
                &snapshot(110, 5, 5),
                &LifecyclePolicy::default(),
                now(),
            );
            assert!(first.changed());
            assert!(first.actions.contains(&LifecycleAction::StartShutdownTimer));
            assert_eq!(a[SHUTDOWN_START_TIME], format_timestamp(now()));

            let later = now() + Duration::seconds(60);
            let second = evaluate(
                &mut a,
                &snapshot(110, 6, 5),
                &LifecyclePolicy::default(),
                later,
            );
            assert!(second.changed());
            assert!(second.actions.contains(&LifecycleAction::ClearShutdownTimer));
            assert!(!a.contains_key(SHUTDOWN_START_TIME));
        }

        #[test]
        fn timer_not_restarted_while_running() {
            let snap = snapshot(110, 5, 5);
            let mut a = recorded(ready_annotations(), &snap);
            let started = now() - Duration::seconds(30);
            a.insert(SHUTDOWN_START_TIME.to_string(), format_timestamp(started));

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());

            assert!(!decision.changed());
            assert_eq!(a[SHUTDOWN_START_TIME], format_timestamp(started));
        }

        #[test]
        fn timer_only_starts_on_ready_clusters() {
            let snap = snapshot(110, 5, 5);
            for state in [LifecycleState::PendingScaleUp, LifecycleState::Offline] {
                let mut a = BTreeMap::new();
                set_state(&mut a, state);
                let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
                assert!(!decision.actions.contains(&LifecycleAction::StartShutdownTimer));
                assert!(!a.contains_key(SHUTDOWN_START_TIME));
            }

            // Unmanaged cluster (no lifecycle-state) never gets a timer either
            let mut a = BTreeMap::new();
            evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(!a.contains_key(SHUTDOWN_START_TIME));
        }

        #[test]
        fn expired_ttl_marks_pending_shutdown() {
            let snap = snapshot(110, 5, 5);
            let mut a = recorded(ready_annotations(), &snap);
            a.insert(
                SHUTDOWN_START_TIME.to_string(),
                format_timestamp(now() - Duration::seconds(3600)),
            );
            a.insert(TIME_TO_LIVE_SECONDS.to_string(), "1800".to_string());

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());

            assert_eq!(
                decision.actions,
                vec![LifecycleAction::MarkPendingShutdown { ttl_secs: 1800 }]
            );
            assert!(state_of(&a).is(LifecycleState::PendingShutdown));
            assert!(!a.contains_key(SHUTDOWN_START_TIME));
        }

        #[test]
        fn ttl_boundary_is_inclusive() {
            let snap = snapshot(110, 5, 5);
            let mut a = recorded(ready_annotations(), &snap);
            a.insert(
                SHUTDOWN_START_TIME.to_string(),
                format_timestamp(now() - Duration::seconds(1800)),
            );
            a.insert(TIME_TO_LIVE_SECONDS.to_string(), "1800".to_string());

            evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(state_of(&a).is(LifecycleState::PendingShutdown));
        }

        #[test]
        fn unexpired_ttl_keeps_timer() {
            let snap = snapshot(110, 5, 5);
            let mut a = recorded(ready_annotations(), &snap);
            a.insert(
                SHUTDOWN_START_TIME.to_string(),
                format_timestamp(now() - Duration::seconds(100)),
            );

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(!decision.changed());
            assert!(state_of(&a).is(LifecycleState::Ready));
        }

        #[test]
        fn ttl_defaults_from_policy() {
            let snap = snapshot(110, 5, 5);
            let policy = LifecyclePolicy {
                default_ttl_secs: 60,
                ..Default::default()
            };
            let mut a = recorded(ready_annotations(), &snap);
            a.insert(
                SHUTDOWN_START_TIME.to_string(),
                format_timestamp(now() - Duration::seconds(61)),
            );

            let decision = evaluate(&mut a, &snap, &policy, now());
            assert_eq!(
                decision.actions,
                vec![LifecycleAction::MarkPendingShutdown { ttl_secs: 60 }]
            );
        }

        #[test]
        fn zero_ttl_never_expires() {
            let snap = snapshot(110, 5, 5);
            let mut a = recorded(ready_annotations(), &snap);
            a.insert(
                SHUTDOWN_START_TIME.to_string(),
                format_timestamp(now() - Duration::days(30)),
            );
            a.insert(TIME_TO_LIVE_SECONDS.to_string(), "0".to_string());

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(!decision.changed());
        }

        #[test]
        fn unparsable_start_time_is_ignored() {
            let snap = snapshot(110, 5, 5);
            let mut a = recorded(ready_annotations(), &snap);
            a.insert(SHUTDOWN_START_TIME.to_string(), "soon".to_string());
            a.insert(TIME_TO_LIVE_SECONDS.to_string(), "1".to_string());

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(!decision.changed());
            assert_eq!(a[SHUTDOWN_START_TIME], "soon");
        }

        #[test]
        fn legacy_start_time_still_expires() {
            let snap = snapshot(110, 5, 5);
            let mut a = recorded(ready_annotations(), &snap);
            a.insert(
                SHUTDOWN_START_TIME.to_string(),
                "Mon Oct  5 09:30:00 UTC 2026".to_string(),
            );

            evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(state_of(&a).is(LifecycleState::PendingShutdown));
        }
    }

    // =========================================================================
    // Rule 4: Threshold scaling
    // =========================================================================

    mod scaling {
        use super::*;

        #[rstest]
        #[case::spec_scale_up(100, 91, 10, Some(LifecycleState::PendingScaleUp))]
        #[case::spec_scale_down(100, 19, 10, Some(LifecycleState::PendingScaleDown))]
        #[case::exactly_up_threshold(110, 90, 10, Some(LifecycleState::PendingScaleUp))]
        #[case::exactly_down_threshold(110, 30, 10, Some(LifecycleState::PendingScaleDown))]
        #[case::between_thresholds(110, 60, 10, None)]
        // 159 of 200 user slots is 79.5%, truncated to 79
        #[case::truncation_rounds_down(210, 169, 10, None)]
        fn thresholds(
            #[case] total: u64,
            #[case] used: u64,
            #[case] system: u64,
            #[case] expected: Option<LifecycleState>,
        ) {
            let snap = snapshot(total, used, system);
            let mut a = autoscaled(recorded(ready_annotations(), &snap));

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());

            match expected {
                Some(state) => {
                    assert!(decision.changed());
                    assert!(state_of(&a).is(state));
                }
                None => {
                    assert!(!decision.changed());
                    assert!(state_of(&a).is(LifecycleState::Ready));
                }
            }
        }

        #[test]
        fn scale_up_reports_utilisation() {
            let snap = snapshot(100, 91, 10);
            let mut a = autoscaled(recorded(ready_annotations(), &snap));

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert_eq!(
                decision.actions,
                vec![LifecycleAction::MarkScaleUp {
                    used_percent: 90,
                    threshold: 80
                }]
            );
        }

        #[test]
        fn scale_up_wins_when_both_thresholds_match() {
            let snap = snapshot(110, 60, 10);
            let mut a = autoscaled(recorded(ready_annotations(), &snap));
            a.insert(SCALE_UP_THRESHOLD_PERCENT.to_string(), "40".to_string());
            a.insert(SCALE_DOWN_THRESHOLD_PERCENT.to_string(), "60".to_string());

            evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(state_of(&a).is(LifecycleState::PendingScaleUp));
        }

        #[test]
        fn annotation_thresholds_override_policy() {
            let snap = snapshot(110, 60, 10);
            let mut a = autoscaled(recorded(ready_annotations(), &snap));
            a.insert(SCALE_UP_THRESHOLD_PERCENT.to_string(), "50".to_string());

            evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(state_of(&a).is(LifecycleState::PendingScaleUp));
        }

        #[rstest]
        #[case::no_annotation(None)]
        #[case::unparsable(Some("enabled"))]
        #[case::disabled(Some("false"))]
        fn autoscale_gate_blocks_marking(#[case] raw: Option<&str>) {
            let snap = snapshot(100, 99, 10);
            let mut a = recorded(ready_annotations(), &snap);
            if let Some(raw) = raw {
                a.insert(AUTOSCALE_ENABLED.to_string(), raw.to_string());
            }
            a.insert(SCALE_UP_THRESHOLD_PERCENT.to_string(), "0".to_string());

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(!decision.changed());
            assert!(state_of(&a).is(LifecycleState::Ready));
        }

        #[test]
        fn non_ready_cluster_is_not_marked() {
            let snap = snapshot(100, 99, 10);
            for state in [
                LifecycleState::ScalingUp,
                LifecycleState::PendingScaleDown,
                LifecycleState::PendingShutdown,
            ] {
                let mut a = BTreeMap::new();
                set_state(&mut a, state);
                let mut a = autoscaled(recorded(a, &snap));

                let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
                assert!(!decision.changed());
                assert_eq!(a[LIFECYCLE_STATE], state.as_str());
            }
        }

        #[test]
        fn zero_user_capacity_skips_scaling() {
            // Capacity fully consumed by system pods: 0 user slots
            let snap = snapshot(10, 12, 10);
            let mut a = autoscaled(recorded(ready_annotations(), &snap));

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(!decision.changed());
            assert!(state_of(&a).is(LifecycleState::Ready));
        }

        #[test]
        fn negative_user_capacity_skips_scaling() {
            let snap = snapshot(5, 12, 10);
            let mut a = autoscaled(recorded(ready_annotations(), &snap));

            let decision = evaluate(&mut a, &snap, &LifecyclePolicy::default(), now());
            assert!(!decision.changed());
        }

        /// Story: an idle cluster with autoscale on gets both an idle timer and
        /// a scale-down mark in the same pass.
        #[test]
        fn story_idle_autoscaled_cluster_marks_scale_down_with_timer() {
            let mut a = autoscaled(ready_annotations());
            let decision = evaluate(
                &mut a,
                &snapshot(110, 10, 10),
                &LifecyclePolicy::default(),
                now(),
            );

            assert_eq!(
                decision.actions,
                vec![
                    LifecycleAction::RecordCapacity,
                    LifecycleAction::StartShutdownTimer,
                    LifecycleAction::MarkScaleDown {
                        used_percent: 0,
                        threshold: 20
                    },
                ]
            );
            assert!(state_of(&a).is(LifecycleState::PendingScaleDown));
            assert!(a.contains_key(SHUTDOWN_START_TIME));
        }
    }

    // =========================================================================
    // Idempotence
    // =========================================================================

    #[rstest]
    #[case::busy(snapshot(110, 60, 10), false)]
    #[case::idle(snapshot(110, 10, 10), false)]
    #[case::scaling_up(snapshot(100, 95, 10), true)]
    #[case::scaling_down(snapshot(100, 12, 10), true)]
    fn second_evaluation_is_a_no_op(#[case] snap: MetricsSnapshot, #[case] autoscale: bool) {
        let mut a = ready_annotations();
        if autoscale {
            a = autoscaled(a);
        }
        let policy = LifecyclePolicy::default();

        evaluate(&mut a, &snap, &policy, now());
        let after_first = a.clone();
        let second = evaluate(&mut a, &snap, &policy, now());

        assert!(!second.changed(), "actions: {:?}", second.actions);
        assert_eq!(a, after_first);
    }
}
