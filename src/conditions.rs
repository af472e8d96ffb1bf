//! Kubernetes-standard status conditions for StreamlineCluster
//!
//! Condition type and reason constants, plus [`ConditionSet`]: the ordered,
//! deduplicated condition list stored in the cluster status. The set keeps at
//! most one entry per type, only moves `lastTransitionTime` when a status
//! actually flips, and stays sorted most-recent-transition first so that the
//! persisted order is deterministic.

use crate::config::Component;
use crate::crd::{ClusterCondition, ConditionStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;

// Condition types
pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_METADATA_READY: &str = "MetadataReady";
pub const CONDITION_ADMIN_SERVER_READY: &str = "AdminServerReady";
pub const CONDITION_STORAGE_READY: &str = "StorageReady";
pub const CONDITION_COMPUTE_READY: &str = "ComputeReady";
pub const CONDITION_GATEWAY_READY: &str = "GatewayReady";
pub const CONDITION_CONSOLE_READY: &str = "ConsoleReady";
pub const CONDITION_STORAGE_UPDATING: &str = "StorageUpdating";

// Reasons
pub const REASON_ALL_COMPONENTS_READY: &str = "AllComponentsReady";
pub const REASON_ALL_COMPONENTS_NOT_READY: &str = "AllComponentsNotReady";
pub const REASON_NODES_REACHABLE: &str = "NodesReachable";
pub const REASON_BOOTSTRAPPED: &str = "Bootstrapped";
pub const REASON_PODS_READY: &str = "PodsReady";
pub const REASON_PODS_NOT_READY: &str = "PodsNotReady";
pub const REASON_SCALING_UP: &str = "ScalingUp";
pub const REASON_SCALING_DOWN: &str = "ScalingDown";
pub const REASON_SCALING_COMPLETE: &str = "ScalingComplete";

/// The `<Component>Ready` condition type for a component.
pub fn ready_condition_for(component: Component) -> &'static str {
    match component {
        Component::Metadata => CONDITION_METADATA_READY,
        Component::AdminServer => CONDITION_ADMIN_SERVER_READY,
        Component::Storage => CONDITION_STORAGE_READY,
        Component::Compute => CONDITION_COMPUTE_READY,
        Component::Gateway => CONDITION_GATEWAY_READY,
        Component::Console => CONDITION_CONSOLE_READY,
    }
}

/// Format a timestamp the way conditions persist it.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_time(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Ordered set of cluster conditions keyed by type.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    conditions: Vec<ClusterCondition>,
    index: HashMap<String, usize>,
    generation: Option<i64>,
}

impl ConditionSet {
    /// Build a set from persisted conditions.
    ///
    /// Duplicate types keep the first occurrence. `generation` is recorded as
    /// `observedGeneration` on every transition made through this set.
    pub fn new(conditions: Vec<ClusterCondition>, generation: Option<i64>) -> Self {
        let mut set = Self {
            conditions: Vec::with_capacity(conditions.len()),
            index: HashMap::new(),
            generation,
        };
        for condition in conditions {
            if !set.index.contains_key(&condition.r#type) {
                set.index
                    .insert(condition.r#type.clone(), set.conditions.len());
                set.conditions.push(condition);
            }
        }
        set.sort();
        set
    }

    pub fn get(&self, condition_type: &str) -> Option<&ClusterCondition> {
        self.index
            .get(condition_type)
            .map(|&i| &self.conditions[i])
    }

    pub fn is_true(&self, condition_type: &str) -> bool {
        self.get(condition_type)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    /// True when the condition is set to `True` with the given reason.
    pub fn is_true_with_reason(&self, condition_type: &str, reason: &str) -> bool {
        self.get(condition_type)
            .is_some_and(|c| c.status == ConditionStatus::True && c.reason == reason)
    }

    /// Upsert a condition, stamping transitions with the current time.
    pub fn set(
        &mut self,
        condition_type: &str,
        status: ConditionStatus,
        reason: &str,
        message: &str,
    ) {
        self.set_at(condition_type, status, reason, message, Utc::now());
    }

    /// Upsert a condition, stamping transitions with `now`.
    pub fn set_at(
        &mut self,
        condition_type: &str,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: DateTime<Utc>,
    ) {
        match self.index.get(condition_type) {
            Some(&i) => {
                let existing = &mut self.conditions[i];
                if existing.status != status {
                    existing.status = status;
                    existing.last_transition_time = Some(format_time(now));
                    existing.observed_generation = self.generation;
                }
                existing.reason = reason.to_string();
                existing.message = message.to_string();
            }
            None => {
                self.index
                    .insert(condition_type.to_string(), self.conditions.len());
                self.conditions.push(ClusterCondition {
                    r#type: condition_type.to_string(),
                    status,
                    reason: reason.to_string(),
                    message: message.to_string(),
                    last_transition_time: Some(format_time(now)),
                    observed_generation: self.generation,
                });
            }
        }
        self.sort();
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn as_slice(&self) -> &[ClusterCondition] {
        &self.conditions
    }

    pub fn to_vec(&self) -> Vec<ClusterCondition> {
        self.conditions.clone()
    }

    // Stable sort, so equal transition times keep their relative order.
    fn sort(&mut self) {
        self.conditions.sort_by(|a, b| {
            let ta = parse_time(a.last_transition_time.as_deref());
            let tb = parse_time(b.last_transition_time.as_deref());
            tb.cmp(&ta)
        });
        self.index = self
            .conditions
            .iter()
            .enumerate()
            .map(|(i, c)| (c.r#type.clone(), i))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_set_condition_adds_new() {
        let mut set = ConditionSet::new(Vec::new(), Some(3));
        set.set_at(CONDITION_READY, ConditionStatus::True, "OK", "ok", at(0));
        assert_eq!(set.len(), 1);
        let cond = set.get(CONDITION_READY).unwrap();
        assert_eq!(cond.observed_generation, Some(3));
        assert_eq!(cond.last_transition_time.as_deref(), Some(format_time(at(0)).as_str()));
        assert!(set.is_true(CONDITION_READY));
    }

    #[test]
    fn test_set_condition_preserves_transition_time_on_same_status() {
        let mut set = ConditionSet::new(Vec::new(), Some(1));
        set.set_at(CONDITION_READY, ConditionStatus::True, "First", "first", at(0));
        set.set_at(CONDITION_READY, ConditionStatus::True, "Second", "second", at(60));

        assert_eq!(set.len(), 1);
        let cond = set.get(CONDITION_READY).unwrap();
        assert_eq!(cond.last_transition_time.as_deref(), Some(format_time(at(0)).as_str()));
        assert_eq!(cond.reason, "Second");
        assert_eq!(cond.message, "second");
    }

    #[test]
    fn test_set_condition_updates_transition_time_on_status_change() {
        let mut set = ConditionSet::new(Vec::new(), Some(1));
        set.set_at(CONDITION_READY, ConditionStatus::False, "NotReady", "", at(0));

        let mut set = ConditionSet::new(set.to_vec(), Some(2));
        set.set_at(CONDITION_READY, ConditionStatus::True, "AllReady", "", at(30));

        let cond = set.get(CONDITION_READY).unwrap();
        assert_eq!(cond.last_transition_time.as_deref(), Some(format_time(at(30)).as_str()));
        assert_eq!(cond.observed_generation, Some(2));
    }

    #[test]
    fn test_sorted_most_recent_first() {
        let mut set = ConditionSet::new(Vec::new(), None);
        set.set_at(CONDITION_METADATA_READY, ConditionStatus::True, "", "", at(0));
        set.set_at(CONDITION_STORAGE_READY, ConditionStatus::True, "", "", at(10));
        set.set_at(CONDITION_COMPUTE_READY, ConditionStatus::False, "", "", at(5));

        let order: Vec<&str> = set.as_slice().iter().map(|c| c.r#type.as_str()).collect();
        assert_eq!(
            order,
            vec![CONDITION_STORAGE_READY, CONDITION_COMPUTE_READY, CONDITION_METADATA_READY]
        );

        // Flipping the oldest moves it to the front and the index follows it.
        set.set_at(CONDITION_METADATA_READY, ConditionStatus::False, "", "", at(20));
        assert_eq!(set.as_slice()[0].r#type, CONDITION_METADATA_READY);
        assert!(!set.is_true(CONDITION_METADATA_READY));
        assert!(set.is_true(CONDITION_STORAGE_READY));
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut set = ConditionSet::new(Vec::new(), None);
        set.set_at("A", ConditionStatus::True, "", "", at(0));
        set.set_at("B", ConditionStatus::True, "", "", at(0));
        set.set_at("C", ConditionStatus::True, "", "", at(0));
        let order: Vec<&str> = set.as_slice().iter().map(|c| c.r#type.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_new_deduplicates_types() {
        let cond = |status| ClusterCondition {
            r#type: CONDITION_READY.to_string(),
            status,
            reason: String::new(),
            message: String::new(),
            last_transition_time: Some(format_time(at(0))),
            observed_generation: None,
        };
        let set = ConditionSet::new(
            vec![cond(ConditionStatus::True), cond(ConditionStatus::False)],
            None,
        );
        assert_eq!(set.len(), 1);
        assert!(set.is_true(CONDITION_READY));
    }

    #[test]
    fn test_is_true_with_reason() {
        let mut set = ConditionSet::new(Vec::new(), None);
        set.set_at(
            CONDITION_STORAGE_UPDATING,
            ConditionStatus::True,
            REASON_SCALING_DOWN,
            "",
            at(0),
        );
        assert!(set.is_true_with_reason(CONDITION_STORAGE_UPDATING, REASON_SCALING_DOWN));
        assert!(!set.is_true_with_reason(CONDITION_STORAGE_UPDATING, REASON_SCALING_UP));
    }

    #[test]
    fn test_ready_condition_for_component() {
        assert_eq!(ready_condition_for(Component::Storage), CONDITION_STORAGE_READY);
        assert_eq!(ready_condition_for(Component::Console), CONDITION_CONSOLE_READY);
    }
}
