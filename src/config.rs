//! Operator configuration
//!
//! Immutable settings shared by every reconcile pass: requeue delays, admin
//! call timeouts and the per-component defaults (ports, replicas, args) used
//! when building managed resources. Built once in `main` and handed to the
//! phases through the reconcile context, so tests can override any value per
//! scenario.

use std::time::Duration;

/// Field manager recorded on objects the operator writes.
pub const FIELD_MANAGER: &str = "streamline-operator";

/// Components managed by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Metadata,
    AdminServer,
    Storage,
    Compute,
    Gateway,
    Console,
}

impl Component {
    /// Name suffix and `app.kubernetes.io/component` label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Metadata => "metadata",
            Component::AdminServer => "admin-server",
            Component::Storage => "storage",
            Component::Compute => "compute",
            Component::Gateway => "gateway",
            Component::Console => "console",
        }
    }

    /// Whether the component is only deployed when requested in the spec.
    pub fn is_optional(&self) -> bool {
        matches!(self, Component::Gateway | Component::Console)
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named container port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDefault {
    pub name: &'static str,
    pub port: i32,
}

/// Defaults applied to one component when the spec leaves a field unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDefaults {
    pub replicas: i32,
    /// Ports exposed by the container; the first one is the primary port.
    pub ports: Vec<PortDefault>,
    /// Arguments passed to the container before any user-supplied args.
    pub args: Vec<String>,
    /// Data directory mounted from the volume claim (stateful tiers only).
    pub data_dir: Option<&'static str>,
}

impl ComponentDefaults {
    /// The primary (first) port.
    pub fn primary_port(&self) -> i32 {
        self.ports.first().map(|p| p.port).unwrap_or_default()
    }
}

/// Per-component default table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentTable {
    pub metadata: ComponentDefaults,
    pub admin_server: ComponentDefaults,
    pub storage: ComponentDefaults,
    pub compute: ComponentDefaults,
    pub gateway: ComponentDefaults,
    pub console: ComponentDefaults,
}

impl ComponentTable {
    pub fn get(&self, component: Component) -> &ComponentDefaults {
        match component {
            Component::Metadata => &self.metadata,
            Component::AdminServer => &self.admin_server,
            Component::Storage => &self.storage,
            Component::Compute => &self.compute,
            Component::Gateway => &self.gateway,
            Component::Console => &self.console,
        }
    }
}

impl Default for ComponentTable {
    fn default() -> Self {
        let args = |a: &[&str]| a.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            metadata: ComponentDefaults {
                replicas: 1,
                ports: vec![
                    PortDefault { name: "http", port: 4001 },
                    PortDefault { name: "raft", port: 4002 },
                ],
                args: args(&["streamline-meta", "--http-addr", "0.0.0.0:4001"]),
                data_dir: Some("/data/meta"),
            },
            admin_server: ComponentDefaults {
                replicas: 1,
                ports: vec![PortDefault { name: "admin", port: 6440 }],
                args: args(&["streamline-admin-server", "--config-path", "/etc/streamline/config.json"]),
                data_dir: None,
            },
            storage: ComponentDefaults {
                replicas: 3,
                ports: vec![
                    PortDefault { name: "data", port: 4440 },
                    PortDefault { name: "gossip", port: 4441 },
                    PortDefault { name: "admin", port: 6440 },
                ],
                args: args(&["streamline-store", "--config-path", "/etc/streamline/config.json"]),
                data_dir: Some("/data/store"),
            },
            compute: ComponentDefaults {
                replicas: 1,
                ports: vec![
                    PortDefault { name: "client", port: 6570 },
                    PortDefault { name: "internal", port: 6571 },
                ],
                args: args(&["streamline-server", "--config-path", "/etc/streamline/config.json"]),
                data_dir: Some("/data/server"),
            },
            gateway: ComponentDefaults {
                replicas: 1,
                ports: vec![PortDefault { name: "kafka", port: 9092 }],
                args: args(&["streamline-gateway"]),
                data_dir: None,
            },
            console: ComponentDefaults {
                replicas: 1,
                ports: vec![PortDefault { name: "http", port: 5177 }],
                args: args(&["streamline-console"]),
                data_dir: None,
            },
        }
    }
}

/// Operator-wide settings.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Field manager name for writes.
    pub field_manager: String,
    /// Requeue delay after a fully successful pass.
    pub resync_period: Duration,
    /// Delay used when a phase waits on pods or remote nodes.
    pub wait_delay: Duration,
    /// Delay used after an optimistic-concurrency conflict.
    pub conflict_delay: Duration,
    /// Delay before re-running a pass that deferred work.
    pub incomplete_delay: Duration,
    /// Requeue delay applied by the controller error policy.
    pub error_backoff: Duration,
    /// Upper bound for a single remote admin call.
    pub admin_timeout: Duration,
    /// Maximum metadata replication factor recommended for the storage tier.
    pub max_replication_factor: i32,
    /// Per-component defaults.
    pub components: ComponentTable,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            field_manager: FIELD_MANAGER.to_string(),
            resync_period: Duration::from_secs(60),
            wait_delay: Duration::from_secs(10),
            conflict_delay: Duration::from_secs(2),
            incomplete_delay: Duration::from_secs(1),
            error_backoff: Duration::from_secs(30),
            admin_timeout: Duration::from_secs(30),
            max_replication_factor: 3,
            components: ComponentTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delays_are_bounded() {
        let config = OperatorConfig::default();
        assert!(config.conflict_delay > Duration::ZERO);
        assert!(config.incomplete_delay < config.wait_delay);
        assert!(config.wait_delay < config.resync_period);
        assert_eq!(config.admin_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_component_table_lookup() {
        let table = ComponentTable::default();
        assert_eq!(table.get(Component::Storage).replicas, 3);
        assert_eq!(table.get(Component::Metadata).primary_port(), 4001);
        assert!(table.get(Component::Gateway).data_dir.is_none());
    }

    #[test]
    fn test_optional_components() {
        assert!(Component::Gateway.is_optional());
        assert!(Component::Console.is_optional());
        assert!(!Component::Storage.is_optional());
    }
}
