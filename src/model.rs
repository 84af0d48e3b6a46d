use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Natural identity of a pod across refreshes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkloadKey {
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for WorkloadKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl Phase {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_settled(self) -> bool {
        matches!(self, Self::Running | Self::Succeeded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkloadRecord {
    pub key: WorkloadKey,
    pub ready_count: usize,
    pub total: usize,
    pub ready: bool,
    pub phase: Phase,
    pub restarts: u32,
    /// `None` when metrics are unavailable for this pod.
    pub cpu_millicores: Option<u64>,
    pub memory_bytes: Option<u64>,
    pub node: Option<String>,
    pub ip: Option<String>,
    /// First declared container port.
    pub port: Option<i32>,
    pub age: Option<Duration>,
    pub containers: Vec<String>,
    pub note: String,
}

impl WorkloadRecord {
    pub fn ready_label(&self) -> String {
        format!("{}/{}", self.ready_count, self.total)
    }

    pub fn cpu_label(&self) -> String {
        self.cpu_millicores
            .map(|value| format!("{value}m"))
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn memory_label(&self) -> String {
        self.memory_bytes
            .map(|value| format!("{}Mi", value / (1024 * 1024)))
            .unwrap_or_else(|| "-".to_string())
    }

    /// Settled, never restarted and fully ready.
    pub fn is_healthy(&self) -> bool {
        self.phase.is_settled() && self.restarts == 0 && self.ready
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClusterSummary {
    pub node_count: usize,
    pub cpu_capacity_millicores: u64,
    pub memory_capacity_bytes: u64,
    pub cpu_usage_millicores: Option<u64>,
    pub memory_usage_bytes: Option<u64>,
}

impl ClusterSummary {
    pub fn cpu_percent(&self) -> Option<f64> {
        percent(self.cpu_usage_millicores, self.cpu_capacity_millicores)
    }

    pub fn memory_percent(&self) -> Option<f64> {
        percent(self.memory_usage_bytes, self.memory_capacity_bytes)
    }
}

fn percent(usage: Option<u64>, capacity: u64) -> Option<f64> {
    let usage = usage?;
    if capacity == 0 {
        return None;
    }
    Some(usage as f64 * 100.0 / capacity as f64)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NamespaceScope {
    #[default]
    All,
    Named(String),
}

impl NamespaceScope {
    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Named(namespace) => namespace.clone(),
        }
    }

    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Named(label.to_string())
        }
    }

    pub fn matches(&self, namespace: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => name == namespace,
        }
    }
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Non-running first, then by name.
    #[default]
    Default,
    Cpu,
    Memory,
}

impl SortMode {
    pub fn title(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Cpu => "CPU Usage",
            Self::Memory => "Memory Usage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewFilterConfig {
    pub namespace: NamespaceScope,
    pub issues_only: bool,
    pub search: String,
    pub sort: SortMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass {
    Ok,
    Warning,
    Error,
    Selected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_scope_parses_all_case_insensitively() {
        assert_eq!(NamespaceScope::from_label("ALL"), NamespaceScope::All);
        assert_eq!(NamespaceScope::from_label(""), NamespaceScope::All);
        assert_eq!(
            NamespaceScope::from_label("kube-system"),
            NamespaceScope::Named("kube-system".to_string())
        );
    }

    #[test]
    fn usage_labels_render_unknown_as_dash() {
        let record = WorkloadRecord {
            cpu_millicores: Some(250),
            memory_bytes: None,
            ..WorkloadRecord::default()
        };
        assert_eq!(record.cpu_label(), "250m");
        assert_eq!(record.memory_label(), "-");

        let record = WorkloadRecord {
            memory_bytes: Some(64 * 1024 * 1024),
            ..WorkloadRecord::default()
        };
        assert_eq!(record.memory_label(), "64Mi");
    }

    #[test]
    fn summary_percent_requires_usage_and_capacity() {
        let summary = ClusterSummary {
            node_count: 2,
            cpu_capacity_millicores: 4_000,
            memory_capacity_bytes: 0,
            cpu_usage_millicores: Some(1_000),
            memory_usage_bytes: Some(10),
        };
        assert_eq!(summary.cpu_percent(), Some(25.0));
        assert_eq!(summary.memory_percent(), None);
        assert_eq!(ClusterSummary::default().cpu_percent(), None);
    }

    #[test]
    fn phase_parse_falls_back_to_unknown() {
        assert_eq!(Phase::parse("Running"), Phase::Running);
        assert_eq!(Phase::parse("Evicted"), Phase::Unknown);
        assert!(Phase::Succeeded.is_settled());
        assert!(!Phase::Pending.is_settled());
    }
}
