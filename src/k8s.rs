use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Event, Namespace, Node, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{DeleteParams, ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, ResourceExt};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::model::{ClusterSummary, Phase, WorkloadKey, WorkloadRecord};

/// CPU millicores and memory bytes.
pub type Usage = (u64, u64);

/// A Warning event attached to a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodEvent {
    pub reason: String,
    pub message: String,
}

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    cluster: String,
}

impl KubeGateway {
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .context("failed to load Kubernetes configuration")?
            }
            None => Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?,
        };

        let cluster = config.cluster_url.to_string();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;
        Ok(Self { client, cluster })
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Round-trips to the API server so connection problems surface at startup.
    pub async fn verify(&self) -> Result<String> {
        let info = self
            .client
            .apiserver_version()
            .await
            .with_context(|| format!("cluster {} is unreachable", self.cluster))?;
        Ok(info.git_version)
    }

    /// All pods in every namespace merged with their usage. Missing metrics
    /// leave usage unknown rather than failing the listing.
    pub async fn list_workloads(&self) -> Result<Vec<WorkloadRecord>> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let pod_list = pods
            .list(&list_params())
            .await
            .context("failed to list pods")?;

        let usage = match self.pod_usage().await {
            Ok(usage) => usage,
            Err(error) => {
                warn!(error = %format!("{error:#}"), "pod metrics unavailable");
                HashMap::new()
            }
        };

        let now = now_seconds();
        let records = pod_list
            .items
            .iter()
            .map(|pod| {
                let key = WorkloadKey::new(pod.namespace().unwrap_or_default(), pod.name_any());
                let usage = usage.get(&key).copied();
                workload_from_pod(pod, usage, now)
            })
            .collect::<Vec<_>>();
        debug!(count = records.len(), "listed workloads");
        Ok(records)
    }

    async fn pod_usage(&self) -> Result<HashMap<WorkloadKey, Usage>> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
        let metrics = api
            .list(&list_params())
            .await
            .context("failed to list pod metrics")?;

        Ok(metrics
            .into_iter()
            .map(|metric| {
                let key = WorkloadKey::new(metric.namespace().unwrap_or_default(), metric.name_any());
                (key, parse_pod_metrics_usage(&metric.data))
            })
            .collect())
    }

    pub async fn cluster_summary(&self) -> Result<ClusterSummary> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let node_list = nodes
            .list(&list_params())
            .await
            .context("failed to list nodes")?;

        let mut summary = ClusterSummary {
            node_count: node_list.items.len(),
            ..ClusterSummary::default()
        };
        for node in &node_list.items {
            let Some(allocatable) = node
                .status
                .as_ref()
                .and_then(|status| status.allocatable.as_ref())
            else {
                continue;
            };
            let cpu = allocatable
                .get("cpu")
                .and_then(|quantity| parse_cpu_millicores(&quantity.0))
                .unwrap_or(0);
            let memory = allocatable
                .get("memory")
                .and_then(|quantity| parse_memory_bytes(&quantity.0))
                .unwrap_or(0);
            summary.cpu_capacity_millicores = summary.cpu_capacity_millicores.saturating_add(cpu);
            summary.memory_capacity_bytes = summary.memory_capacity_bytes.saturating_add(memory);
        }

        match self.node_usage().await {
            Ok((cpu, memory)) => {
                summary.cpu_usage_millicores = Some(cpu);
                summary.memory_usage_bytes = Some(memory);
            }
            Err(error) => warn!(error = %format!("{error:#}"), "node metrics unavailable"),
        }

        Ok(summary)
    }

    async fn node_usage(&self) -> Result<Usage> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "NodeMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "nodes");
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
        let metrics = api
            .list(&list_params())
            .await
            .context("failed to list node metrics")?;

        Ok(metrics
            .into_iter()
            .fold((0u64, 0u64), |(cpu, memory), metric| {
                let (node_cpu, node_memory) = parse_usage_from_value(&metric.data["usage"]);
                (cpu.saturating_add(node_cpu), memory.saturating_add(node_memory))
            }))
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api
            .list(&list_params())
            .await
            .context("failed to list namespaces")?;
        let mut names = list
            .items
            .iter()
            .map(|namespace| namespace.name_any())
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    /// Warning events for the pod, most recent first.
    pub async fn warning_events(&self, key: &WorkloadKey) -> Result<Vec<PodEvent>> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), &key.namespace);
        let params = ListParams::default().fields(&format!(
            "involvedObject.name={},involvedObject.kind=Pod",
            key.name
        ));
        let list = api
            .list(&params)
            .await
            .with_context(|| format!("failed to list events for {key}"))?;
        Ok(warning_events_newest_first(list.items))
    }

    pub async fn pod_logs(&self, key: &WorkloadKey, container: &str, tail: i64) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &key.namespace);
        let params = LogParams {
            container: (!container.is_empty()).then(|| container.to_string()),
            tail_lines: Some(tail),
            ..LogParams::default()
        };

        pods.logs(&key.name, &params)
            .await
            .with_context(|| format!("failed to load logs for {key}"))
    }

    pub async fn delete_pod(&self, key: &WorkloadKey) -> Result<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &key.namespace);
        let _ = api
            .delete(&key.name, &DeleteParams::default())
            .await
            .with_context(|| format!("failed to delete pod {key}"))?;
        Ok(())
    }

    pub async fn delete_all_pods(&self, namespace: &str) -> Result<()> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let _ = api
            .delete_collection(&DeleteParams::default(), &ListParams::default())
            .await
            .with_context(|| format!("failed to delete pods in namespace {namespace}"))?;
        Ok(())
    }
}

/// Builds the dashboard row for a pod. `now` is unix seconds.
pub fn workload_from_pod(pod: &Pod, usage: Option<Usage>, now: i64) -> WorkloadRecord {
    let status = pod.status.as_ref();
    let spec = pod.spec.as_ref();
    let phase = status
        .and_then(|status| status.phase.as_deref())
        .map(Phase::parse)
        .unwrap_or_default();
    let (ready_count, total, restarts) = status.map(pod_readiness).unwrap_or((0, 0, 0));
    let ready = (total > 0 && ready_count == total) || phase == Phase::Succeeded;

    let containers = spec
        .map(|spec| {
            spec.containers
                .iter()
                .map(|container| container.name.clone())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let port = spec
        .and_then(|spec| spec.containers.first())
        .and_then(|container| container.ports.as_ref())
        .and_then(|ports| ports.first())
        .map(|port| port.container_port);

    WorkloadRecord {
        key: WorkloadKey::new(pod.namespace().unwrap_or_default(), pod.name_any()),
        ready_count,
        total,
        ready,
        phase,
        restarts,
        cpu_millicores: usage.map(|(cpu, _)| cpu),
        memory_bytes: usage.map(|(_, memory)| memory),
        node: spec.and_then(|spec| spec.node_name.clone()),
        ip: status.and_then(|status| status.pod_ip.clone()),
        port,
        age: pod
            .metadata
            .creation_timestamp
            .as_ref()
            .map(|created| age_since(created, now)),
        containers,
        note: pod_note(pod, phase, ready_count, total),
    }
}

fn pod_note(pod: &Pod, phase: Phase, ready_count: usize, total: usize) -> String {
    if phase == Phase::Succeeded {
        return "Completed".to_string();
    }
    if phase == Phase::Running && total > 0 && ready_count == total {
        return "[OK]".to_string();
    }

    let status = pod.status.as_ref();
    let container_statuses = status
        .and_then(|status| status.container_statuses.as_deref())
        .unwrap_or(&[]);

    // Later containers override earlier ones; within a container a waiting
    // reason wins over a terminated one.
    let container_note = container_statuses
        .iter()
        .filter_map(|container| {
            let state = container.state.as_ref()?;
            if let Some(reason) = state
                .waiting
                .as_ref()
                .and_then(|waiting| waiting.reason.clone())
                .filter(|reason| !reason.is_empty())
            {
                return Some(reason);
            }
            let terminated = state.terminated.as_ref()?;
            let reason = terminated.reason.clone().filter(|reason| !reason.is_empty())?;
            Some(if terminated.exit_code != 0 {
                format!("{reason} ({})", terminated.exit_code)
            } else {
                reason
            })
        })
        .last();
    if let Some(note) = container_note {
        return note;
    }

    status
        .and_then(|status| status.reason.clone())
        .filter(|reason| !reason.is_empty())
        .or_else(|| {
            status
                .and_then(|status| status.conditions.as_ref())
                .and_then(|conditions| {
                    conditions
                        .iter()
                        .find(|condition| condition.status == "False")
                        .and_then(|condition| condition.reason.clone())
                })
        })
        .unwrap_or_else(|| "-".to_string())
}

fn warning_events_newest_first(events: Vec<Event>) -> Vec<PodEvent> {
    let mut warnings = events
        .into_iter()
        .filter(|event| event.type_.as_deref() == Some("Warning"))
        .collect::<Vec<_>>();
    warnings.sort_by_key(|event| std::cmp::Reverse(event_timestamp_seconds(event)));
    warnings
        .into_iter()
        .map(|event| PodEvent {
            reason: event.reason.unwrap_or_else(|| "-".to_string()),
            message: event.message.unwrap_or_default().trim().to_string(),
        })
        .collect()
}

fn parse_pod_metrics_usage(data: &Value) -> Usage {
    let Some(containers) = data.get("containers").and_then(Value::as_array) else {
        return (0, 0);
    };

    containers
        .iter()
        .fold((0u64, 0u64), |(cpu, memory), container| {
            let (container_cpu, container_memory) = container
                .get("usage")
                .map(parse_usage_from_value)
                .unwrap_or((0, 0));
            (
                cpu.saturating_add(container_cpu),
                memory.saturating_add(container_memory),
            )
        })
}

fn parse_usage_from_value(value: &Value) -> Usage {
    let cpu = value
        .get("cpu")
        .and_then(Value::as_str)
        .and_then(parse_cpu_millicores)
        .unwrap_or(0);
    let memory = value
        .get("memory")
        .and_then(Value::as_str)
        .and_then(parse_memory_bytes)
        .unwrap_or(0);
    (cpu, memory)
}

fn parse_cpu_millicores(value: &str) -> Option<u64> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = if let Some(number) = raw.strip_suffix('m') {
        (number, 1.0)
    } else if let Some(number) = raw.strip_suffix('u') {
        (number, 0.001)
    } else if let Some(number) = raw.strip_suffix('n') {
        (number, 0.000001)
    } else {
        (raw, 1000.0)
    };

    scaled(number, multiplier)
}

fn parse_memory_bytes(value: &str) -> Option<u64> {
    const UNITS: [(&str, f64); 12] = [
        ("Ei", 1_152_921_504_606_846_976.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ti", 1_099_511_627_776.0),
        ("Gi", 1_073_741_824.0),
        ("Mi", 1_048_576.0),
        ("Ki", 1_024.0),
        ("E", 1_000_000_000_000_000_000.0),
        ("P", 1_000_000_000_000_000.0),
        ("T", 1_000_000_000_000.0),
        ("G", 1_000_000_000.0),
        ("M", 1_000_000.0),
        ("k", 1_000.0),
    ];

    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    for (suffix, multiplier) in UNITS {
        if let Some(number) = raw.strip_suffix(suffix) {
            return scaled(number, multiplier);
        }
    }
    if let Some(number) = raw.strip_suffix('m') {
        return scaled(number, 0.001);
    }
    scaled(raw, 1.0)
}

fn scaled(number: &str, multiplier: f64) -> Option<u64> {
    let value = (number.parse::<f64>().ok()? * multiplier).round();
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value as u64)
}

fn list_params() -> ListParams {
    ListParams::default()
}

fn pod_readiness(status: &k8s_openapi::api::core::v1::PodStatus) -> (usize, usize, u32) {
    let container_statuses = status.container_statuses.as_deref().unwrap_or(&[]);
    let total = container_statuses.len();
    let ready = container_statuses
        .iter()
        .filter(|container| container.ready)
        .count();
    let restarts = container_statuses
        .iter()
        .map(|container| u32::try_from(container.restart_count).unwrap_or(0))
        .sum();

    (ready, total, restarts)
}

fn event_timestamp_seconds(event: &Event) -> i64 {
    event
        .event_time
        .as_ref()
        .map(|time| time.0.as_second())
        .or_else(|| event.last_timestamp.as_ref().map(|time| time.0.as_second()))
        .or_else(|| {
            event
                .first_timestamp
                .as_ref()
                .map(|time| time.0.as_second())
        })
        .or_else(|| {
            event
                .metadata
                .creation_timestamp
                .as_ref()
                .map(|time| time.0.as_second())
        })
        .unwrap_or(0)
}

fn age_since(created: &Time, now: i64) -> Duration {
    let elapsed = (now - created.0.as_second()).max(0);
    Duration::from_secs(elapsed.unsigned_abs())
}

fn now_seconds() -> i64 {
    k8s_openapi::jiff::Timestamp::now().as_second()
}

pub fn format_age(age: Option<Duration>) -> String {
    let Some(age) = age else {
        return "-".to_string();
    };
    let seconds = age.as_secs();

    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        Container, ContainerPort, ContainerState, ContainerStateTerminated,
        ContainerStateWaiting, ContainerStatus, ObjectReference, PodCondition, PodSpec, PodStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn container_status(name: &str, ready: bool, restarts: i32) -> ContainerStatus {
        ContainerStatus {
            name: name.to_string(),
            ready,
            restart_count: restarts,
            ..ContainerStatus::default()
        }
    }

    fn pod(phase: &str, statuses: Vec<ContainerStatus>) -> Pod {
        let containers = statuses
            .iter()
            .map(|status| Container {
                name: status.name.clone(),
                ..Container::default()
            })
            .collect();
        Pod {
            metadata: ObjectMeta {
                name: Some("api-0".to_string()),
                namespace: Some("prod".to_string()),
                creation_timestamp: Some(Time(
                    k8s_openapi::jiff::Timestamp::from_second(NOW - 7_200).expect("timestamp"),
                )),
                ..ObjectMeta::default()
            },
            spec: Some(PodSpec {
                containers,
                node_name: Some("node-a".to_string()),
                ..PodSpec::default()
            }),
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                pod_ip: Some("10.0.0.7".to_string()),
                container_statuses: Some(statuses),
                ..PodStatus::default()
            }),
        }
    }

    fn waiting(reason: &str) -> Option<ContainerState> {
        Some(ContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: Some(reason.to_string()),
                ..ContainerStateWaiting::default()
            }),
            ..ContainerState::default()
        })
    }

    #[test]
    fn fully_ready_running_pod_is_ok() {
        let pod = pod(
            "Running",
            vec![
                container_status("app", true, 0),
                container_status("sidecar", true, 0),
                container_status("proxy", true, 0),
            ],
        );

        let record = workload_from_pod(&pod, Some((120, 64 * 1024 * 1024)), NOW);
        assert_eq!(record.key, WorkloadKey::new("prod", "api-0"));
        assert_eq!(record.ready_label(), "3/3");
        assert!(record.ready);
        assert_eq!(record.note, "[OK]");
        assert_eq!(record.containers, vec!["app", "sidecar", "proxy"]);
        assert_eq!(record.cpu_millicores, Some(120));
        assert_eq!(record.node.as_deref(), Some("node-a"));
        assert_eq!(record.ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(format_age(record.age), "2h");
        assert!(record.is_healthy());
    }

    #[test]
    fn restarts_are_summed_and_usage_stays_unknown_without_metrics() {
        let pod = pod(
            "Running",
            vec![container_status("a", true, 2), container_status("b", false, 5)],
        );

        let record = workload_from_pod(&pod, None, NOW);
        assert_eq!(record.restarts, 7);
        assert!(!record.ready);
        assert_eq!(record.cpu_millicores, None);
        assert_eq!(record.memory_bytes, None);
    }

    fn terminated(reason: &str, exit_code: i32) -> Option<ContainerState> {
        Some(ContainerState {
            terminated: Some(ContainerStateTerminated {
                reason: Some(reason.to_string()),
                exit_code,
                ..ContainerStateTerminated::default()
            }),
            ..ContainerState::default()
        })
    }

    #[test]
    fn terminated_reason_carries_non_zero_exit_code() {
        let mut crashing = container_status("app", false, 9);
        crashing.state = terminated("Error", 137);
        let pod_crashing = pod("Running", vec![crashing]);
        assert_eq!(workload_from_pod(&pod_crashing, None, NOW).note, "Error (137)");

        let mut done = container_status("app", false, 0);
        done.state = terminated("Completed", 0);
        let pod_done = pod("Running", vec![done]);
        assert_eq!(workload_from_pod(&pod_done, None, NOW).note, "Completed");
    }

    #[test]
    fn waiting_beats_terminated_within_one_container() {
        let mut restarting = container_status("app", false, 3);
        restarting.state = Some(ContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: Some("CrashLoopBackOff".to_string()),
                ..ContainerStateWaiting::default()
            }),
            terminated: Some(ContainerStateTerminated {
                reason: Some("Error".to_string()),
                exit_code: 1,
                ..ContainerStateTerminated::default()
            }),
            ..ContainerState::default()
        });
        let pod = pod("Running", vec![restarting]);
        assert_eq!(workload_from_pod(&pod, None, NOW).note, "CrashLoopBackOff");
    }

    #[test]
    fn last_container_with_a_reason_wins() {
        let mut crashing = container_status("app", false, 9);
        crashing.state = terminated("Error", 137);
        let mut backoff = container_status("init", false, 0);
        backoff.state = waiting("CrashLoopBackOff");
        let healthy = container_status("proxy", true, 0);

        let pod_backoff_last = pod("Running", vec![crashing.clone(), backoff.clone(), healthy]);
        assert_eq!(
            workload_from_pod(&pod_backoff_last, None, NOW).note,
            "CrashLoopBackOff"
        );

        let pod_error_last = pod("Running", vec![backoff, crashing]);
        assert_eq!(workload_from_pod(&pod_error_last, None, NOW).note, "Error (137)");
    }

    #[test]
    fn succeeded_pod_is_ready_and_completed() {
        let pod = pod("Succeeded", vec![container_status("job", false, 0)]);
        let record = workload_from_pod(&pod, None, NOW);
        assert!(record.ready);
        assert_eq!(record.note, "Completed");
        assert!(record.is_healthy());
    }

    #[test]
    fn pending_pod_falls_back_to_condition_reason() {
        let mut pod = pod("Pending", Vec::new());
        if let Some(status) = pod.status.as_mut() {
            status.conditions = Some(vec![PodCondition {
                type_: "PodScheduled".to_string(),
                status: "False".to_string(),
                reason: Some("Unschedulable".to_string()),
                ..PodCondition::default()
            }]);
        }

        let record = workload_from_pod(&pod, None, NOW);
        assert_eq!(record.ready_label(), "0/0");
        assert!(!record.ready);
        assert_eq!(record.note, "Unschedulable");
    }

    #[test]
    fn first_declared_port_is_used() {
        let mut pod = pod("Running", vec![container_status("web", true, 0)]);
        if let Some(spec) = pod.spec.as_mut() {
            spec.containers[0].ports = Some(vec![
                ContainerPort {
                    container_port: 3000,
                    ..ContainerPort::default()
                },
                ContainerPort {
                    container_port: 9090,
                    ..ContainerPort::default()
                },
            ]);
        }
        assert_eq!(workload_from_pod(&pod, None, NOW).port, Some(3000));
    }

    #[test]
    fn warning_events_are_filtered_and_newest_first() {
        let event = |type_: &str, reason: &str, at: i64| Event {
            type_: Some(type_.to_string()),
            reason: Some(reason.to_string()),
            message: Some(format!("{reason} happened ")),
            involved_object: ObjectReference::default(),
            last_timestamp: Some(Time(
                k8s_openapi::jiff::Timestamp::from_second(at).expect("timestamp"),
            )),
            ..Event::default()
        };

        let events = warning_events_newest_first(vec![
            event("Warning", "BackOff", NOW - 60),
            event("Normal", "Pulled", NOW - 10),
            event("Warning", "FailedMount", NOW - 5),
        ]);
        assert_eq!(
            events,
            vec![
                PodEvent {
                    reason: "FailedMount".to_string(),
                    message: "FailedMount happened".to_string(),
                },
                PodEvent {
                    reason: "BackOff".to_string(),
                    message: "BackOff happened".to_string(),
                },
            ]
        );
    }

    #[test]
    fn parses_quantities() {
        assert_eq!(parse_cpu_millicores("250m"), Some(250));
        assert_eq!(parse_cpu_millicores("2"), Some(2000));
        assert_eq!(parse_cpu_millicores("1500000n"), Some(2));
        assert_eq!(parse_cpu_millicores(""), None);
        assert_eq!(parse_memory_bytes("128Mi"), Some(134_217_728));
        assert_eq!(parse_memory_bytes("1G"), Some(1_000_000_000));
        assert_eq!(parse_memory_bytes("2048"), Some(2048));
        assert_eq!(parse_memory_bytes("garbage"), None);
    }

    #[test]
    fn sums_pod_metrics_across_containers() {
        let data = json!({
            "containers": [
                {"name": "a", "usage": {"cpu": "100m", "memory": "10Mi"}},
                {"name": "b", "usage": {"cpu": "50m", "memory": "6Mi"}}
            ]
        });
        assert_eq!(parse_pod_metrics_usage(&data), (150, 16 * 1024 * 1024));
        assert_eq!(parse_pod_metrics_usage(&json!({})), (0, 0));
    }

    #[test]
    fn formats_age_units() {
        assert_eq!(format_age(None), "-");
        assert_eq!(format_age(Some(Duration::from_secs(42))), "42s");
        assert_eq!(format_age(Some(Duration::from_secs(90))), "1m");
        assert_eq!(format_age(Some(Duration::from_secs(3 * 86_400))), "3d");
    }
}
