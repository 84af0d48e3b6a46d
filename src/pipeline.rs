use crate::config::Settings;
use crate::diagnosis::{self, DiagnosisReport};
use crate::k8s::KubeGateway;
use crate::kubectl;
use crate::model::{ClusterSummary, WorkloadKey, WorkloadRecord};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Results of background work, delivered to the event loop in completion
/// order. Snapshot results carry the sequence number of the refresh cycle that
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Workloads {
        seq: u64,
        result: Result<Vec<WorkloadRecord>, String>,
    },
    Summary {
        seq: u64,
        result: Result<ClusterSummary, String>,
    },
    Namespaces {
        seq: u64,
        result: Result<Vec<String>, String>,
    },
    Logs {
        key: WorkloadKey,
        container: String,
        result: Result<String, String>,
    },
    Diagnosis {
        key: WorkloadKey,
        report: DiagnosisReport,
    },
    Manifest {
        key: WorkloadKey,
        result: Result<String, String>,
    },
    ActionFinished {
        message: String,
        ok: bool,
    },
}

/// Spawns fire-and-forget fetch tasks. Nothing is cancelled; late results are
/// still delivered.
pub struct Pipeline {
    gateway: KubeGateway,
    tx: UnboundedSender<FetchEvent>,
    seq: u64,
    kubeconfig: Option<PathBuf>,
    log_tail_lines: i64,
    diagnosis_tail_lines: i64,
    restart_threshold: u32,
}

impl Pipeline {
    pub fn new(gateway: KubeGateway, tx: UnboundedSender<FetchEvent>, settings: &Settings) -> Self {
        Self {
            gateway,
            tx,
            seq: 0,
            kubeconfig: settings.kubeconfig.clone(),
            log_tail_lines: settings.log_tail_lines,
            diagnosis_tail_lines: settings.diagnosis_tail_lines,
            restart_threshold: settings.restart_threshold,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn refresh_all(&mut self) {
        let seq = self.next_seq();
        debug!(seq, "refresh cycle");
        self.spawn_workloads(seq);

        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = gateway
                .cluster_summary()
                .await
                .map_err(|error| crate::compact_error(&error));
            send(&tx, FetchEvent::Summary { seq, result });
        });

        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = gateway
                .list_namespaces()
                .await
                .map_err(|error| crate::compact_error(&error));
            send(&tx, FetchEvent::Namespaces { seq, result });
        });
    }

    pub fn refresh_workloads(&mut self) {
        let seq = self.next_seq();
        self.spawn_workloads(seq);
    }

    fn spawn_workloads(&self, seq: u64) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = gateway
                .list_workloads()
                .await
                .map_err(|error| crate::compact_error(&error));
            send(&tx, FetchEvent::Workloads { seq, result });
        });
    }

    pub fn load_logs(&self, key: WorkloadKey, container: String) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        let tail = self.log_tail_lines;
        tokio::spawn(async move {
            let result = gateway
                .pod_logs(&key, &container, tail)
                .await
                .map_err(|error| crate::compact_error(&error));
            send(
                &tx,
                FetchEvent::Logs {
                    key,
                    container,
                    result,
                },
            );
        });
    }

    pub fn diagnose(&self, record: WorkloadRecord) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        let threshold = self.restart_threshold;
        let tail = self.diagnosis_tail_lines;
        tokio::spawn(async move {
            let report = diagnosis::diagnose(&gateway, &record, threshold, tail).await;
            send(
                &tx,
                FetchEvent::Diagnosis {
                    key: record.key,
                    report,
                },
            );
        });
    }

    pub fn load_manifest(&self, key: WorkloadKey) {
        let tx = self.tx.clone();
        let kubeconfig = self.kubeconfig.clone();
        tokio::spawn(async move {
            let result = kubectl::fetch_manifest(kubeconfig.as_ref(), &key)
                .await
                .map_err(|error| crate::compact_error(&error));
            send(&tx, FetchEvent::Manifest { key, result });
        });
    }

    /// Restart is a delete; the owning controller recreates the pod.
    pub fn delete(&self, key: WorkloadKey, restart: bool) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match gateway.delete_pod(&key).await {
                Ok(()) if restart => FetchEvent::ActionFinished {
                    message: format!("Restarting {} (pod deleted).", key.name),
                    ok: true,
                },
                Ok(()) => FetchEvent::ActionFinished {
                    message: format!("Pod {} deleted.", key.name),
                    ok: true,
                },
                Err(error) => FetchEvent::ActionFinished {
                    message: format!(
                        "{} failed: {}",
                        if restart { "Restart" } else { "Delete" },
                        crate::compact_error(&error)
                    ),
                    ok: false,
                },
            };
            send(&tx, event);
        });
    }

    pub fn cleanse(&self, namespace: String) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match gateway.delete_all_pods(&namespace).await {
                Ok(()) => FetchEvent::ActionFinished {
                    message: format!("ALL PODS IN '{namespace}' HAVE BEEN DELETED."),
                    ok: true,
                },
                Err(error) => FetchEvent::ActionFinished {
                    message: format!("Cleanse failed: {}", crate::compact_error(&error)),
                    ok: false,
                },
            };
            send(&tx, event);
        });
    }
}

fn send(tx: &UnboundedSender<FetchEvent>, event: FetchEvent) {
    if tx.send(event).is_err() {
        warn!("event loop closed before fetch result was delivered");
    }
}
