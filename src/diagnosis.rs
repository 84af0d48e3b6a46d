use crate::k8s::{KubeGateway, PodEvent};
use crate::model::{Phase, WorkloadRecord};

pub const HIGH_RESTARTS: &str = "[!] High Restarts: App likely crashing on init.";
pub const PENDING: &str = "[!] Pending: Check Node Capacity / PVC.";
pub const NOT_READY: &str = "[!] Running but Not Ready: Readiness probe failed or app starting.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisReport {
    pub events: Result<Vec<PodEvent>, String>,
    pub findings: Vec<&'static str>,
    pub log_tail: Result<String, String>,
}

impl DiagnosisReport {
    pub fn render(&self) -> String {
        let mut lines = vec!["[EVENTS]".to_string()];
        match &self.events {
            Ok(events) if events.is_empty() => lines.push("No critical events.".to_string()),
            Ok(events) => lines.extend(
                events
                    .iter()
                    .map(|event| format!("* {}: {}", event.reason, event.message)),
            ),
            Err(error) => lines.push(format!("Events unavailable: {error}")),
        }

        lines.push(String::new());
        lines.push("[ANALYSIS]".to_string());
        if self.findings.is_empty() {
            lines.push("No issues detected.".to_string());
        } else {
            lines.extend(self.findings.iter().map(|finding| finding.to_string()));
        }

        lines.push(String::new());
        lines.push("[LOGS]".to_string());
        match &self.log_tail {
            Ok(logs) if logs.trim().is_empty() => lines.push("(no log output)".to_string()),
            Ok(logs) => lines.extend(logs.trim_end().lines().map(str::to_string)),
            Err(error) => lines.push(format!("Logs unavailable: {error}")),
        }

        lines.join("\n")
    }
}

/// Heuristics are independent; any combination may fire.
pub fn analyze(record: &WorkloadRecord, restart_threshold: u32) -> Vec<&'static str> {
    let mut findings = Vec::new();
    if record.restarts > restart_threshold {
        findings.push(HIGH_RESTARTS);
    }
    if record.phase == Phase::Pending {
        findings.push(PENDING);
    }
    if record.phase == Phase::Running && !record.ready {
        findings.push(NOT_READY);
    }
    findings
}

/// Events and logs are fetched concurrently; one failing never hides the
/// other.
pub async fn diagnose(
    gateway: &KubeGateway,
    record: &WorkloadRecord,
    restart_threshold: u32,
    log_tail_lines: i64,
) -> DiagnosisReport {
    let container = record.containers.first().cloned().unwrap_or_default();
    let (events, log_tail) = tokio::join!(
        gateway.warning_events(&record.key),
        gateway.pod_logs(&record.key, &container, log_tail_lines),
    );

    DiagnosisReport {
        events: events.map_err(|error| crate::compact_error(&error)),
        findings: analyze(record, restart_threshold),
        log_tail: log_tail.map_err(|error| crate::compact_error(&error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkloadKey;

    fn record(phase: Phase, ready: bool, restarts: u32) -> WorkloadRecord {
        WorkloadRecord {
            key: WorkloadKey::new("prod", "api"),
            phase,
            ready,
            restarts,
            ..WorkloadRecord::default()
        }
    }

    #[test]
    fn pending_pod_points_at_capacity() {
        let findings = analyze(&record(Phase::Pending, false, 0), 5);
        assert_eq!(findings, vec![PENDING]);
    }

    #[test]
    fn restart_threshold_is_exclusive() {
        assert!(analyze(&record(Phase::Running, true, 5), 5).is_empty());
        assert_eq!(
            analyze(&record(Phase::Running, true, 6), 5),
            vec![HIGH_RESTARTS]
        );
    }

    #[test]
    fn heuristics_fire_together() {
        let findings = analyze(&record(Phase::Running, false, 12), 5);
        assert_eq!(findings, vec![HIGH_RESTARTS, NOT_READY]);
    }

    #[test]
    fn render_degrades_only_the_failed_section() {
        let report = DiagnosisReport {
            events: Err("forbidden".to_string()),
            findings: vec![PENDING],
            log_tail: Ok("line one\nline two\n".to_string()),
        };

        let text = report.render();
        assert!(text.contains("[EVENTS]\nEvents unavailable: forbidden"));
        assert!(text.contains("[ANALYSIS]\n[!] Pending"));
        assert!(text.ends_with("[LOGS]\nline one\nline two"));
    }

    #[test]
    fn render_lists_events_in_order() {
        let report = DiagnosisReport {
            events: Ok(vec![
                PodEvent {
                    reason: "BackOff".to_string(),
                    message: "Back-off restarting failed container".to_string(),
                },
                PodEvent {
                    reason: "Unhealthy".to_string(),
                    message: "Readiness probe failed".to_string(),
                },
            ]),
            findings: Vec::new(),
            log_tail: Err("container not found".to_string()),
        };

        let text = report.render();
        assert!(text.starts_with(
            "[EVENTS]\n* BackOff: Back-off restarting failed container\n* Unhealthy: Readiness probe failed"
        ));
        assert!(text.contains("No issues detected."));
        assert!(text.contains("Logs unavailable: container not found"));
    }

    #[test]
    fn no_events_reads_as_no_critical_events() {
        let report = DiagnosisReport {
            events: Ok(Vec::new()),
            findings: Vec::new(),
            log_tail: Ok(String::new()),
        };
        assert!(report.render().contains("No critical events."));
    }
}
