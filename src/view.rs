use crate::model::{Phase, RowClass, SortMode, ViewFilterConfig, WorkloadRecord};
use std::cmp::Ordering;
use std::ops::Range;

/// Rows used by chrome around the workload table (header, context bar,
/// table borders, column header, footer).
const TABLE_CHROME_ROWS: u16 = 7;
const MIN_PAGE_CAPACITY: usize = 5;

/// Filters and orders a snapshot. The output is always an ordered subset of
/// `records`.
pub fn visible_workloads(
    records: &[WorkloadRecord],
    config: &ViewFilterConfig,
) -> Vec<WorkloadRecord> {
    let needle = config.search.to_lowercase();
    let mut visible = records
        .iter()
        .filter(|record| config.namespace.matches(&record.key.namespace))
        .filter(|record| !config.issues_only || !record.is_healthy())
        .filter(|record| needle.is_empty() || record.key.name.to_lowercase().contains(&needle))
        .cloned()
        .collect::<Vec<_>>();
    sort_workloads(&mut visible, config.sort);
    visible
}

/// Stable sort. Usage ties fall back to the default order.
pub fn sort_workloads(records: &mut [WorkloadRecord], mode: SortMode) {
    records.sort_by(default_order);
    match mode {
        SortMode::Cpu => records.sort_by(|left, right| {
            right
                .cpu_millicores
                .unwrap_or(0)
                .cmp(&left.cpu_millicores.unwrap_or(0))
        }),
        SortMode::Memory => records.sort_by(|left, right| {
            right
                .memory_bytes
                .unwrap_or(0)
                .cmp(&left.memory_bytes.unwrap_or(0))
        }),
        SortMode::Default => {}
    }
}

fn default_order(left: &WorkloadRecord, right: &WorkloadRecord) -> Ordering {
    let left_running = left.phase == Phase::Running;
    let right_running = right.phase == Phase::Running;
    left_running
        .cmp(&right_running)
        .then_with(|| left.key.name.cmp(&right.key.name))
}

pub fn page_capacity(terminal_height: u16) -> usize {
    usize::from(terminal_height.saturating_sub(TABLE_CHROME_ROWS)).max(MIN_PAGE_CAPACITY)
}

/// Window of rows to draw so that `cursor` stays on screen.
pub fn page_window(len: usize, cursor: usize, capacity: usize) -> Range<usize> {
    let capacity = capacity.max(1);
    if len <= capacity {
        return 0..len;
    }
    let start = if cursor >= capacity {
        cursor + 1 - capacity
    } else {
        0
    };
    let end = (start + capacity).min(len);
    start..end
}

pub fn clamp_cursor(cursor: usize, len: usize) -> usize {
    if len == 0 { 0 } else { cursor.min(len - 1) }
}

pub fn classify_row(record: &WorkloadRecord, selected: bool) -> RowClass {
    if selected {
        RowClass::Selected
    } else if !record.phase.is_settled() || !record.ready {
        RowClass::Error
    } else if record.restarts > 0 {
        RowClass::Warning
    } else {
        RowClass::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NamespaceScope, WorkloadKey};

    fn record(namespace: &str, name: &str, phase: Phase) -> WorkloadRecord {
        WorkloadRecord {
            key: WorkloadKey::new(namespace, name),
            ready_count: 1,
            total: 1,
            ready: true,
            phase,
            ..WorkloadRecord::default()
        }
    }

    fn with_cpu(mut record: WorkloadRecord, cpu: Option<u64>) -> WorkloadRecord {
        record.cpu_millicores = cpu;
        record
    }

    fn names(records: &[WorkloadRecord]) -> Vec<&str> {
        records.iter().map(|record| record.key.name.as_str()).collect()
    }

    #[test]
    fn filters_compose_as_conjunction() {
        let mut crashing = record("prod", "api-crash", Phase::Running);
        crashing.restarts = 3;
        let records = vec![
            record("prod", "api-ok", Phase::Running),
            crashing,
            record("dev", "api-pending", Phase::Pending),
            record("prod", "worker", Phase::Pending),
        ];
        let config = ViewFilterConfig {
            namespace: NamespaceScope::Named("prod".to_string()),
            issues_only: true,
            search: "API".to_string(),
            sort: SortMode::Default,
        };

        let visible = visible_workloads(&records, &config);
        assert_eq!(names(&visible), vec!["api-crash"]);
    }

    #[test]
    fn issues_only_keeps_everything_not_fully_healthy() {
        let mut not_ready = record("a", "not-ready", Phase::Running);
        not_ready.ready = false;
        let mut restarted = record("a", "restarted", Phase::Succeeded);
        restarted.restarts = 1;
        let records = vec![
            record("a", "healthy", Phase::Running),
            record("a", "done", Phase::Succeeded),
            not_ready,
            restarted,
            record("a", "failed", Phase::Failed),
            record("a", "unknown", Phase::Unknown),
        ];
        let config = ViewFilterConfig {
            issues_only: true,
            ..ViewFilterConfig::default()
        };

        let visible = visible_workloads(&records, &config);
        assert_eq!(
            names(&visible),
            vec!["failed", "restarted", "unknown", "not-ready"]
        );
    }

    #[test]
    fn empty_search_matches_everything() {
        let records = vec![
            record("a", "one", Phase::Running),
            record("b", "two", Phase::Running),
        ];
        assert_eq!(
            visible_workloads(&records, &ViewFilterConfig::default()).len(),
            2
        );
    }

    #[test]
    fn search_term_is_matched_verbatim() {
        let records = vec![
            record("a", "api server", Phase::Running),
            record("a", "worker", Phase::Running),
        ];
        let spaces = ViewFilterConfig {
            search: " ".to_string(),
            ..ViewFilterConfig::default()
        };
        assert_eq!(names(&visible_workloads(&records, &spaces)), vec!["api server"]);

        let padded = ViewFilterConfig {
            search: " worker".to_string(),
            ..ViewFilterConfig::default()
        };
        assert!(visible_workloads(&records, &padded).is_empty());
    }

    #[test]
    fn default_sort_puts_non_running_first_then_name() {
        let records = vec![
            record("a", "zeta", Phase::Running),
            record("a", "beta", Phase::Pending),
            record("a", "alpha", Phase::Running),
            record("a", "omega", Phase::Failed),
        ];
        let visible = visible_workloads(&records, &ViewFilterConfig::default());
        assert_eq!(names(&visible), vec!["beta", "omega", "alpha", "zeta"]);
    }

    #[test]
    fn cpu_sort_is_descending_with_unknown_as_zero() {
        let records = vec![
            with_cpu(record("a", "second-100", Phase::Running), Some(100)),
            with_cpu(record("a", "unknown", Phase::Running), None),
            with_cpu(record("a", "big", Phase::Running), Some(900)),
            with_cpu(record("a", "first-100", Phase::Running), Some(100)),
            with_cpu(record("a", "zero", Phase::Running), Some(0)),
        ];
        let config = ViewFilterConfig {
            sort: SortMode::Cpu,
            ..ViewFilterConfig::default()
        };

        let visible = visible_workloads(&records, &config);
        assert_eq!(
            names(&visible),
            vec!["big", "first-100", "second-100", "unknown", "zero"]
        );
        for pair in visible.windows(2) {
            assert!(pair[0].cpu_millicores.unwrap_or(0) >= pair[1].cpu_millicores.unwrap_or(0));
        }
    }

    #[test]
    fn usage_ties_fall_back_to_default_order() {
        let records = vec![
            with_cpu(record("a", "zeta", Phase::Running), Some(100)),
            with_cpu(record("b", "alpha", Phase::Running), Some(100)),
            with_cpu(record("c", "stuck", Phase::Pending), Some(100)),
            with_cpu(record("c", "busy", Phase::Running), Some(500)),
        ];

        let cpu = ViewFilterConfig {
            sort: SortMode::Cpu,
            ..ViewFilterConfig::default()
        };
        assert_eq!(
            names(&visible_workloads(&records, &cpu)),
            vec!["busy", "stuck", "alpha", "zeta"]
        );

        let memory = ViewFilterConfig {
            sort: SortMode::Memory,
            ..ViewFilterConfig::default()
        };
        assert_eq!(
            names(&visible_workloads(&records, &memory)),
            names(&visible_workloads(&records, &ViewFilterConfig::default()))
        );
    }

    #[test]
    fn sorting_twice_is_idempotent() {
        let mut records = vec![
            record("a", "c", Phase::Running),
            record("a", "a", Phase::Pending),
            record("a", "b", Phase::Running),
        ];
        for (index, record) in records.iter_mut().enumerate() {
            record.memory_bytes = Some((index as u64 % 2) * 1024);
        }
        for mode in [SortMode::Default, SortMode::Cpu, SortMode::Memory] {
            let mut once = records.clone();
            sort_workloads(&mut once, mode);
            let mut twice = once.clone();
            sort_workloads(&mut twice, mode);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn page_window_follows_cursor() {
        assert_eq!(page_window(3, 2, 5), 0..3);
        assert_eq!(page_window(20, 0, 5), 0..5);
        assert_eq!(page_window(20, 4, 5), 0..5);
        assert_eq!(page_window(20, 5, 5), 1..6);
        assert_eq!(page_window(20, 19, 5), 15..20);
        assert_eq!(page_window(0, 0, 5), 0..0);
    }

    #[test]
    fn page_window_never_exceeds_capacity_and_contains_cursor() {
        for len in 0..30 {
            for capacity in 1..8 {
                for cursor in 0..len.max(1) {
                    let window = page_window(len, cursor, capacity);
                    assert!(window.len() <= capacity);
                    if len > 0 {
                        assert!(window.contains(&cursor));
                    }
                }
            }
        }
    }

    #[test]
    fn page_capacity_has_floor() {
        assert_eq!(page_capacity(0), 5);
        assert_eq!(page_capacity(10), 5);
        assert_eq!(page_capacity(40), 33);
    }

    #[test]
    fn clamp_cursor_handles_empty_view() {
        assert_eq!(clamp_cursor(4, 0), 0);
        assert_eq!(clamp_cursor(4, 3), 2);
        assert_eq!(clamp_cursor(1, 3), 1);
    }

    #[test]
    fn row_classes_follow_health() {
        let healthy = record("a", "ok", Phase::Running);
        assert_eq!(classify_row(&healthy, false), RowClass::Ok);
        assert_eq!(classify_row(&healthy, true), RowClass::Selected);

        let mut restarted = healthy.clone();
        restarted.restarts = 2;
        assert_eq!(classify_row(&restarted, false), RowClass::Warning);

        let mut not_ready = restarted.clone();
        not_ready.ready = false;
        assert_eq!(classify_row(&not_ready, false), RowClass::Error);
        assert_eq!(
            classify_row(&record("a", "p", Phase::Pending), false),
            RowClass::Error
        );
    }
}
