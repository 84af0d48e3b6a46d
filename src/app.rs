use crate::input::Action;
use crate::model::{
    ClusterSummary, NamespaceScope, SortMode, ViewFilterConfig, WorkloadKey, WorkloadRecord,
};
use crate::pipeline::FetchEvent;
use crate::registry::{PortMapping, ProcessRegistry, StartOutcome};
use crate::view;
use chrono::{DateTime, Local};
use std::ops::Range;
use tracing::{debug, info, warn};

const SEARCH_LIMIT: usize = 156;
const DEFAULT_REMOTE_PORT: u16 = 80;
const MAX_STATUS_LEN: usize = 180;
/// Viewer chrome: header, title bar, borders and footer.
const VIEWER_CHROME_ROWS: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    List,
    Search,
    Picker,
    Confirm,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    List,
    LogView,
    DiagnosisView,
    ManifestView,
    ContainerPicker,
    DeleteConfirm,
    RestartConfirm,
    CleanseConfirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKind {
    Logs,
    Diagnosis,
    Manifest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    ViewLogs,
    OpenShell,
}

/// Container disambiguation in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub target: WorkloadRecord,
    pub op: PendingOp,
    pub containers: Vec<String>,
    pub cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub kind: ViewerKind,
    pub key: WorkloadKey,
    pub title: String,
    pub text: String,
    pub loading: bool,
    pub scroll: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    List,
    Viewer(Viewer),
    ContainerPicker(PendingAction),
    DeleteConfirm(WorkloadRecord),
    RestartConfirm(WorkloadRecord),
    CleanseConfirm(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Input(Action),
    Tick,
    Resize { width: u16, height: u16 },
    Fetched(FetchEvent),
    ShellExited {
        key: WorkloadKey,
        error: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    RefreshAll,
    RefreshWorkloads,
    LoadLogs { key: WorkloadKey, container: String },
    Diagnose(WorkloadRecord),
    LoadManifest(WorkloadKey),
    DeleteWorkload { key: WorkloadKey, restart: bool },
    CleanseNamespace(String),
    OpenShell { key: WorkloadKey, container: String },
}

#[derive(Debug, Clone, Copy, Default)]
struct AppliedSeq {
    workloads: u64,
    summary: u64,
    namespaces: u64,
}

#[derive(Debug)]
pub struct App {
    session: Session,
    records: Vec<WorkloadRecord>,
    visible: Vec<WorkloadRecord>,
    summary: Option<ClusterSummary>,
    namespaces: Vec<NamespaceScope>,
    filter: ViewFilterConfig,
    cursor: usize,
    search_active: bool,
    status: String,
    forwards: ProcessRegistry,
    forward_base_port: u16,
    width: u16,
    height: u16,
    applied: AppliedSeq,
    last_refresh: Option<DateTime<Local>>,
    running: bool,
}

impl App {
    pub fn new(namespace: NamespaceScope, forward_base_port: u16, forwards: ProcessRegistry) -> Self {
        Self {
            session: Session::List,
            records: Vec::new(),
            visible: Vec::new(),
            summary: None,
            namespaces: vec![NamespaceScope::All],
            filter: ViewFilterConfig {
                namespace,
                ..ViewFilterConfig::default()
            },
            cursor: 0,
            search_active: false,
            status: "Loading cluster state...".to_string(),
            forwards,
            forward_base_port,
            width: 80,
            height: 24,
            applied: AppliedSeq::default(),
            last_refresh: None,
            running: true,
        }
    }

    /// Consumes the current state and returns the next one along with the
    /// side effect the event loop should perform.
    pub fn update(mut self, event: AppEvent) -> (Self, AppCommand) {
        let command = match event {
            AppEvent::Input(action) => self.apply_action(action),
            AppEvent::Tick => AppCommand::RefreshAll,
            AppEvent::Resize { width, height } => {
                self.resize(width, height);
                AppCommand::None
            }
            AppEvent::Fetched(event) => self.apply_fetch(event),
            AppEvent::ShellExited { key, error } => {
                match error {
                    Some(error) => self.set_status(format!("Shell failed: {error}")),
                    None => self.set_status(format!("Shell session for {} closed", key.name)),
                }
                AppCommand::None
            }
        };
        (self, command)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn input_mode(&self) -> InputMode {
        match &self.session {
            Session::List if self.search_active => InputMode::Search,
            Session::List => InputMode::List,
            Session::Viewer(_) => InputMode::Viewer,
            Session::ContainerPicker(_) => InputMode::Picker,
            Session::DeleteConfirm(_) | Session::RestartConfirm(_) | Session::CleanseConfirm(_) => {
                InputMode::Confirm
            }
        }
    }

    pub fn state(&self) -> SessionState {
        match &self.session {
            Session::List => SessionState::List,
            Session::Viewer(viewer) => match viewer.kind {
                ViewerKind::Logs => SessionState::LogView,
                ViewerKind::Diagnosis => SessionState::DiagnosisView,
                ViewerKind::Manifest => SessionState::ManifestView,
            },
            Session::ContainerPicker(_) => SessionState::ContainerPicker,
            Session::DeleteConfirm(_) => SessionState::DeleteConfirm,
            Session::RestartConfirm(_) => SessionState::RestartConfirm,
            Session::CleanseConfirm(_) => SessionState::CleanseConfirm,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn visible(&self) -> &[WorkloadRecord] {
        &self.visible
    }

    pub fn total_workloads(&self) -> usize {
        self.records.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selected(&self) -> Option<&WorkloadRecord> {
        self.visible.get(self.cursor)
    }

    pub fn page_window(&self) -> Range<usize> {
        view::page_window(self.visible.len(), self.cursor, self.page_capacity())
    }

    pub fn page_capacity(&self) -> usize {
        view::page_capacity(self.height)
    }

    pub fn filter(&self) -> &ViewFilterConfig {
        &self.filter
    }

    pub fn search_active(&self) -> bool {
        self.search_active
    }

    pub fn summary(&self) -> Option<&ClusterSummary> {
        self.summary.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn last_refresh(&self) -> Option<DateTime<Local>> {
        self.last_refresh
    }

    pub fn forward_port(&self, key: &WorkloadKey) -> Option<u16> {
        self.forwards.local_port(key)
    }

    pub fn active_forwards(&self) -> usize {
        self.forwards.len()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
    }

    /// Stops every tracked port-forward. Only the first call reaches the
    /// registry; later calls return 0.
    pub fn shutdown(&mut self) -> usize {
        if !self.running {
            return 0;
        }
        self.running = false;
        let stopped = self.forwards.stop_all();
        if stopped > 0 {
            info!(stopped, "stopped port-forwards");
        }
        stopped
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cursor = view::clamp_cursor(self.cursor, self.visible.len());
        let (viewer_height, viewer_width) = self.viewer_dims();
        if let Session::Viewer(viewer) = &mut self.session {
            viewer.scroll = viewer
                .scroll
                .min(max_scroll(&viewer.text, viewer_width, viewer_height));
        }
    }

    fn viewer_dims(&self) -> (usize, usize) {
        let height = usize::from(self.height.saturating_sub(VIEWER_CHROME_ROWS)).max(1);
        let width = usize::from(self.width.saturating_sub(2)).max(1);
        (height, width)
    }

    fn apply_action(&mut self, action: Action) -> AppCommand {
        if action == Action::Quit {
            self.quit();
            return AppCommand::None;
        }

        debug!(?action, state = ?self.state(), "action");
        match self.input_mode() {
            InputMode::List => self.apply_list_action(action),
            InputMode::Search => {
                self.apply_search_action(action);
                AppCommand::None
            }
            InputMode::Picker => self.apply_picker_action(action),
            InputMode::Confirm => self.apply_confirm_action(action),
            InputMode::Viewer => {
                self.apply_viewer_action(action);
                AppCommand::None
            }
        }
    }

    fn quit(&mut self) {
        self.shutdown();
        self.set_status("Shutting down...");
    }

    fn apply_list_action(&mut self, action: Action) -> AppCommand {
        let page = self.page_capacity() as isize;
        match action {
            Action::Up => self.move_cursor(-1),
            Action::Down => self.move_cursor(1),
            Action::PageUp => self.move_cursor(-page),
            Action::PageDown => self.move_cursor(page),
            Action::Top => self.cursor = 0,
            Action::Bottom => self.cursor = self.visible.len().saturating_sub(1),
            Action::CycleNamespace => self.cycle_namespace(),
            Action::ToggleIssues => {
                self.filter.issues_only = !self.filter.issues_only;
                self.cursor = 0;
                self.recompute();
                self.set_status(if self.filter.issues_only {
                    "Filter: Issues Only"
                } else {
                    "Filter: Showing All"
                });
            }
            Action::StartSearch => {
                self.search_active = true;
                self.set_status("Search: type to filter, Enter/Esc to finish");
            }
            Action::SortCpu => self.set_sort(SortMode::Cpu),
            Action::SortMemory => self.set_sort(SortMode::Memory),
            Action::ViewLogs => return self.begin_container_op(PendingOp::ViewLogs),
            Action::OpenShell => return self.begin_container_op(PendingOp::OpenShell),
            Action::Diagnose => {
                let Some(record) = self.selected_or_warn() else {
                    return AppCommand::None;
                };
                self.open_viewer(ViewerKind::Diagnosis, &record.key, "Running diagnosis...");
                return AppCommand::Diagnose(record);
            }
            Action::ViewManifest => {
                let Some(record) = self.selected_or_warn() else {
                    return AppCommand::None;
                };
                self.open_viewer(ViewerKind::Manifest, &record.key, "Loading manifest...");
                return AppCommand::LoadManifest(record.key);
            }
            Action::Restart => {
                if let Some(record) = self.selected_or_warn() {
                    self.session = Session::RestartConfirm(record);
                }
            }
            Action::Delete => {
                if let Some(record) = self.selected_or_warn() {
                    self.session = Session::DeleteConfirm(record);
                }
            }
            Action::Cleanse => match &self.filter.namespace {
                NamespaceScope::All => {
                    self.set_status("⚠️ Cannot Cleanse 'ALL'. Select a namespace.");
                }
                NamespaceScope::Named(namespace) => {
                    self.session = Session::CleanseConfirm(namespace.clone());
                }
            },
            Action::TogglePortForward => self.toggle_port_forward(),
            _ => {}
        }
        AppCommand::None
    }

    fn apply_search_action(&mut self, action: Action) {
        match action {
            Action::InputChar(c) => {
                if self.filter.search.chars().count() < SEARCH_LIMIT {
                    self.filter.search.push(c);
                    self.cursor = 0;
                    self.recompute();
                }
            }
            Action::Backspace => {
                if self.filter.search.pop().is_some() {
                    self.cursor = 0;
                    self.recompute();
                }
            }
            Action::Submit | Action::Cancel => {
                self.search_active = false;
                if self.filter.search.is_empty() {
                    self.set_status("Search cleared");
                } else {
                    self.set_status(format!("Search: {}", self.filter.search));
                }
            }
            _ => {}
        }
    }

    fn apply_picker_action(&mut self, action: Action) -> AppCommand {
        let Session::ContainerPicker(pending) = &mut self.session else {
            return AppCommand::None;
        };

        match action {
            Action::Up => {
                pending.cursor = pending.cursor.saturating_sub(1);
                AppCommand::None
            }
            Action::Down => {
                pending.cursor = view::clamp_cursor(pending.cursor + 1, pending.containers.len());
                AppCommand::None
            }
            Action::Submit => {
                let Session::ContainerPicker(pending) =
                    std::mem::replace(&mut self.session, Session::List)
                else {
                    return AppCommand::None;
                };
                let container = pending
                    .containers
                    .get(pending.cursor)
                    .cloned()
                    .unwrap_or_default();
                self.run_container_op(pending.op, &pending.target, container)
            }
            Action::Cancel => {
                self.session = Session::List;
                self.set_status("Cancelled");
                AppCommand::None
            }
            _ => AppCommand::None,
        }
    }

    fn apply_confirm_action(&mut self, action: Action) -> AppCommand {
        let confirmed = match action {
            Action::ConfirmYes => true,
            Action::ConfirmNo => false,
            _ => return AppCommand::None,
        };

        match std::mem::replace(&mut self.session, Session::List) {
            Session::DeleteConfirm(record) if confirmed => {
                self.set_status(format!("Deleting {}...", record.key.name));
                AppCommand::DeleteWorkload {
                    key: record.key,
                    restart: false,
                }
            }
            Session::DeleteConfirm(_) => {
                self.set_status("Delete cancelled.");
                AppCommand::None
            }
            Session::RestartConfirm(record) if confirmed => {
                self.set_status(format!("Restarting {}...", record.key.name));
                AppCommand::DeleteWorkload {
                    key: record.key,
                    restart: true,
                }
            }
            Session::RestartConfirm(_) => {
                self.set_status("Restart cancelled.");
                AppCommand::None
            }
            Session::CleanseConfirm(namespace) if confirmed => {
                self.set_status(format!("Cleansing namespace {namespace}..."));
                AppCommand::CleanseNamespace(namespace)
            }
            Session::CleanseConfirm(_) => {
                self.set_status("Cleanse cancelled.");
                AppCommand::None
            }
            other => {
                self.session = other;
                AppCommand::None
            }
        }
    }

    fn apply_viewer_action(&mut self, action: Action) {
        let (viewer_height, viewer_width) = self.viewer_dims();
        let Session::Viewer(viewer) = &mut self.session else {
            return;
        };
        let max = max_scroll(&viewer.text, viewer_width, viewer_height);
        let page = viewer_height;

        match action {
            Action::Cancel => {
                self.session = Session::List;
                self.set_status("Dashboard");
            }
            Action::Up => viewer.scroll = viewer.scroll.saturating_sub(1),
            Action::Down => viewer.scroll = (viewer.scroll + 1).min(max),
            Action::PageUp => viewer.scroll = viewer.scroll.saturating_sub(page),
            Action::PageDown => viewer.scroll = (viewer.scroll + page).min(max),
            Action::Top => viewer.scroll = 0,
            Action::Bottom => viewer.scroll = max,
            _ => {}
        }
    }

    fn begin_container_op(&mut self, op: PendingOp) -> AppCommand {
        let Some(record) = self.selected_or_warn() else {
            return AppCommand::None;
        };

        if record.containers.len() > 1 {
            self.session = Session::ContainerPicker(PendingAction {
                containers: record.containers.clone(),
                target: record,
                op,
                cursor: 0,
            });
            self.set_status("Select a container");
            return AppCommand::None;
        }

        let container = record.containers.first().cloned().unwrap_or_default();
        self.run_container_op(op, &record, container)
    }

    fn run_container_op(
        &mut self,
        op: PendingOp,
        record: &WorkloadRecord,
        container: String,
    ) -> AppCommand {
        match op {
            PendingOp::ViewLogs => {
                self.open_viewer(ViewerKind::Logs, &record.key, "Loading logs...");
                if let Session::Viewer(viewer) = &mut self.session
                    && !container.is_empty()
                {
                    viewer.title = format!("LOGS: {} [{container}]", record.key.name);
                }
                AppCommand::LoadLogs {
                    key: record.key.clone(),
                    container,
                }
            }
            PendingOp::OpenShell => {
                self.set_status(format!("Opening shell in {}...", record.key.name));
                AppCommand::OpenShell {
                    key: record.key.clone(),
                    container,
                }
            }
        }
    }

    fn open_viewer(&mut self, kind: ViewerKind, key: &WorkloadKey, placeholder: &str) {
        let label = match kind {
            ViewerKind::Logs => "LOGS",
            ViewerKind::Diagnosis => "DIAGNOSIS",
            ViewerKind::Manifest => "YAML",
        };
        self.session = Session::Viewer(Viewer {
            kind,
            key: key.clone(),
            title: format!("{label}: {}", key.name),
            text: placeholder.to_string(),
            loading: true,
            scroll: 0,
        });
        self.set_status("Esc/q to return");
    }

    fn selected_or_warn(&mut self) -> Option<WorkloadRecord> {
        let selected = self.selected().cloned();
        if selected.is_none() {
            self.set_status("No pod selected");
        }
        selected
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.visible.is_empty() {
            self.cursor = 0;
            return;
        }
        let max_index = self.visible.len().saturating_sub(1) as isize;
        let current = self.cursor.min(max_index as usize) as isize;
        self.cursor = (current + delta).clamp(0, max_index) as usize;
    }

    fn set_sort(&mut self, sort: SortMode) {
        self.filter.sort = sort;
        self.recompute();
        self.set_status(format!("Sort: {}", sort.title()));
    }

    fn cycle_namespace(&mut self) {
        let next = self
            .namespaces
            .iter()
            .position(|scope| *scope == self.filter.namespace)
            .map(|index| (index + 1) % self.namespaces.len())
            .unwrap_or(0);
        self.filter.namespace = self.namespaces.get(next).cloned().unwrap_or_default();
        self.filter.sort = SortMode::Default;
        self.cursor = 0;
        self.recompute();
        self.set_status(format!("Namespace: {}", self.filter.namespace));
    }

    fn toggle_port_forward(&mut self) {
        let Some(record) = self.selected_or_warn() else {
            return;
        };

        if self.forwards.stop(&record.key) {
            self.set_status(format!("Stopped forwarding {}", record.key.name));
            return;
        }

        let remote_port = record
            .port
            .and_then(|port| u16::try_from(port).ok())
            .filter(|port| *port > 0)
            .unwrap_or(DEFAULT_REMOTE_PORT);
        let local_port = self.forwards.free_local_port(self.forward_base_port);
        let mapping = PortMapping {
            local_port,
            remote_port,
        };

        match self.forwards.start(&record.key, mapping) {
            Ok(StartOutcome::Started { pid }) => {
                info!(workload = %record.key, ?pid, local_port, remote_port, "forwarding");
                self.set_status(format!("Forwarding {} -> :{local_port}", record.key.name));
            }
            Ok(StartOutcome::AlreadyActive) => {
                self.set_status(format!("Already forwarding {}", record.key.name));
            }
            Err(error) => {
                warn!(workload = %record.key, error = %format!("{error:#}"), "port-forward failed");
                self.set_status(format!("Forward fail: {}", crate::compact_error(&error)));
            }
        }
    }

    fn apply_fetch(&mut self, event: FetchEvent) -> AppCommand {
        match event {
            FetchEvent::Workloads { seq, result } => {
                note_sequence("workloads", &mut self.applied.workloads, seq);
                match result {
                    Ok(records) => {
                        self.records = records;
                        self.last_refresh = Some(Local::now());
                        self.recompute();
                    }
                    Err(error) => {
                        warn!(error = %error, "workload refresh failed");
                        self.set_status(format!("Refresh failed: {error}"));
                    }
                }
            }
            FetchEvent::Summary { seq, result } => {
                note_sequence("summary", &mut self.applied.summary, seq);
                match result {
                    Ok(summary) => self.summary = Some(summary),
                    Err(error) => {
                        warn!(error = %error, "cluster summary failed");
                        self.set_status(format!("Cluster stats unavailable: {error}"));
                    }
                }
            }
            FetchEvent::Namespaces { seq, result } => {
                note_sequence("namespaces", &mut self.applied.namespaces, seq);
                match result {
                    Ok(names) => {
                        self.namespaces = std::iter::once(NamespaceScope::All)
                            .chain(names.into_iter().map(NamespaceScope::Named))
                            .collect();
                    }
                    Err(error) => {
                        warn!(error = %error, "namespace listing failed");
                        self.set_status(format!("Namespace list unavailable: {error}"));
                    }
                }
            }
            FetchEvent::Logs {
                key,
                container,
                result,
            } => {
                let text = result.unwrap_or_else(|error| format!("Error fetching logs: {error}"));
                debug!(workload = %key, container = %container, "logs loaded");
                self.fill_viewer(ViewerKind::Logs, &key, text, true);
            }
            FetchEvent::Diagnosis { key, report } => {
                self.fill_viewer(ViewerKind::Diagnosis, &key, report.render(), false);
            }
            FetchEvent::Manifest { key, result } => {
                let text =
                    result.unwrap_or_else(|error| format!("Error fetching manifest: {error}"));
                self.fill_viewer(ViewerKind::Manifest, &key, text, false);
            }
            FetchEvent::ActionFinished { message, ok } => {
                if !ok {
                    warn!(message = %message, "action failed");
                }
                self.set_status(message);
                return AppCommand::RefreshWorkloads;
            }
        }
        AppCommand::None
    }

    /// One-shot results only land in the viewer that asked for them.
    fn fill_viewer(&mut self, kind: ViewerKind, key: &WorkloadKey, text: String, tail: bool) {
        let (viewer_height, viewer_width) = self.viewer_dims();
        let Session::Viewer(viewer) = &mut self.session else {
            debug!(workload = %key, ?kind, "dropping result for closed viewer");
            return;
        };
        if viewer.kind != kind || viewer.key != *key {
            debug!(workload = %key, ?kind, "dropping result for another viewer");
            return;
        }

        let text = if text.trim().is_empty() {
            "(empty)".to_string()
        } else {
            text
        };
        viewer.scroll = if tail {
            max_scroll(&text, viewer_width, viewer_height)
        } else {
            0
        };
        viewer.text = text;
        viewer.loading = false;
    }

    fn recompute(&mut self) {
        self.visible = view::visible_workloads(&self.records, &self.filter);
        self.cursor = view::clamp_cursor(self.cursor, self.visible.len());
    }
}

fn note_sequence(kind: &str, applied: &mut u64, seq: u64) {
    if seq < *applied {
        debug!(kind, seq, newest = *applied, "applying out-of-order refresh result");
    }
    *applied = (*applied).max(seq);
}

fn max_scroll(text: &str, width: usize, height: usize) -> usize {
    visual_line_count(text, width).saturating_sub(height)
}

fn visual_line_count(text: &str, width: usize) -> usize {
    let width = width.max(1);
    text.lines()
        .map(|line| {
            let chars = line.chars().count();
            chars.div_ceil(width).max(1)
        })
        .sum::<usize>()
        .max(1)
}

fn normalize_status_text(status: String) -> String {
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}
