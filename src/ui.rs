use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use crate::app::{App, InputMode, PendingAction, PendingOp, Session, Viewer, ViewerKind};
use crate::k8s::format_age;
use crate::model::{RowClass, WorkloadRecord};
use crate::view;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ORANGE: Color = Color::Rgb(251, 146, 60);
const ERROR: Color = Color::Rgb(248, 113, 113);
const SELECTED_BG: Color = Color::Rgb(24, 36, 58);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const PL_D: Color = Color::Rgb(82, 24, 124);

const HEADERS: [&str; 11] = [
    "NAMESPACE", "NAME", "FWD", "READY", "STATUS", "RST", "CPU", "MEM", "NODE", "AGE", "NOTES",
];

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_context_bar(frame, root[1], app);
    match app.session() {
        Session::Viewer(viewer) => render_viewer(frame, root[2], viewer),
        _ => render_table(frame, root[2], app),
    }
    render_footer(frame, root[3], app);

    match app.session() {
        Session::ContainerPicker(pending) => render_container_picker(frame, pending),
        Session::DeleteConfirm(record) => render_confirm(
            frame,
            "Delete",
            format!("Delete pod {}? (y/n)", record.key),
        ),
        Session::RestartConfirm(record) => render_confirm(
            frame,
            "Restart",
            format!(
                "Restart {}? The pod is deleted and recreated by its controller. (y/n)",
                record.key
            ),
        ),
        Session::CleanseConfirm(namespace) => render_confirm(
            frame,
            "Cleanse",
            format!("DELETE ALL PODS IN '{namespace}'? (y/n)"),
        ),
        Session::List | Session::Viewer(_) => {}
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " 󰠳 KUBE-PULSE ", Color::White, PL_A, PL_B);

    let (nodes, cpu, memory) = match app.summary() {
        Some(summary) => (
            summary.node_count.to_string(),
            format_percent(summary.cpu_percent()),
            format_percent(summary.memory_percent()),
        ),
        None => ("-".to_string(), "-".to_string(), "-".to_string()),
    };
    push_powerline_segment(
        &mut spans,
        format!(" Nodes: {nodes} "),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment(
        &mut spans,
        format!(" CPU: {cpu} | MEMORY: {memory} "),
        Color::White,
        PL_C,
        PL_D,
    );
    let refreshed = app
        .last_refresh()
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    push_powerline_segment(
        &mut spans,
        format!(" 󰑓 {refreshed} "),
        Color::White,
        PL_D,
        BG,
    );
    if app.active_forwards() > 0 {
        spans.push(Span::styled(
            format!("  ● {} forward(s)", app.active_forwards()),
            Style::default().fg(ACCENT),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn render_context_bar(frame: &mut Frame, area: Rect, app: &App) {
    let filter = app.filter();
    let mut spans = vec![
        Span::styled(" Namespace: ", Style::default().fg(MUTED)),
        Span::styled(
            filter.namespace.label(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
    ];

    match app.selected() {
        Some(record) => {
            let port = record
                .port
                .map(|port| port.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            for (label, value) in [
                ("NODE", record.node.as_deref().unwrap_or("N/A")),
                ("IP", record.ip.as_deref().unwrap_or("N/A")),
                ("PORT", port.as_str()),
            ] {
                spans.push(Span::styled(format!(" | {label}: "), Style::default().fg(MUTED)));
                spans.push(Span::styled(value.to_string(), Style::default().fg(Color::White)));
            }
        }
        None => spans.push(Span::styled(
            " | No pods found.",
            Style::default().fg(WARN),
        )),
    }

    spans.push(Span::styled(
        format!(
            " | {}/{} pods | sort: {}",
            app.visible().len(),
            app.total_workloads(),
            filter.sort.title()
        ),
        Style::default().fg(MUTED),
    ));
    if filter.issues_only {
        spans.push(Span::styled(" | issues only", Style::default().fg(WARN)));
    }
    if !filter.search.is_empty() && !app.search_active() {
        spans.push(Span::styled(
            format!(" | search: {}", compact_text(&filter.search, 24)),
            Style::default().fg(WARN),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(PANEL)),
        area,
    );
}

fn render_table(frame: &mut Frame, area: Rect, app: &App) {
    let window = app.page_window();
    let start = window.start;
    let rows = app.visible()[window.clone()]
        .iter()
        .enumerate()
        .map(|(offset, record)| {
            let selected = start + offset == app.cursor();
            let class = view::classify_row(record, selected);
            table_row(record, app.forward_port(&record.key)).style(row_style(class))
        })
        .collect::<Vec<_>>();

    let header_row = Row::new(HEADERS.iter().map(|header| {
        Cell::from(*header).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .bottom_margin(1)
    .style(Style::default().fg(ACCENT));

    let block = Block::default()
        .title(format!(
            " Pods ({}) {}-{} ",
            app.visible().len(),
            if window.is_empty() { 0 } else { start + 1 },
            window.end
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));

    let table = Table::new(rows, column_widths())
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(row_style(RowClass::Selected))
        .highlight_symbol("| ");

    let mut state = TableState::default();
    if !window.is_empty() {
        state.select(Some(app.cursor().saturating_sub(start)));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn table_row(record: &WorkloadRecord, forward_port: Option<u16>) -> Row<'static> {
    let forward = forward_port
        .map(|port| format!("● {port}"))
        .unwrap_or_default();
    Row::new(vec![
        Cell::from(compact_text(&record.key.namespace, 16)),
        Cell::from(compact_text(&record.key.name, 40)),
        Cell::from(forward).style(Style::default().fg(ACCENT)),
        Cell::from(record.ready_label()),
        Cell::from(record.phase.label()),
        Cell::from(record.restarts.to_string()),
        Cell::from(record.cpu_label()),
        Cell::from(record.memory_label()),
        Cell::from(compact_text(record.node.as_deref().unwrap_or("-"), 18)),
        Cell::from(format_age(record.age)),
        Cell::from(compact_text(&record.note, 40)),
    ])
}

fn row_style(class: RowClass) -> Style {
    match class {
        RowClass::Ok => Style::default().fg(Color::White),
        RowClass::Warning => Style::default().fg(ORANGE),
        RowClass::Error => Style::default().fg(ERROR),
        RowClass::Selected => Style::default()
            .bg(SELECTED_BG)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    }
}

fn column_widths() -> [Constraint; 11] {
    [
        Constraint::Length(16),
        Constraint::Min(20),
        Constraint::Length(7),
        Constraint::Length(5),
        Constraint::Length(9),
        Constraint::Length(4),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(14),
        Constraint::Length(5),
        Constraint::Min(12),
    ]
}

fn render_viewer(frame: &mut Frame, area: Rect, viewer: &Viewer) {
    let text = match viewer.kind {
        _ if viewer.loading => Text::from(Line::styled(
            viewer.text.clone(),
            Style::default().fg(MUTED),
        )),
        ViewerKind::Manifest => highlight_yaml_text(&viewer.text),
        ViewerKind::Diagnosis => highlight_diagnosis_text(&viewer.text),
        ViewerKind::Logs => Text::from(viewer.text.clone()),
    };
    let block = Block::default()
        .title(format!(" {} ", viewer.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));
    let scroll = u16::try_from(viewer.scroll).unwrap_or(u16::MAX);
    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    frame.render_widget(paragraph, area);
}

fn render_container_picker(frame: &mut Frame, pending: &PendingAction) {
    let area = centered_rect(50, 40, frame.area());
    frame.render_widget(Clear, area);

    let purpose = match pending.op {
        PendingOp::ViewLogs => "logs",
        PendingOp::OpenShell => "shell",
    };
    let rows = pending
        .containers
        .iter()
        .map(|container| Row::new(vec![Cell::from(container.clone())]))
        .collect::<Vec<_>>();
    let table = Table::new(rows, [Constraint::Percentage(100)])
        .block(
            Block::default()
                .title(format!(
                    " {} · container for {purpose} ",
                    compact_text(&pending.target.key.name, 32)
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White))
        .row_highlight_style(row_style(RowClass::Selected))
        .highlight_symbol("> ");

    let mut state = TableState::default();
    state.select(Some(pending.cursor));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_confirm(frame: &mut Frame, title: &str, prompt: String) {
    let area = centered_rect(60, 40, frame.area());
    frame.render_widget(Clear, area);

    let modal = Paragraph::new(vec![
        Line::from(""),
        Line::styled(prompt, Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::styled("y confirm   n/esc cancel", Style::default().fg(MUTED)),
    ])
    .wrap(Wrap { trim: false })
    .centered()
    .block(
        Block::default()
            .title(format!(" {title} "))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(ERROR))
            .style(Style::default().bg(PANEL)),
    )
    .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    if app.search_active() {
        let line = Line::from(vec![
            Span::styled(
                " / ",
                Style::default()
                    .fg(Color::Black)
                    .bg(WARN)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {}█", app.filter().search),
                Style::default().fg(Color::White),
            ),
        ]);
        frame.render_widget(Paragraph::new(line).style(Style::default().bg(BG)), area);
        return;
    }

    let mut spans = Vec::new();
    let status = app.status();
    push_powerline_segment(
        &mut spans,
        format!(" {} {} ", footer_status_icon(status), compact_text(status, 80)),
        Color::White,
        PL_B,
        BG,
    );
    spans.push(Span::styled(
        format!(" {}", key_hints(app.input_mode())),
        Style::default().fg(MUTED),
    ));

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

fn key_hints(mode: InputMode) -> &'static str {
    match mode {
        InputMode::List => {
            "↑↓ move  / search  tab issues  n ns  c/m sort  ⏎ logs  s shell  ? diag  y yaml  f fwd  r restart  d delete  C cleanse  q quit"
        }
        InputMode::Search => "⏎/esc finish",
        InputMode::Picker => "↑↓ choose  ⏎ select  esc cancel",
        InputMode::Confirm => "y confirm  n cancel",
        InputMode::Viewer => "↑↓ pgup/pgdn scroll  g/G top/bottom  esc back",
    }
}

fn footer_status_icon(status_text: &str) -> &'static str {
    let status = status_text.to_ascii_lowercase();
    let has_failure = [
        "failed",
        "fail:",
        "error",
        "unavailable",
        "cannot",
        "refused",
        "forbidden",
    ]
    .iter()
    .any(|needle| status.contains(needle));
    if has_failure { "󰅚" } else { "󰄬" }
}

fn format_percent(value: Option<f64>) -> String {
    value
        .map(|percent| format!("{percent:.0}%"))
        .unwrap_or_else(|| "-".to_string())
}

fn highlight_diagnosis_text(input: &str) -> Text<'static> {
    let lines = input
        .lines()
        .map(|line| {
            let style = if line.starts_with('[') && line.ends_with(']') {
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
            } else if line.starts_with("[!]") {
                Style::default().fg(WARN)
            } else if line.starts_with("* ") {
                Style::default().fg(ERROR)
            } else {
                Style::default().fg(Color::White)
            };
            Line::styled(line.to_string(), style)
        })
        .collect::<Vec<_>>();
    Text::from(lines)
}

fn highlight_yaml_text(input: &str) -> Text<'static> {
    let lines = input
        .lines()
        .map(highlight_yaml_line)
        .collect::<Vec<Line<'static>>>();
    Text::from(lines)
}

fn highlight_yaml_line(line: &str) -> Line<'static> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ')
        .count();
    let (indent, trimmed) = line.split_at(indent_len);

    let mut spans = vec![Span::raw(indent.to_string())];
    if let Some(rest) = trimmed.strip_prefix("- ") {
        spans.push(Span::styled("- ", Style::default().fg(ACCENT)));
        spans.extend(highlight_yaml_content(rest));
    } else {
        spans.extend(highlight_yaml_content(trimmed));
    }
    Line::from(spans)
}

fn highlight_yaml_content(content: &str) -> Vec<Span<'static>> {
    let Some((key, value)) = content
        .split_once(':')
        .filter(|(key, _)| !key.is_empty() && !key.contains(' '))
    else {
        return vec![Span::styled(
            content.to_string(),
            Style::default().fg(Color::White),
        )];
    };

    let mut spans = vec![
        Span::styled(key.to_string(), Style::default().fg(Color::Rgb(103, 232, 249))),
        Span::styled(":", Style::default().fg(MUTED)),
    ];
    if !value.trim().is_empty() {
        spans.push(Span::styled(
            value.to_string(),
            Style::default().fg(Color::Rgb(147, 197, 253)),
        ));
    }
    spans
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
