//! Drawing of the dashboard frame.

use chrono::Utc;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use ratatui::Frame;

use ktop_lib::format::{format_age, format_cpu, format_memory, format_percent, truncate};
use ktop_lib::query::ViewMode;
use ktop_lib::ClusterSnapshot;

use super::state::{DashboardState, Focus};
use super::style::{
    namespace_color, node_status_color, pod_status_color, restart_color, usage_color, Styles,
};

const KEY_HINTS: &[(&str, &str)] = &[
    ("q", "uit"),
    ("r", "efresh"),
    ("s", "ort nodes"),
    ("p", "od sort"),
    ("f/n", "amespace"),
    ("t", "oggle view"),
    ("a", "ll ns"),
    ("?", "help"),
];

const HELP_LINES: &[(&str, &str)] = &[
    ("q", "Quit"),
    ("r", "Refresh now"),
    ("s", "Cycle node sort"),
    ("p", "Cycle pod sort"),
    ("f/n", "Next namespace filter"),
    ("Esc", "Clear namespace filter"),
    ("t", "Cycle view (split, nodes, pods)"),
    ("a", "Toggle system namespaces"),
    ("Tab", "Switch table focus"),
    ("↑/↓", "Move selection"),
    ("?", "Toggle this help"),
];

pub fn render(frame: &mut Frame, state: &mut DashboardState) {
    let area = frame.area();
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Min(5),
        Constraint::Length(1),
    ])
    .split(area);

    render_header(
        frame,
        chunks[0],
        state.snapshot.as_deref(),
        state.failure.as_deref(),
    );
    render_summary(frame, chunks[1], state.snapshot.as_deref());

    match state.view {
        ViewMode::Split => {
            let tables =
                Layout::vertical([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)]).split(chunks[2]);
            render_nodes(frame, tables[0], state);
            render_pods(frame, tables[1], state);
        }
        ViewMode::Nodes => render_nodes(frame, chunks[2], state),
        ViewMode::Pods => render_pods(frame, chunks[2], state),
    }

    render_footer(frame, chunks[3], state);

    if state.show_help {
        render_help(frame, area);
    }
}

/// A failed cycle replaces the usage warning; the snapshot shown is stale.
fn render_header(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&ClusterSnapshot>,
    failure: Option<&str>,
) {
    let mut spans = vec![Span::styled("ktop", Styles::title()), Span::raw(" - ")];

    match snapshot {
        None => {
            spans.push(Span::raw("Kubernetes Cluster Monitor   "));
            match failure {
                Some(failure) => spans.push(Span::styled(format!("⚠ {failure}"), Styles::error())),
                None => spans.push(Span::styled("Connecting...", Styles::error())),
            }
        }
        Some(snapshot) => {
            let age = (Utc::now() - snapshot.timestamp)
                .to_std()
                .unwrap_or_default();
            spans.push(Span::styled(snapshot.cluster.name.clone(), Styles::default()));
            spans.push(Span::styled(
                format!(" ({})", snapshot.cluster.context),
                Styles::dim(),
            ));
            spans.push(Span::raw(format!(
                "   Nodes: {}/{}",
                snapshot.totals.ready_node_count, snapshot.totals.node_count
            )));
            spans.push(Span::styled(
                format!("   Updated: {} ago", format_age(age)),
                Styles::dim(),
            ));
            if let Some(failure) = failure {
                spans.push(Span::styled(format!("  ⚠ {failure}"), Styles::error()));
            } else if let Some(warning) = &snapshot.error {
                spans.push(Span::styled(format!("  ⚠ {warning}"), Styles::error()));
            }
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn usage_spans(label: &str, used: String, capacity: String, percent: f64) -> Vec<Span<'static>> {
    let color = Style::default().fg(usage_color(percent));
    vec![
        Span::styled(format!("{label}: "), Styles::default()),
        Span::styled(used, color),
        Span::raw(format!(" / {capacity}  ")),
        Span::styled(format_percent(percent), color),
        Span::raw("   "),
    ]
}

fn render_summary(frame: &mut Frame, area: Rect, snapshot: Option<&ClusterSnapshot>) {
    let Some(snapshot) = snapshot else {
        frame.render_widget(
            Paragraph::new(Span::styled("Loading cluster resources...", Styles::dim())),
            area,
        );
        return;
    };
    let totals = &snapshot.totals;

    let mut first = usage_spans(
        "CPU",
        format_cpu(totals.cpu_used),
        format_cpu(totals.cpu_capacity),
        totals.cpu_percent(),
    );
    first.insert(
        1,
        Span::styled(format!("{} cores  ", totals.cpu_core_count), Styles::dim()),
    );
    first.extend(usage_spans(
        "RAM",
        format_memory(totals.memory_used),
        format_memory(totals.memory_capacity),
        totals.memory_percent(),
    ));
    if totals.disk_capacity > 0 {
        first.extend(usage_spans(
            "DISK",
            format_memory(totals.disk_used),
            format_memory(totals.disk_capacity),
            totals.disk_percent(),
        ));
    }
    if totals.accelerator_count > 0 {
        first.push(Span::styled("GPUs: ", Styles::default()));
        first.push(Span::styled(
            totals.accelerator_count.to_string(),
            Style::default().fg(usage_color(0.0)),
        ));
    }

    let second = Line::from(vec![
        Span::styled("Pods: ", Styles::default()),
        Span::styled(totals.workload_count.to_string(), Styles::title()),
    ]);

    frame.render_widget(Paragraph::new(vec![Line::from(first), second]), area);
}

fn sort_arrow(ascending: bool) -> &'static str {
    if ascending {
        "↑"
    } else {
        "↓"
    }
}

fn right(text: String, style: Style) -> Cell<'static> {
    Cell::from(Line::styled(text, style).alignment(Alignment::Right))
}

fn header_row(titles: &[&'static str], right_from: usize) -> Row<'static> {
    Row::new(titles.iter().enumerate().map(|(i, title)| {
        let line = Line::styled(*title, Styles::table_header());
        if i >= right_from {
            Cell::from(line.alignment(Alignment::Right))
        } else {
            Cell::from(line)
        }
    }))
}

fn empty_table(frame: &mut Frame, area: Rect, block: Block<'_>, message: &str) {
    frame.render_widget(
        Paragraph::new(Span::styled(message.to_string(), Styles::dim())).block(block),
        area,
    );
}

fn render_nodes(frame: &mut Frame, area: Rect, state: &mut DashboardState) {
    let title = format!(
        " NODES (sort: {} {}) ",
        state.node_order.field,
        sort_arrow(state.node_order.ascending)
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Styles::border(state.focus == Focus::Nodes));

    let nodes = state.sorted_nodes();
    if nodes.is_empty() {
        empty_table(frame, area, block, "No nodes found");
        return;
    }

    let rows: Vec<Row> = nodes
        .iter()
        .map(|node| {
            let cpu = Style::default().fg(usage_color(node.cpu.percent));
            let mem = Style::default().fg(usage_color(node.memory.percent));
            let gpu = node
                .accelerator
                .as_ref()
                .map_or_else(|| "-".to_string(), |a| a.count.to_string());
            Row::new(vec![
                Cell::from(Span::styled(node.name.clone(), Styles::default())),
                Cell::from(Span::styled(
                    node.status.to_string(),
                    Style::default().fg(node_status_color(node.status)),
                )),
                right(format_cpu(node.cpu.current), cpu),
                right(format_percent(node.cpu.percent), cpu),
                right(format_memory(node.memory.current), mem),
                right(format_percent(node.memory.percent), mem),
                right(node.pod_count.to_string(), Styles::default()),
                right(gpu, Styles::default()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(1),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(9),
        Constraint::Length(7),
        Constraint::Length(5),
        Constraint::Length(4),
    ];
    let table = Table::new(rows, widths)
        .header(header_row(
            &["NODE", "STATUS", "CPU", "CPU%", "MEMORY", "MEM%", "PODS", "GPU"],
            2,
        ))
        .block(block)
        .row_highlight_style(Styles::selected());

    frame.render_stateful_widget(table, area, &mut state.node_table);
}

fn render_pods(frame: &mut Frame, area: Rect, state: &mut DashboardState) {
    let pods = state.visible_pods();
    let filter = if state.namespace.is_empty() {
        "all"
    } else {
        state.namespace.as_str()
    };
    let title = format!(
        " PODS (top {} by {} {}) [filter: {}] ",
        pods.len(),
        state.pod_order.field,
        sort_arrow(state.pod_order.ascending),
        filter
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Styles::border(state.focus == Focus::Pods));

    if pods.is_empty() {
        empty_table(frame, area, block, "No pods found");
        return;
    }

    let rows: Vec<Row> = pods
        .iter()
        .map(|pod| {
            Row::new(vec![
                Cell::from(Span::styled(
                    truncate(&pod.namespace, 20),
                    Style::default().fg(namespace_color(&pod.namespace)),
                )),
                Cell::from(Span::styled(truncate(&pod.name, 40), Styles::default())),
                Cell::from(Span::styled(
                    pod.status.to_string(),
                    Style::default().fg(pod_status_color(pod.status)),
                )),
                right(format_cpu(pod.cpu), Styles::default()),
                right(format_memory(pod.memory), Styles::default()),
                right(
                    pod.restart_count.to_string(),
                    Style::default().fg(restart_color(pod.restart_count)),
                ),
                Cell::from(Span::styled(truncate(&pod.node_name, 20), Styles::dim())),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(20),
        Constraint::Fill(1),
        Constraint::Length(10),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(20),
    ];
    let table = Table::new(rows, widths)
        .header(header_row(
            &["NAMESPACE", "POD", "STATUS", "CPU", "MEMORY", "RESTARTS", "NODE"],
            3,
        ))
        .block(block)
        .row_highlight_style(Styles::selected());

    frame.render_stateful_widget(table, area, &mut state.pod_table);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let mut spans = Vec::with_capacity(KEY_HINTS.len() * 2 + 1);
    for (key, rest) in KEY_HINTS {
        spans.push(Span::styled(*key, Styles::key_hint()));
        spans.push(Span::styled(format!("{rest}  "), Styles::dim()));
    }
    if state.show_system {
        spans.push(Span::styled("[system namespaces shown]", Styles::dim()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = (HELP_LINES.len() as u16 + 4).min(area.height);
    let popup = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    );

    let mut lines: Vec<Line> = HELP_LINES
        .iter()
        .map(|(key, text)| {
            Line::from(vec![
                Span::styled(format!("  {key:<6}"), Styles::key_hint()),
                Span::styled(*text, Styles::default()),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::styled("  Esc or ? to close", Styles::dim()));

    let block = Block::default()
        .title(" ktop - Kubernetes Cluster Monitor ")
        .borders(Borders::ALL)
        .border_style(Styles::border(true));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}
