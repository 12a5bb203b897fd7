//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────┐
//! │  RouterDash  http://10.0.0.1:5000  ok 42 · 1 │
//! ├──────────────────────┬───────────────────────┤
//! │  CPU 37.5%           │  Memory 61.2%         │
//! │  ⣀⡠⠔⠊⠉⠑⠢⣀           │  ⠉⠉⠒⠤⣀⣀⡠⠤            │
//! ├──────────────────────┼───────────────────────┤
//! │  Storage ████░░ 48%  │  ↓ 1200 KB/s ↑ 300    │
//! │                      │  Internet ● Ultima ●   │
//! ├──────────────────────┴───────────────────────┤
//! │  Bandwidth history (Mbps)                    │
//! ├──────────────────────────────────────────────┤
//! │  tab: view  b: speed test  m: mqtt  q: quit  │
//! └──────────────────────────────────────────────┘

use super::app::{App, Console, Dialog, FieldValue, Popup, Tab};
use ratatui::{prelude::*, widgets::*};
use routerdash_core::{
    API_ENDPOINTS, DashboardModel, LinkIndicator, MaintenanceState, Phase, RollingWindow,
};

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(10),   // main
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);
    match app.tab() {
        Tab::Dashboard => draw_dashboard(f, rows[1], app.model()),
        Tab::Device => draw_device(f, rows[1], app.model()),
    }
    draw_keys(f, rows[2], app);

    match app.popup() {
        Some(Popup::SpeedTest) => draw_speed_test(f, app.model()),
        Some(Popup::Mqtt) => draw_mqtt(f, app.model()),
        Some(Popup::ApiDocs) => draw_api_docs(f),
        Some(Popup::Maintenance(dialog)) => draw_maintenance(f, dialog, app.model()),
        Some(Popup::Console(console)) => draw_console(f, console, app.model()),
        None => {}
    }
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let model = app.model();
    let polling = if app.is_polling() {
        format!("every {}ms", app.poll_interval().as_millis())
    } else {
        "paused".to_string()
    };

    let tabs: Vec<Span> = [Tab::Dashboard, Tab::Device]
        .into_iter()
        .map(|t| {
            if t == app.tab() {
                Span::styled(format!(" {} ", t.label()), Style::default().bold().fg(Color::Yellow))
            } else {
                Span::styled(format!(" {} ", t.label()), Style::default().fg(Color::DarkGray))
            }
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" RouterDash ", Style::default().bold().fg(Color::Cyan)),
            Span::raw(format!(" {} ", app.base_url())),
            Span::styled(
                format!(" ok {}  failed {}  {polling} ", model.polls_ok, model.polls_failed),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

    let mut status = tabs;
    if let Some(err) = &model.poll_error {
        status.push(Span::styled(
            format!("  last poll failed: {err}"),
            Style::default().fg(Color::Red),
        ));
    } else if let Some((source, err)) = &model.last_error {
        status.push(Span::styled(
            format!("  {}: {err}", source.label()),
            Style::default().fg(Color::Red),
        ));
    }
    let status = Line::from(status);
    f.render_widget(Paragraph::new(status).block(block), area);
}

// ---------------------------------------------------------------------------
// Dashboard tab
// ---------------------------------------------------------------------------

fn draw_dashboard(f: &mut Frame, area: Rect, model: &DashboardModel) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(6),
            Constraint::Min(6),
        ])
        .split(area);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    draw_usage_chart(f, charts[0], "CPU", &model.cpu_window, &model.cpu.text, Color::Cyan);
    draw_usage_chart(
        f,
        charts[1],
        "Memory",
        &model.memory_window,
        &format!("{}  {}", model.memory.text, model.memory.details),
        Color::Magenta,
    );

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    draw_storage(f, middle[0], model);
    draw_network(f, middle[1], model);

    draw_history(f, rows[2], model);
}

fn draw_usage_chart(
    f: &mut Frame,
    area: Rect,
    name: &str,
    window: &RollingWindow,
    readout: &str,
    color: Color,
) {
    let data = window.points();
    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(color))
            .data(&data),
    ];

    let x_max = (window.len().max(2) - 1) as f64;
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {name}  {readout} ")),
        )
        .x_axis(Axis::default().bounds([0.0, x_max]))
        .y_axis(Axis::default().bounds([0.0, 100.0]).labels(vec![
            Line::from("0"),
            Line::from("50"),
            Line::from("100"),
        ]));

    f.render_widget(chart, area);
}

fn draw_storage(f: &mut Frame, area: Rect, model: &DashboardModel) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Storage  {} ", model.storage.details));
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .ratio((model.storage.bar / 100.0).clamp(0.0, 1.0))
        .label(model.storage.text.clone());
    f.render_widget(gauge, area);
}

fn draw_network(f: &mut Frame, area: Rect, model: &DashboardModel) {
    let text = vec![
        Line::from(vec![
            Span::raw(" ↓ "),
            Span::styled(&model.bandwidth.download_text, Style::default().fg(Color::Cyan)),
            Span::raw("   ↑ "),
            Span::styled(&model.bandwidth.upload_text, Style::default().fg(Color::Magenta)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::raw(" Internet "),
            link_span(model.internet),
            Span::raw("   Ultima server "),
            link_span(model.ultima_server),
        ]),
        match model.last_speed_test {
            Some(r) => Line::styled(
                format!(
                    " Last test  ↓ {:.1}  ↑ {:.1} Mbps  {}",
                    r.download_mbps,
                    r.upload_mbps,
                    r.ping_ms.map_or("-".to_string(), |ms| format!("{ms} ms"))
                ),
                Style::default().fg(Color::DarkGray),
            ),
            None => Line::styled(" Last test  none", Style::default().fg(Color::DarkGray)),
        },
    ];
    let block = Block::default().borders(Borders::ALL).title(" Network ");
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn link_span(link: LinkIndicator) -> Span<'static> {
    let color = match link.connected {
        Some(true) => Color::Green,
        Some(false) => Color::Red,
        None => Color::DarkGray,
    };
    Span::styled(format!("● {}", link.label()), Style::default().fg(color))
}

fn draw_history(f: &mut Frame, area: Rect, model: &DashboardModel) {
    let download = model.history.download_points();
    let upload = model.history.upload_points();
    let datasets = vec![
        Dataset::default()
            .name("download")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&download),
        Dataset::default()
            .name("upload")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Magenta))
            .data(&upload),
    ];

    let x_max = (model.history.len().max(2) - 1) as f64;
    let y_max = (model.history.peak() * 1.1).max(1.0);
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Bandwidth history (Mbps) "),
        )
        .x_axis(Axis::default().bounds([0.0, x_max]))
        .y_axis(Axis::default().bounds([0.0, y_max]).labels(vec![
            Line::from("0"),
            Line::from(format!("{y_max:.0}")),
        ]));

    f.render_widget(chart, area);
}

// ---------------------------------------------------------------------------
// Device tab
// ---------------------------------------------------------------------------

fn draw_device(f: &mut Frame, area: Rect, model: &DashboardModel) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(cols[0]);

    let system = match &model.system {
        Some(s) => vec![
            kv("OS", &s.os_version),
            kv("Kernel", &s.kernel_version),
            kv("Uptime", &s.uptime),
            kv("CPU", &s.cpu_info),
        ],
        None => vec![loading()],
    };
    info_panel(f, left[0], " System ", system);

    let firmware = match &model.firmware {
        Some(fw) => {
            let mut lines = vec![
                kv("Version", &fw.version),
                kv("Built", &fw.build_date),
                kv("Arch", &fw.architecture),
                kv("Status", &fw.status),
            ];
            if fw.update_available {
                lines.push(Line::styled(
                    " Update available",
                    Style::default().fg(Color::Yellow).bold(),
                ));
            }
            lines
        }
        None => vec![loading()],
    };
    info_panel(f, left[1], " Firmware ", firmware);

    let network = match &model.network {
        Some(n) => {
            let mut lines = Vec::new();
            for (title, body) in [
                ("Interfaces", &n.interfaces),
                ("Addresses", &n.ip_addresses),
                ("Routes", &n.routing),
            ] {
                lines.push(Line::styled(format!(" {title}"), Style::default().bold()));
                lines.extend(body.lines().map(|l| Line::from(format!("   {l}"))));
            }
            lines
        }
        None => vec![loading()],
    };
    info_panel(f, cols[1], " Network ", network);
}

fn kv<'a>(key: &'a str, value: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!(" {key:<8}"), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn loading() -> Line<'static> {
    Line::styled(" loading…", Style::default().fg(Color::DarkGray))
}

fn info_panel(f: &mut Frame, area: Rect, title: &str, lines: Vec<Line>) {
    let block = Block::default().borders(Borders::ALL).title(title);
    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(block);
    f.render_widget(p, area);
}

// ---------------------------------------------------------------------------
// Popups
// ---------------------------------------------------------------------------

fn popup_area(f: &Frame, width: u16, height: u16) -> Rect {
    let area = f.area();
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

fn popup_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title)
}

fn draw_speed_test(f: &mut Frame, model: &DashboardModel) {
    let view = &model.speed_test;
    let area = popup_area(f, 52, 12);
    f.render_widget(Clear, area);
    let block = popup_block(" Speed Test ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(inner);

    f.render_widget(Paragraph::new(format!(" {}", view.phase.label())).bold(), rows[0]);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent(u16::from(view.progress.min(100)))
        .label(if view.phase.is_active() {
            format!("{:.1} Mbps", view.current_mbps)
        } else {
            format!("{}%", view.progress)
        });
    f.render_widget(gauge, rows[2]);

    let fmt_mbps = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{v:.1} Mbps"));
    let results = vec![
        Line::from(format!(" Download  {}", fmt_mbps(view.download_mbps))),
        Line::from(format!(" Upload    {}", fmt_mbps(view.upload_mbps))),
        Line::from(format!(
            " Ping      {}",
            view.ping_ms.map_or("-".to_string(), |ms| format!("{ms} ms"))
        )),
    ];
    f.render_widget(Paragraph::new(results), rows[3]);

    let button = if view.start_enabled() {
        Style::default().fg(Color::Green).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let hint = if view.phase == Phase::Idle || view.phase == Phase::Done {
        "enter"
    } else {
        "esc: cancel"
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!(" [{}]", view.start_label()), button),
            Span::styled(format!("  {hint}"), Style::default().fg(Color::DarkGray)),
        ])),
        rows[4],
    );
}

fn draw_mqtt(f: &mut Frame, model: &DashboardModel) {
    let panel = &model.mqtt;
    let area = popup_area(f, 48, 11);
    f.render_widget(Clear, area);

    let status_color = if panel.connected { Color::Green } else { Color::Red };
    let enabled = |on: bool| {
        if on {
            Style::default().fg(Color::White).bold()
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };
    let lines = vec![
        Line::from(vec![
            Span::raw(" Status     "),
            Span::styled(panel.status_label(), Style::default().fg(status_color).bold()),
        ]),
        Line::from(format!(" Broker     {}", panel.broker_address)),
        Line::from(format!(" Clients    {}", panel.clients)),
        Line::from(format!(" Published  {}", panel.published)),
        Line::from(format!(" Received   {}", panel.received)),
        Line::from(""),
        Line::from(vec![
            Span::styled(" s: start", enabled(panel.start_enabled())),
            Span::styled("   x: stop", enabled(panel.stop_enabled())),
            Span::styled("   r: refresh", Style::default().fg(Color::DarkGray)),
        ]),
    ];
    f.render_widget(Paragraph::new(lines).block(popup_block(" MQTT Broker ")), area);
}

fn draw_api_docs(f: &mut Frame) {
    let area = popup_area(f, 90, (API_ENDPOINTS.len() as u16) + 4);
    f.render_widget(Clear, area);

    let rows = API_ENDPOINTS.iter().map(|e| {
        let style = if e.stub {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        Row::new(vec![e.method, e.path, e.summary]).style(style)
    });
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(26),
            Constraint::Min(20),
        ],
    )
    .header(Row::new(vec!["Method", "Path", "Description"]).bold())
    .block(popup_block(" API "));
    f.render_widget(table, area);
}

fn draw_maintenance(f: &mut Frame, dialog: &Dialog, model: &DashboardModel) {
    let height = dialog.fields.len() as u16 + 6;
    let area = popup_area(f, 60, height);
    f.render_widget(Clear, area);

    let mut lines: Vec<Line> = dialog
        .fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let marker = if i == dialog.focus { "▸" } else { " " };
            let style = if i == dialog.focus {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let line = match field.value {
                FieldValue::Check(_) => format!(" {marker} {} {}", field.display(), field.label),
                FieldValue::Text { .. } => {
                    format!(" {marker} {}: {}", field.label, field.display())
                }
            };
            Line::styled(line, style)
        })
        .collect();

    lines.push(Line::from(""));
    lines.push(match model.maintenance_state(dialog.kind) {
        MaintenanceState::Idle => Line::styled(
            " enter: submit   tab: next field   space: toggle   esc: close",
            Style::default().fg(Color::DarkGray),
        ),
        MaintenanceState::InProgress => {
            Line::styled(" Working…", Style::default().fg(Color::Yellow))
        }
        MaintenanceState::Succeeded(msg) => {
            Line::styled(format!(" {msg}"), Style::default().fg(Color::Green))
        }
        MaintenanceState::Failed(msg) => {
            Line::styled(format!(" {msg}"), Style::default().fg(Color::Red))
        }
    });

    let block = popup_block(dialog.kind.title());
    let p = Paragraph::new(lines).wrap(Wrap { trim: false }).block(block);
    f.render_widget(p, area);
}

fn draw_console(f: &mut Frame, console: &Console, model: &DashboardModel) {
    let full = f.area();
    let pct: u32 = if console.maximized { 95 } else { 80 };
    let scale = |n: u16| (u32::from(n) * pct / 100) as u16;
    let area = popup_area(f, scale(full.width), scale(full.height));
    f.render_widget(Clear, area);

    let mut lines = Vec::new();
    for entry in model.terminal.transcript() {
        lines.push(Line::styled(
            format!("$ {}", entry.command),
            Style::default().fg(Color::Green).bold(),
        ));
        lines.extend(entry.output.lines().map(|l| Line::from(l.to_string())));
        if !entry.succeeded() {
            lines.push(Line::styled(
                format!("[exit {}]", entry.exit_status),
                Style::default().fg(Color::Red),
            ));
        }
    }
    if model.terminal.is_busy() {
        lines.push(Line::styled("running…", Style::default().fg(Color::Yellow)));
    }
    lines.push(Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::Cyan).bold()),
        Span::raw(console.input.clone()),
        Span::styled("█", Style::default().fg(Color::Cyan)),
    ]));

    // Keep the prompt on the last visible row.
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible) as u16;
    let block = popup_block(" Console ").title_bottom(Line::styled(
        " enter: run  ↑/↓: history  tab: maximize  esc: close ",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), area);
}

fn draw_keys(f: &mut Frame, area: Rect, app: &App) {
    let keys = match app.tab() {
        Tab::Dashboard => {
            " tab: device   b: speed test   m: mqtt   t: console   f: reset   k: backup   u: firmware   a: api   q: quit"
        }
        Tab::Device => " tab: dashboard   r: refresh   m: mqtt   t: console   a: api   q: quit",
    };
    let bar = Paragraph::new(keys).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}
