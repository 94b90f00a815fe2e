//! TUI rendering — parameters on the left, spectrum charts on the right.
//!
//! ┌──────────────────────────────────────────────────────┐
//! │  🧵 Stringscope  http://127.0.0.1:8000  idle  #12    │
//! ├────────────────────────┬─────────────────────────────┤
//! │  Parameters            │  ╭ mass spectrum            │
//! │  ▸ Dimensions     10   │  │   ·  ·  ·               │
//! │    String tension 1    │  ╰──────────────────────    │
//! │    ...                 ├─────────────────────────────┤
//! ├────────────────────────┤  ╭ degeneracy               │
//! │  Calabi-Yau: Ricci-... │  │         ·                │
//! ├────────────────────────┤  ╰──────────────────────    │
//! │  { "coupling": 0.1 ... │                             │
//! ├────────────────────────┴─────────────────────────────┤
//! │  ↑↓ select   ←→ adjust   enter: type   q: quit       │
//! └──────────────────────────────────────────────────────┘

use super::app::App;
use ratatui::{prelude::*, widgets::*};
use stringscope_core::{
    ChartSeries, PanelView, ParameterDescriptor, ParameterKind, Phase, Step, WidgetValue,
};

pub fn draw(f: &mut Frame, app: &App, panel: &PanelView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(12),   // main
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app, panel);
    draw_main(f, rows[1], app, panel);
    draw_keys(f, rows[2], app);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App, panel: &PanelView) {
    let status = panel.loop_status();
    let (phase_label, phase_color) = match status.phase {
        Phase::Idle => ("idle", Color::Green),
        Phase::EditPending => ("edit pending", Color::Yellow),
    };

    let mut spans = vec![
        Span::styled(" 🧵 Stringscope ", Style::default().bold().fg(Color::Cyan)),
        Span::raw(format!(" {} ", app.config().base_url)),
        Span::styled(format!(" {phase_label} "), Style::default().fg(phase_color)),
        Span::styled(
            format!(
                " #{}  {}ms ",
                panel.render_count(),
                app.config().poll_interval.as_millis()
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(err) = &status.last_error {
        spans.push(Span::styled(
            format!(" ⚠ {} ", truncate(err, 60)),
            Style::default().fg(Color::Red),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(spans));
    f.render_widget(block, area);
}

fn draw_main(f: &mut Frame, area: Rect, app: &App, panel: &PanelView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(panel.catalog().len() as u16 + 3),
            Constraint::Length(6),
            Constraint::Min(4),
        ])
        .split(cols[0]);

    draw_parameters(f, left[0], app, panel);
    draw_description(f, left[1], app, panel);
    draw_raw_state(f, left[2], panel);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(cols[1]);

    draw_chart(f, right[0], " Mass spectrum ", "M", panel.spectrum(), Color::Cyan);
    draw_chart(f, right[1], " Degeneracy ", "g", panel.degeneracy(), Color::Magenta);
}

fn draw_parameters(f: &mut Frame, area: Rect, app: &App, panel: &PanelView) {
    let rows: Vec<Row> = panel
        .widgets()
        .enumerate()
        .map(|(i, (descriptor, value))| {
            let is_cursor = i == app.cursor();
            let pointer = if is_cursor { "▸" } else { " " };

            let shown = match app.editing() {
                Some(buffer) if is_cursor => format!("{}▏", buffer.text),
                _ => format_value(descriptor, value),
            };
            let range = match descriptor.bounds() {
                Some((min, max)) => format!("{min}–{max}"),
                None => format!("{} choices", descriptor.choices().len()),
            };

            let style = if is_cursor {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else if *value == WidgetValue::Empty {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };

            Row::new(vec![
                pointer.to_string(),
                descriptor.label.to_string(),
                shown,
                range,
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),  // pointer
            Constraint::Length(18), // label
            Constraint::Length(12), // value
            Constraint::Min(8),     // range
        ],
    )
    .header(
        Row::new(vec!["", "Parameter", "Value", "Range"])
            .style(Style::default().bold().fg(Color::DarkGray)),
    )
    .block(Block::default().borders(Borders::ALL).title(" Parameters "));

    let mut state = app.table_state();
    f.render_stateful_widget(table, area, &mut state);
}

fn draw_description(f: &mut Frame, area: Rect, app: &App, panel: &PanelView) {
    let selected = panel.catalog().iter().nth(app.cursor());
    let mut lines = Vec::new();

    if let Some(descriptor) = selected {
        lines.push(Line::from(Span::styled(
            descriptor.description,
            Style::default().fg(Color::Gray),
        )));
    }
    if let Some(text) = panel.topology_description() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Topology: ", Style::default().bold()),
            Span::raw(text.to_string()),
        ]));
    }

    let block = Block::default().borders(Borders::ALL).title(" About ");
    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(block);
    f.render_widget(p, area);
}

fn draw_raw_state(f: &mut Frame, area: Rect, panel: &PanelView) {
    let text = if panel.raw_text().is_empty() {
        "waiting for the service…"
    } else {
        panel.raw_text()
    };
    let block = Block::default().borders(Borders::ALL).title(" Raw state ");
    let p = Paragraph::new(text)
        .style(Style::default().fg(Color::Yellow))
        .block(block);
    f.render_widget(p, area);
}

fn draw_chart(
    f: &mut Frame,
    area: Rect,
    title: &str,
    y_name: &str,
    series: &ChartSeries,
    color: Color,
) {
    if series.is_empty() {
        let block = Block::default().borders(Borders::ALL).title(title);
        let p = Paragraph::new("No data yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let datasets = vec![
        Dataset::default()
            .name(format!("{y_name}(n)"))
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(color))
            .data(&series.points),
    ];

    let [x_min, x_max] = series.x_bounds;
    let [y_min, y_max] = series.y_bounds;

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(
            Axis::default()
                .title("level")
                .bounds(series.x_bounds)
                .labels(vec![
                    Line::from(format!("{x_min:.0}")),
                    Line::from(format!("{x_max:.0}")),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(y_name)
                .bounds(series.y_bounds)
                .labels(vec![
                    Line::from(format!("{y_min:.1}")),
                    Line::from(format!("{y_max:.2}")),
                ]),
        );

    f.render_widget(chart, area);
}

fn draw_keys(f: &mut Frame, area: Rect, app: &App) {
    let (text, style) = if let Some(notice) = app.notice() {
        (
            format!(" {notice}"),
            Style::default().bg(Color::Red).fg(Color::White),
        )
    } else if app.editing().is_some() {
        (
            " type a number   enter: apply   esc: cancel".to_string(),
            Style::default().bg(Color::Blue).fg(Color::White),
        )
    } else {
        (
            " ↑↓ select   ←→/-+ adjust   enter: type value   q: quit".to_string(),
            Style::default().bg(Color::DarkGray).fg(Color::White),
        )
    };
    f.render_widget(Paragraph::new(text).style(style), area);
}

/// Widget text for a parameter: integers without decimals, reals compact.
pub fn format_value(descriptor: &ParameterDescriptor, value: &WidgetValue) -> String {
    match value {
        WidgetValue::Empty => "—".to_string(),
        WidgetValue::Choice(c) => c.clone(),
        WidgetValue::Number(v) => match descriptor.kind {
            ParameterKind::Numeric {
                step: Step::Integer,
                ..
            } => format!("{v:.0}"),
            _ if *v != 0.0 && (v.abs() < 1e-3 || v.abs() >= 1e5) => format!("{v:.3e}"),
            _ => {
                let s = format!("{v:.6}");
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            }
        },
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
