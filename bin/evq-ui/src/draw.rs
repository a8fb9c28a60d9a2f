//! ---
//! ems_section: "12-gui-setup-wizard"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Terminal dashboard for the EV charging-queue simulation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use evq_core::{EventCategory, Rgb, NO_SELECTION_LABEL};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{
    Axis, Block, Borders, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph,
};
use ratatui::Frame;

use crate::input::UiState;
use crate::view::{ChartView, ViewModel};

const HELP: &str =
    "s start  x stop  r reset  g generate  +/- speed  ↑/↓ Enter select  ⌫ clear  Tab marker  PgUp/PgDn log  q quit";

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

pub fn draw_ui(frame: &mut Frame, view: &ViewModel, ui: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(10),
            Constraint::Length(2),
        ])
        .split(frame.size());

    draw_status(frame, rows[0], view);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(7)])
        .split(middle[0]);
    draw_map(frame, left[0], view, ui);
    draw_detail(frame, left[1], view, ui);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(4)])
        .split(middle[1]);
    draw_metrics(frame, right[0], view);
    draw_charts(frame, right[1], view);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(40),
            Constraint::Percentage(35),
        ])
        .split(rows[2]);
    draw_selector(frame, bottom[0], view, ui);
    draw_timeline(frame, bottom[1], view);
    draw_log(frame, bottom[2], view);

    let footer = match (&ui.notice, &view.last_error) {
        (Some(notice), _) => Line::from(Span::styled(notice.as_str(), Style::default().fg(Color::Yellow))),
        (None, Some(error)) => Line::from(Span::styled(
            format!("last error: {error}"),
            Style::default().fg(Color::Red),
        )),
        (None, None) => Line::from(Span::styled(HELP, Style::default().fg(Color::Gray))),
    };
    frame.render_widget(Paragraph::new(footer), rows[3]);
}

fn draw_status(frame: &mut Frame, area: Rect, view: &ViewModel) {
    let control = |label: &'static str, enabled: bool| {
        let style = if enabled {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Span::styled(format!("[{label}] "), style)
    };
    let mut spans = Vec::new();
    if let Some(controls) = view.controls {
        spans.push(control("start", controls.start));
        spans.push(control("stop", controls.stop));
        spans.push(control("reset", controls.reset));
        spans.push(control("generate", controls.generate));
        let state = if controls.stop { "running" } else { "stopped" };
        spans.push(Span::raw(format!(" {state}")));
    }
    spans.push(Span::styled(
        format!("  speed {}x", view.speed),
        Style::default().fg(Color::Cyan),
    ));
    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("EV Charging Queue"),
    );
    frame.render_widget(paragraph, area);
}

fn draw_map(frame: &mut Frame, area: Rect, view: &ViewModel, ui: &UiState) {
    let (mut min_lat, mut max_lat, mut min_lng, mut max_lng) =
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for marker in view.markers.values() {
        min_lat = min_lat.min(marker.position.lat);
        max_lat = max_lat.max(marker.position.lat);
        min_lng = min_lng.min(marker.position.lng);
        max_lng = max_lng.max(marker.position.lng);
    }
    if view.markers.is_empty() {
        (min_lat, max_lat, min_lng, max_lng) = (0.0, 1.0, 0.0, 1.0);
    }
    let pad_lat = ((max_lat - min_lat) * 0.05).max(0.001);
    let pad_lng = ((max_lng - min_lng) * 0.05).max(0.001);

    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Map ({} markers)", view.markers.len())),
        )
        .marker(symbols::Marker::Braille)
        .x_bounds([min_lng - pad_lng, max_lng + pad_lng])
        .y_bounds([min_lat - pad_lat, max_lat + pad_lat])
        .paint(|ctx| {
            let mut ordered: Vec<_> = view.markers.iter().collect();
            ordered.sort_by_key(|(_, marker)| marker.style.z_index);
            for (handle, marker) in ordered {
                let (x, y) = (marker.position.lng, marker.position.lat);
                let focused = ui.detail == Some(*handle);
                if focused {
                    ctx.print(
                        x,
                        y,
                        Span::styled("◎", Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
                    );
                } else if marker.style.scale >= 10 {
                    ctx.print(x, y, Span::styled("▲", Style::default().fg(color(marker.style.fill))));
                } else {
                    ctx.draw(&Points {
                        coords: &[(x, y)],
                        color: color(marker.style.fill),
                    });
                }
            }
        });
    frame.render_widget(canvas, area);
}

fn draw_detail(frame: &mut Frame, area: Rect, view: &ViewModel, ui: &UiState) {
    let marker = ui.detail.and_then(|handle| view.markers.get(&handle));
    let (title, lines) = match marker {
        Some(marker) => match &marker.popup {
            Some(popup) => (
                popup.heading.clone(),
                popup.lines.iter().map(|line| Line::from(line.as_str())).collect(),
            ),
            None => (marker.style.title.clone(), Vec::new()),
        },
        None => (
            "Details".to_owned(),
            vec![Line::from(Span::styled(
                "Tab cycles through markers",
                Style::default().fg(Color::DarkGray),
            ))],
        ),
    };
    let paragraph =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(paragraph, area);
}

fn draw_metrics(frame: &mut Frame, area: Rect, view: &ViewModel) {
    let lines = match &view.metrics {
        Some(metrics) => vec![
            Line::from(format!("Average wait      {}", metrics.average_wait)),
            Line::from(format!("Max queue         {}", metrics.max_queue)),
            Line::from(format!("Completion rate   {}", metrics.completion_rate)),
            Line::from(format!("Abandoned rate    {}", metrics.abandoned_rate)),
            Line::from(format!("Optimisation time {}", metrics.optimization_time)),
        ],
        None => vec![Line::from("Waiting for the first snapshot")],
    };
    let paragraph =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Metrics"));
    frame.render_widget(paragraph, area);
}

fn draw_charts(frame: &mut Frame, area: Rect, view: &ViewModel) {
    let count = view.charts.len().max(1) as u32;
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, count); count as usize])
        .split(area);
    for (chart, slot) in view.charts.values().zip(slots.iter()) {
        draw_chart(frame, *slot, chart);
    }
}

fn draw_chart(frame: &mut Frame, area: Rect, chart: &ChartView) {
    let points: Vec<(f64, f64)> = chart
        .values
        .iter()
        .enumerate()
        .map(|(index, value)| (index as f64, *value))
        .collect();
    let top = chart.values.iter().copied().fold(1.0_f64, f64::max) * 1.1;
    let right = (points.len().max(2) - 1) as f64;
    let x_labels = match (chart.labels.first(), chart.labels.last()) {
        (Some(first), Some(last)) => vec![Span::raw(first.clone()), Span::raw(last.clone())],
        _ => vec![Span::raw(""), Span::raw("")],
    };
    let dataset = Dataset::default()
        .name(chart.title)
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color(chart.color)))
        .data(&points);
    let widget = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(chart.title))
        .x_axis(Axis::default().bounds([0.0, right]).labels(x_labels))
        .y_axis(
            Axis::default()
                .title(chart.y_axis)
                .bounds([0.0, top])
                .labels(vec![Span::raw("0"), Span::raw(format!("{top:.1}"))]),
        );
    frame.render_widget(widget, area);
}

fn draw_selector(frame: &mut Frame, area: Rect, view: &ViewModel, ui: &UiState) {
    let mut items = vec![ListItem::new(NO_SELECTION_LABEL)];
    items.extend(view.options.iter().map(|option| {
        let style = if view.selected.as_deref() == Some(option.agent_id.as_str()) {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        ListItem::new(Span::styled(option.label.clone(), style))
    }));
    let mut state = ListState::default();
    if !view.options.is_empty() {
        state.select(Some(ui.cursor + 1));
    }
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("EVs"))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("▶ ");
    frame.render_stateful_widget(list, area, &mut state);
}

fn category_color(category: EventCategory) -> Color {
    match category {
        EventCategory::Info => Color::Blue,
        EventCategory::Moved => Color::Gray,
        EventCategory::Charging => Color::Green,
        EventCategory::Warning => Color::Yellow,
        EventCategory::Abandoned => Color::Red,
    }
}

fn draw_timeline(frame: &mut Frame, area: Rect, view: &ViewModel) {
    let lines: Vec<Line> = match view.timeline_placeholder {
        Some(placeholder) => vec![Line::from(Span::styled(
            placeholder.message(),
            Style::default().fg(Color::DarkGray),
        ))],
        None => view
            .timeline
            .iter()
            .flat_map(|item| {
                let heading = Line::from(vec![
                    Span::styled(format!("{} ", item.time), Style::default().fg(Color::DarkGray)),
                    Span::styled(
                        item.title.clone(),
                        Style::default()
                            .fg(category_color(item.category))
                            .add_modifier(Modifier::BOLD),
                    ),
                ]);
                std::iter::once(heading).chain(
                    item.details
                        .iter()
                        .map(|(label, value)| Line::from(format!("    {label}: {value}"))),
                )
            })
            .collect(),
    };
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible + view.timeline_offset);
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Journey"))
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(paragraph, area);
}

fn draw_log(frame: &mut Frame, area: Rect, view: &ViewModel) {
    let lines: Vec<Line> = match &view.log_placeholder {
        Some(placeholder) => vec![Line::from(Span::styled(
            placeholder.as_str(),
            Style::default().fg(Color::DarkGray),
        ))],
        None => view.log.iter().map(|line| Line::from(line.as_str())).collect(),
    };
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible + view.log_offset);
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Optimization Log"))
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(paragraph, area);
}
