use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

use paper2md_core::DialogStatus;

use crate::app::App;
use crate::preview::PreviewWidget;

const LOG_PANEL_HEIGHT: u16 = 8;

pub fn draw(frame: &mut Frame, app: &App) {
    let [status_area, preview_area, help_area, log_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(LOG_PANEL_HEIGHT),
    ])
    .areas(frame.area());

    draw_status(frame, app, status_area);
    draw_preview(frame, app, preview_area);
    draw_help(frame, app, help_area);
    draw_logs(frame, app, log_area);

    if let Some(alert) = app.visible_alert() {
        draw_alert(frame, alert);
    }
}

fn status_style(status: DialogStatus) -> Style {
    let color = match status {
        DialogStatus::Connecting => Color::Yellow,
        DialogStatus::Live => Color::Green,
        DialogStatus::Unavailable => Color::Red,
        DialogStatus::Recognizing => Color::Cyan,
        DialogStatus::Closed => Color::DarkGray,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let state = &app.state;
    let resolution = state
        .resolution
        .map(|(w, h)| format!("{}x{}", w, h))
        .unwrap_or_else(|| "-".to_string());
    let line = Line::from(vec![
        Span::styled(state.status.label(), status_style(state.status)),
        Span::raw(format!(
            "  device: {}  {}  engine: {}  document: {}",
            state.device_label, resolution, state.engine, state.document
        )),
    ]);
    let para = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .title("paper2md capture"),
    );
    frame.render_widget(para, area);
}

fn draw_preview(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("Preview ({} frames)", app.state.frames_shown);
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match (&app.state.preview, app.state.status) {
        (_, DialogStatus::Unavailable) => {
            let para = Paragraph::new("camera unavailable")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Red));
            frame.render_widget(para, inner);
        }
        (Some(preview), _) => frame.render_widget(PreviewWidget::new(preview), inner),
        (None, _) => {
            let para = Paragraph::new("waiting for camera...").alignment(Alignment::Center);
            frame.render_widget(para, inner);
        }
    }
}

fn draw_help(frame: &mut Frame, app: &App, area: Rect) {
    let text = match app.state.status {
        DialogStatus::Live => "Space/Enter: take photo   Esc/q: close   Up/Down/G: scroll logs",
        DialogStatus::Recognizing => "recognizing...   Esc/q: close and discard",
        _ => "Esc/q: close",
    };
    let para = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(para, area);
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let logs = match app.logs.lock() {
        Ok(logs) => logs,
        Err(poisoned) => poisoned.into_inner(),
    };
    let total = logs.len();

    let visible_height = area.height.saturating_sub(2) as usize;
    let scroll = app.log_scroll.min(total.saturating_sub(visible_height));
    let end = total.saturating_sub(scroll);
    let start = end.saturating_sub(visible_height);

    let items: Vec<ListItem> = logs
        .iter()
        .skip(start)
        .take(end - start)
        .map(|s| ListItem::new(s.as_str()))
        .collect();

    let title = if app.log_auto_scroll {
        "Logs"
    } else {
        "Logs (G=bottom)"
    };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    area
}

fn draw_alert(frame: &mut Frame, message: &str) {
    let area = popup_area(frame.area(), 60.min(frame.area().width), 7);
    let text = vec![
        Line::from(message),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: dismiss   Esc: close",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let para = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title("Alert"),
        );
    frame.render_widget(Clear, area);
    frame.render_widget(para, area);
}
