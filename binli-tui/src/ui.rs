use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};
use binli_core::{BinCard, ComplianceRating, ConnectionState, DisplayStatus};

use crate::app::App;

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    draw_header(frame, app, *header_area);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(*content_area);

    let content = content_chunks.as_ref();
    let [score_area, bins_area] = content else {
        return;
    };

    draw_compliance(frame, app, *score_area);
    draw_bins(frame, app, *bins_area);
    draw_status(frame, app, *status_area);
}

fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let (badge, badge_style) = match &app.state().connection {
        ConnectionState::Connecting => ("Connecting…", Style::default().fg(Color::Yellow)),
        ConnectionState::Connected => ("Connected", Style::default().fg(Color::Green)),
        ConnectionState::Disconnected(_) => ("Disconnected", Style::default().fg(Color::Red)),
    };

    let title = Line::from(vec![
        Span::raw("Real-time bin monitoring · "),
        Span::styled(app.client.base_url().to_owned(), Style::default().fg(Color::DarkGray)),
        Span::raw(" · "),
        Span::styled(badge, badge_style.add_modifier(Modifier::BOLD)),
    ]);

    let header = Paragraph::new(title).block(
        Block::default()
            .borders(Borders::ALL)
            .title("binli – smart waste management"),
    );
    frame.render_widget(header, area);
}

fn draw_compliance(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let state = app.state();
    let rating = state.rating();
    let color = rating_color(rating);

    let lines = vec![
        Line::raw(""),
        Line::styled(
            format!("{}%", state.compliance_score),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Line::raw("Overall Compliance Score"),
        Line::raw(""),
        Line::styled(rating.to_string(), Style::default().fg(color)),
        Line::raw(""),
        Line::styled(
            "Based on current bin fill levels",
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Compliance"))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_bins(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let cards = &app.state().cards;

    if cards.is_empty() {
        let text = if app.is_loading {
            "Loading bins…"
        } else {
            "No bin has reported yet. Press s to simulate a sensor tick."
        };
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Bins"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let mut constraints: Vec<Constraint> = cards.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Min(0));

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (idx, (card, row)) in cards.iter().zip(rows.iter()).enumerate() {
        frame.render_widget(bin_gauge(card, idx == app.selected), *row);
    }
}

fn bin_gauge(card: &BinCard, selected: bool) -> Gauge<'static> {
    let color = status_color(card.status);
    let prefix = if selected { "> " } else { "" };

    let mut border_style = Style::default();
    if selected {
        border_style = border_style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
    }

    Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!(
                    "{prefix}{} · {}",
                    card.bin_type.label(),
                    card.status.label()
                )),
        )
        .gauge_style(Style::default().fg(color))
        .ratio((card.fill_level / 100.0).clamp(0.0, 1.0))
        .label(format!("{}%", card.fill_level))
}

fn draw_status(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let nav_hint = "↑/↓ select · r refresh · s simulate tick · e empty selected · q/Esc quit";

    let last_update = app.state().last_update.map_or_else(
        || "never".to_owned(),
        |time| time.with_timezone(&Local).format("%H:%M:%S").to_string(),
    );

    let status_text = if app.is_loading {
        format!("Loading… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {nav_hint}")
    } else if let Some(msg) = &app.info_message {
        format!("{msg} · Last updated {last_update} · {nav_hint}")
    } else {
        format!("Last updated {last_update} · {nav_hint}")
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_loading {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, area);
}

fn status_color(status: DisplayStatus) -> Color {
    match status {
        DisplayStatus::Normal => Color::Green,
        DisplayStatus::Warning => Color::Yellow,
        DisplayStatus::Full => Color::Red,
    }
}

fn rating_color(rating: ComplianceRating) -> Color {
    match rating {
        ComplianceRating::Excellent => Color::Green,
        ComplianceRating::Good => Color::Yellow,
        ComplianceRating::NeedsAttention => Color::Red,
    }
}
