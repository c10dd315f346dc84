//! Unlock form rendering.
//!
//! Pure view over [`UnlockState`]; no mutations happen here.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::state::{Phase, UnlockState};

const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub fn render(state: &UnlockState, frame: &mut Frame) {
    let area = centered_box(frame.area(), 60, 14);

    let block = Block::default()
        .title(" Authentication Required ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // alias
            Constraint::Length(2), // password
            Constraint::Length(2), // location
            Constraint::Length(3), // status / error
            Constraint::Min(1),    // footer
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Link  ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("/r/{}", state.requirement.alias_path)),
        ])),
        rows[0],
    );

    if state.requirement.password_required {
        let masked = "•".repeat(state.password.chars().count());
        let cursor = if matches!(state.phase, Phase::Submitting | Phase::Done) {
            ""
        } else {
            "▏"
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Password  ", Style::default().fg(Color::DarkGray)),
                Span::raw(format!("{masked}{cursor}")),
            ])),
            rows[1],
        );
    }

    if state.requirement.location_required {
        frame.render_widget(Paragraph::new(location_line(state)), rows[2]);
    }

    frame.render_widget(Paragraph::new(status_lines(state)), rows[3]);

    frame.render_widget(
        Paragraph::new(footer(state)).style(Style::default().fg(Color::DarkGray)),
        rows[4],
    );
}

fn location_line(state: &UnlockState) -> Line<'static> {
    let label = Span::styled("Location  ", Style::default().fg(Color::DarkGray));
    let value = match (&state.coordinate, state.phase) {
        (Some(coordinate), _) => Span::styled(
            format!("granted ✓ ({})", coordinate.source.display_name()),
            Style::default().fg(Color::Green),
        ),
        (None, Phase::AwaitingLocation) => {
            let spinner = SPINNER_FRAMES[state.spinner_frame as usize % SPINNER_FRAMES.len()];
            Span::raw(format!("{spinner} acquiring…"))
        }
        (None, _) => Span::raw("not yet granted (ctrl+l to request)"),
    };
    Line::from(vec![label, value])
}

fn status_lines(state: &UnlockState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match state.phase {
        Phase::Submitting => {
            let spinner = SPINNER_FRAMES[state.spinner_frame as usize % SPINNER_FRAMES.len()];
            lines.push(Line::from(format!("{spinner} Verifying…")));
        }
        Phase::Done => {
            lines.push(Line::from(Span::styled(
                "Link opened successfully.",
                Style::default().fg(Color::Green),
            )));
            if let Some(destination) = &state.destination {
                lines.push(Line::from(destination.clone()));
            }
        }
        _ => {}
    }
    if let Some(error) = &state.last_error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }
    lines
}

fn footer(state: &UnlockState) -> Line<'static> {
    if state.phase == Phase::Done {
        return Line::from("press any key to exit");
    }
    let mut hints = vec!["enter submit".to_string()];
    if state.can_request_location() {
        hints.push("ctrl+l request location".to_string());
    }
    hints.push("esc quit".to_string());
    Line::from(hints.join(" · "))
}

/// Centers a fixed-size box inside the terminal area, clamped to fit.
fn centered_box(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
