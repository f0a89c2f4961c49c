use std::collections::VecDeque;

use log::Level;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use lockstep::{Occupant, Role, SlotState};

use crate::runner::PeerStatus;

const MAX_LOG_LINES: usize = 200;

pub struct TuiState {
    logs: VecDeque<(Level, String)>,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            logs: VecDeque::with_capacity(MAX_LOG_LINES),
        }
    }

    pub fn log(&mut self, level: Level, message: impl Into<String>) {
        if self.logs.len() == MAX_LOG_LINES {
            self.logs.pop_front();
        }
        self.logs.push_back((level, message.into()));
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, status: &PeerStatus) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], status);
    render_slots(frame, chunks[1], status);
    render_network(frame, chunks[2], status);
    render_logs(frame, chunks[3], state);
    render_help(frame, chunks[4]);
}

fn render_header(frame: &mut Frame, area: Rect, status: &PeerStatus) {
    let role = match status.role {
        Role::Idle => "idle",
        Role::Host => "host",
        Role::Client => "client",
    };
    let title = format!(
        " lockstep {} - Uptime: {} ",
        role,
        format_duration(status.uptime_secs)
    );

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let addr = status
        .local_addr
        .map_or_else(|| "-".to_string(), |a| a.to_string());
    let text = format!(
        "State: {}  |  Addr: {}  |  Frame: {}  |  Checksum: {:#010x}  |  Steps due: {:.2}",
        status.state.as_str(),
        addr,
        status.frame,
        status.checksum,
        status.accumulator
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_slots(frame: &mut Frame, area: Rect, status: &PeerStatus) {
    let block = Block::default()
        .title(" Players ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let lines: Vec<Line> = status
        .slots
        .iter()
        .enumerate()
        .map(|(slot, state)| {
            let (label, color) = match state {
                SlotState::Free => ("free".to_string(), Color::DarkGray),
                SlotState::Retired => ("left".to_string(), Color::Red),
                SlotState::Occupied(Occupant::Local) => ("you".to_string(), Color::Yellow),
                SlotState::Occupied(Occupant::Peer(peer)) => (peer.to_string(), Color::White),
                SlotState::Occupied(Occupant::Remote) => ("remote".to_string(), Color::White),
            };
            let marker = if status.local_slot == Some(slot) { "*" } else { " " };
            Line::from(vec![
                Span::styled(
                    format!("{}{}: ", marker, slot),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(label, Style::default().fg(color)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_network(frame: &mut Frame, area: Rect, status: &PeerStatus) {
    let block = Block::default()
        .title(" Network ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let Some(net) = &status.network_stats else {
        frame.render_widget(Paragraph::new("No transport").block(block), area);
        return;
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Packets: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} sent / {} recv / {} dropped",
                    net.packets_sent, net.packets_received, net.packets_dropped
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Bytes: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} sent / {} recv",
                    format_bytes(net.bytes_sent),
                    format_bytes(net.bytes_received)
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("RTT: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.1}ms (+/- {:.1}ms)", net.rtt_ms, net.rtt_variance),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Resends: ", Style::default().fg(Color::Gray)),
            Span::styled(
                net.resends.to_string(),
                Style::default().fg(if net.resends > 0 {
                    Color::Red
                } else {
                    Color::White
                }),
            ),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_logs(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    // Newest lines at the bottom.
    let visible = area.height.saturating_sub(2) as usize;
    let skip = state.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = state
        .logs
        .iter()
        .skip(skip)
        .map(|(level, message)| {
            let color = match level {
                Level::Error => Color::Red,
                Level::Warn => Color::Yellow,
                _ => Color::White,
            };
            Line::from(Span::styled(message.as_str(), Style::default().fg(color)))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("Press 'q' or ESC to quit")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );
    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
