//! Terminal user interface for the recorder.
//!
//! Shows the start and stop controls with their enablement state, the running
//! session, and the outcome of the last upload. Keys for a disabled control
//! are ignored.

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};
use std::io::{stdout, Stdout};
use std::time::Duration;

use super::controller::CycleReport;
use super::controls::Controls;

/// User input during a recorder session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderCommand {
    /// Nothing to do (no key, unknown key, or a disabled control)
    Continue,
    /// Start a recording (s or Space)
    Start,
    /// Stop the recording and upload it (Enter or x)
    Stop,
    /// Leave the recorder (q, Escape, Ctrl+C)
    Quit,
}

/// Message shown under the controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Ready,
    Recording,
    Uploading,
    Uploaded { status: u16, bytes: usize, playback: Option<String> },
    UploadFailed(String),
    Error(String),
}

impl StatusLine {
    /// Summarises a finished cycle.
    pub fn from_report(report: &CycleReport) -> Self {
        match &report.upload {
            Ok(receipt) => StatusLine::Uploaded {
                status: receipt.status,
                bytes: receipt.bytes_sent,
                playback: report
                    .playback
                    .as_ref()
                    .ok()
                    .and_then(|source| source.as_ref())
                    .map(|source| format!("{} via {}", source.path.display(), source.player)),
            },
            Err(e) => StatusLine::UploadFailed(e.to_string()),
        }
    }

    pub fn text(&self) -> String {
        match self {
            StatusLine::Ready => "Ready".to_string(),
            StatusLine::Recording => "Recording".to_string(),
            StatusLine::Uploading => "Finalizing and uploading...".to_string(),
            StatusLine::Uploaded {
                status,
                bytes,
                playback,
            } => {
                let mut text = format!("Uploaded {} (status {status})", format_bytes(*bytes));
                if let Some(path) = playback {
                    text.push_str(&format!(" / playing {path}"));
                }
                text
            }
            StatusLine::UploadFailed(reason) => format!("Upload failed: {reason}"),
            StatusLine::Error(reason) => format!("Error: {reason}"),
        }
    }

    fn style(&self) -> Style {
        match self {
            StatusLine::Uploaded { .. } => Style::default().fg(Color::Green),
            StatusLine::UploadFailed(_) => Style::default().fg(Color::Yellow),
            StatusLine::Error(_) => Style::default().fg(Color::Red),
            _ => Style::default().fg(Color::Rgb(185, 207, 212)),
        }
    }
}

/// Snapshot of controller state for one frame.
#[derive(Debug, Clone)]
pub struct RecorderView<'a> {
    pub controls: Controls,
    pub elapsed: Option<Duration>,
    /// Chunks delivered by the capture stream so far
    pub chunks: usize,
    /// Audio captured so far, delivered or not
    pub captured: usize,
    pub status: &'a StatusLine,
}

/// Maps a key press to a command, honouring which controls are enabled.
pub fn command_for_key(key: KeyEvent, controls: Controls) -> RecorderCommand {
    if key.kind != KeyEventKind::Press {
        return RecorderCommand::Continue;
    }
    match key.code {
        KeyCode::Char('s') | KeyCode::Char(' ') if controls.start_enabled() => {
            RecorderCommand::Start
        }
        KeyCode::Enter | KeyCode::Char('x') if controls.stop_enabled() => RecorderCommand::Stop,
        KeyCode::Char('q') | KeyCode::Esc => RecorderCommand::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            RecorderCommand::Quit
        }
        _ => RecorderCommand::Continue,
    }
}

/// Terminal UI for the recorder.
pub struct RecorderTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl RecorderTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(RecorderTui {
            terminal,
            active: true,
        })
    }

    /// Renders the controls, session counters, and status line.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, view: &RecorderView<'_>) -> anyhow::Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();
            let block = Block::default()
                .borders(Borders::ALL)
                .title(" micpost ")
                .style(Style::default().bg(Color::Rgb(0, 0, 0)));
            let inner = block.inner(area);
            frame.render_widget(block, area);

            let rows = Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(inner);

            let controls = Line::from(vec![
                control_span("[s] Start", view.controls.start_enabled(), Color::Green),
                Span::raw("   "),
                control_span("[Enter] Stop", view.controls.stop_enabled(), Color::Red),
            ]);
            frame.render_widget(Paragraph::new(controls), rows[0]);

            if let Some(elapsed) = view.elapsed {
                let session = Line::from(vec![
                    Span::styled("● ", Style::default().fg(Color::Red)),
                    Span::raw(session_summary(elapsed, view.captured, view.chunks)),
                ]);
                frame.render_widget(Paragraph::new(session), rows[2]);
            }

            let status = Paragraph::new(Line::from(Span::styled(
                view.status.text(),
                view.status.style(),
            )))
            .wrap(ratatui::widgets::Wrap { trim: true });
            frame.render_widget(status, rows[3]);

            let help = Paragraph::new("s/space start · enter/x stop · q quit")
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(help, rows[5]);
        })?;

        Ok(())
    }

    /// Polls for one key press and maps it against the current controls.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self, controls: Controls) -> anyhow::Result<RecorderCommand> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                let command = command_for_key(key, controls);
                if command != RecorderCommand::Continue {
                    tracing::debug!("Key {:?} -> {:?}", key.code, command);
                }
                return Ok(command);
            }
        }
        Ok(RecorderCommand::Continue)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for RecorderTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn control_span(label: &'static str, enabled: bool, color: Color) -> Span<'static> {
    if enabled {
        Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(label, Style::default().fg(Color::DarkGray))
    }
}

/// Elapsed time and captured size; the chunk count is shown once chunks arrive.
fn session_summary(elapsed: Duration, captured: usize, chunks: usize) -> String {
    let secs = elapsed.as_secs();
    let mut text = format!(
        "{}:{:02} / {} captured",
        secs / 60,
        secs % 60,
        format_bytes(captured)
    );
    if chunks > 0 {
        text.push_str(&format!(" / {chunks} chunks"));
    }
    text
}

fn format_bytes(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
