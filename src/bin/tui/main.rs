//! deepchat-tui - terminal conversation view
//!
//! Talks to the local relay over HTTP. The relay call is the single
//! asynchronous boundary: it runs on a background thread and reports back
//! over a channel, while the event loop keeps accepting input.

mod conversation;
mod render;
mod sanitize;

use conversation::{Conversation, Effect, Event as ConvEvent, Role, Turn};
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use serde::Deserialize;
use std::io;
use std::sync::mpsc;
use std::time::Duration;

// The relay endpoint is a fixed constant in this version.
const CHAT_URL: &str = "http://localhost:3001/api/chat";

/// Outcome of one relay call, delivered from the worker thread.
enum TurnOutcome {
    Resolved(String),
    Failed(String),
}

#[derive(Deserialize)]
struct ChatResponseBody {
    response: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// RAII guard that restores the terminal on drop (including panics).
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

struct App {
    conversation: Conversation,
    input: String,
    /// Transient feedback line (clipboard result, mostly)
    notice: Option<String>,
    /// Manual scroll offset from the bottom of the transcript
    scroll_from_bottom: u16,
}

impl App {
    fn new() -> Self {
        Self {
            conversation: Conversation::new(),
            input: String::new(),
            notice: None,
            scroll_from_bottom: 0,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let _guard = TerminalGuard;
    crossterm::execute!(io::stdout(), EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel::<TurnOutcome>();
    let mut app = App::new();

    loop {
        terminal.draw(|frame| draw(frame, &app))?;

        // Completions from the worker thread
        while let Ok(outcome) = rx.try_recv() {
            let event = match outcome {
                TurnOutcome::Resolved(raw) => ConvEvent::Resolved { raw },
                TurnOutcome::Failed(message) => ConvEvent::Failed { message },
            };
            app.conversation.apply(event);
            app.scroll_from_bottom = 0;
        }

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }

        let TermEvent::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        app.notice = None;

        if app.conversation.turn() == Turn::ConfirmingReset {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    app.conversation.apply(ConvEvent::ResetConfirmed);
                    app.input.clear();
                    app.scroll_from_bottom = 0;
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    app.conversation.apply(ConvEvent::ResetCancelled);
                }
                _ => {}
            }
            continue;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Esc, _) => break,

            (KeyCode::Char('r'), KeyModifiers::CONTROL) => {
                app.conversation.apply(ConvEvent::ResetRequested);
            }

            (KeyCode::Char('y'), KeyModifiers::CONTROL) => {
                app.notice = Some(copy_last_response(&app.conversation));
            }

            (KeyCode::Enter, _) => {
                let effect = app.conversation.apply(ConvEvent::Submit {
                    text: app.input.clone(),
                });
                if let Some(Effect::SendPrompt(prompt)) = effect {
                    app.input.clear();
                    app.scroll_from_bottom = 0;
                    spawn_submit(tx.clone(), prompt);
                } else if app.conversation.is_submitting() && !app.input.trim().is_empty() {
                    app.notice = Some("Still waiting for the previous response".to_string());
                }
            }

            (KeyCode::Backspace, _) => {
                app.input.pop();
            }

            (KeyCode::Up, _) => {
                app.scroll_from_bottom = app.scroll_from_bottom.saturating_add(1);
            }
            (KeyCode::Down, _) => {
                app.scroll_from_bottom = app.scroll_from_bottom.saturating_sub(1);
            }

            (KeyCode::Char(c), m) if !m.contains(KeyModifiers::CONTROL) => {
                app.input.push(c);
            }

            _ => {}
        }
    }

    Ok(())
}

/// Send the prompt to the relay on a background thread.
fn spawn_submit(tx: mpsc::Sender<TurnOutcome>, prompt: String) {
    std::thread::spawn(move || {
        let outcome = match request_completion(&prompt) {
            Ok(text) => TurnOutcome::Resolved(text),
            Err(message) => TurnOutcome::Failed(message),
        };
        let _ = tx.send(outcome);
    });
}

/// One blocking relay call. Errors come back as display-ready text,
/// keeping the relay's own failure detail when it sent any.
fn request_completion(prompt: &str) -> Result<String, String> {
    let body = serde_json::json!({ "prompt": prompt });

    match ureq::post(CHAT_URL).send_json(body) {
        Ok(resp) => {
            let parsed: ChatResponseBody = resp
                .into_json()
                .map_err(|e| format!("malformed relay response: {e}"))?;
            Ok(parsed.response)
        }
        Err(ureq::Error::Status(code, resp)) => {
            let detail = resp
                .into_json::<ErrorBody>()
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("relay returned HTTP {code}"));
            Err(detail)
        }
        Err(e) => Err(format!("relay unreachable: {e}")),
    }
}

/// Put the latest assistant message on the system clipboard.
/// Returns the feedback text for the status line.
fn copy_last_response(conversation: &Conversation) -> String {
    let Some(text) = conversation.copy_target() else {
        return "Nothing to copy".to_string();
    };

    match arboard::Clipboard::new().and_then(|mut c| c.set_text(text.to_string())) {
        Ok(()) => "Copied response to clipboard".to_string(),
        Err(e) => format!("Clipboard error: {e}"),
    }
}

// ============================================================
// Drawing
// ============================================================

fn draw(frame: &mut Frame, app: &App) {
    let [transcript_area, input_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    // Transcript
    let mut lines: Vec<Line<'static>> = Vec::new();
    for msg in app.conversation.messages() {
        let header = match msg.role {
            Role::User => Span::styled(
                "You",
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
            ),
            Role::Assistant => Span::styled(
                "AI",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
        };
        lines.push(Line::from(header));
        lines.extend(render::message_lines(msg));
        lines.push(Line::default());
    }
    if app.conversation.is_submitting() {
        lines.push(Line::from(Span::styled(
            "…",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let visible = transcript_area.height;
    let scroll = total
        .saturating_sub(visible)
        .saturating_sub(app.scroll_from_bottom);

    let transcript = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(transcript, transcript_area);

    // Input
    let input_title = if app.conversation.is_submitting() {
        "Message (waiting…)"
    } else {
        "Message"
    };
    let input = Paragraph::new(app.input.as_str())
        .block(Block::default().borders(Borders::ALL).title(input_title));
    frame.render_widget(input, input_area);

    // Status line
    let status = if app.conversation.turn() == Turn::ConfirmingReset {
        Line::from(Span::styled(
            "Clear the conversation? (y/n)",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
    } else if let Some(notice) = &app.notice {
        Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Green),
        ))
    } else {
        Line::from(Span::styled(
            "Enter send · Ctrl+R clear · Ctrl+Y copy · Esc quit",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(status), status_area);
}
