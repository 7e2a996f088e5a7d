//! The human in the loop: confirmations, countdowns and printed output.
//!
//! `Operator` is the seam the orchestrator talks to; `TerminalOperator`
//! drives the real terminal with crossterm raw mode.

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Stylize;
use crossterm::terminal::{self, ClearType, disable_raw_mode, enable_raw_mode};
use crossterm::{cursor, queue};
use tokio::sync::mpsc;
use tracing::warn;

use crate::countdown::{Countdown, CountdownEnd, CountdownKey};
use crate::session::SessionState;

/// How the operator answered a confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Go ahead with this (possibly edited) text.
    Approved(String),
    Declined,
    /// Ctrl-C: decline and stop the session.
    Interrupted,
}

pub trait Operator: Send + Sync {
    /// Ask `[Y]es/No(/Edit)` about `text`. Edit is offered when `editable`.
    fn confirm(&self, prompt: &str, text: &str, editable: bool) -> impl Future<Output = Resolution> + Send;

    /// Wait `seconds`, letting the user pause or skip.
    fn countdown(&self, seconds: u64, state: &SessionState) -> impl Future<Output = CountdownEnd> + Send;

    /// The model's prose.
    fn show_reply(&self, message: &str);

    /// An action about to be dispatched.
    fn show_action(&self, label: &str, text: &str);

    /// Status lines ("canceling...", errors, command output).
    fn notice(&self, text: &str);
}

// ─── Line editing ─────────────────────────────────────────────────

/// Single-line editor state used for in-place command editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    chars: Vec<char>,
    cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEnd {
    Submitted(String),
    Interrupted,
}

impl LineBuffer {
    pub fn with_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let cursor = chars.len();
        Self { chars, cursor }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply one key; returns `Some` when the line is finished.
    pub fn apply(&mut self, key: KeyEvent) -> Option<LineEnd> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return Some(LineEnd::Interrupted),
            KeyCode::Char('u') if ctrl => {
                self.chars.drain(..self.cursor);
                self.cursor = 0;
            }
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = self.chars.len(),
            KeyCode::Char(c) => {
                self.chars.insert(self.cursor, c);
                self.cursor += 1;
            }
            KeyCode::Enter => return Some(LineEnd::Submitted(self.text())),
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.chars.remove(self.cursor);
            }
            KeyCode::Delete if self.cursor < self.chars.len() => {
                self.chars.remove(self.cursor);
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.chars.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.chars.len(),
            _ => {}
        }
        None
    }
}

/// Map a yes/no/edit answer. Empty means yes; anything unknown means no.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Edit,
}

pub fn parse_answer(input: &str, editable: bool) -> Answer {
    match input.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "yes" | "ok" | "sure" => Answer::Yes,
        "e" | "edit" if editable => Answer::Edit,
        _ => Answer::No,
    }
}

// ─── Terminal implementation ──────────────────────────────────────

/// Restores cooked mode when dropped, including on early `?` returns.
struct TerminalGuard;

impl TerminalGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn redraw(out: &mut impl Write, prompt: &str, line: &LineBuffer) -> io::Result<()> {
    let prompt_width = prompt.chars().count();
    queue!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine)
    )?;
    write!(out, "{}{}", prompt.cyan(), line.text())?;
    let col = u16::try_from(prompt_width + line.cursor()).unwrap_or(u16::MAX);
    queue!(out, cursor::MoveToColumn(col))?;
    out.flush()
}

/// Blocking raw-mode line read with `initial` pre-filled.
fn read_line(prompt: &str, initial: &str) -> io::Result<LineEnd> {
    let _guard = TerminalGuard::enable()?;
    let mut out = io::stdout();
    let mut line = LineBuffer::with_text(initial);
    redraw(&mut out, prompt, &line)?;
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(end) = line.apply(key) {
                write!(out, "\r\n")?;
                out.flush()?;
                return Ok(end);
            }
            redraw(&mut out, prompt, &line)?;
        }
    }
}

fn confirm_blocking(prompt: &str, text: &str, editable: bool) -> io::Result<Resolution> {
    println!("{}", text.yellow());
    let question = if editable {
        format!("{prompt} [Y]es/No/Edit: ")
    } else {
        format!("{prompt} [Y]es/No: ")
    };
    let answer = match read_line(&question, "")? {
        LineEnd::Interrupted => return Ok(Resolution::Interrupted),
        LineEnd::Submitted(a) => a,
    };
    Ok(match parse_answer(&answer, editable) {
        Answer::Yes => Resolution::Approved(text.to_string()),
        Answer::No => Resolution::Declined,
        Answer::Edit => match read_line("Edit command: ", text)? {
            LineEnd::Interrupted => Resolution::Interrupted,
            LineEnd::Submitted(edited) if edited.trim().is_empty() => Resolution::Declined,
            LineEnd::Submitted(edited) => Resolution::Approved(edited.trim().to_string()),
        },
    })
}

fn map_key(key: KeyEvent) -> Option<CountdownKey> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char(' ') => Some(CountdownKey::TogglePause),
        KeyCode::Enter => Some(CountdownKey::Skip),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(CountdownKey::Interrupt)
        }
        _ => None,
    }
}

fn print_countdown(countdown: &Countdown) {
    let mut out = io::stdout();
    let _ = queue!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine)
    );
    let _ = write!(out, "{}", countdown.render().yellow());
    let _ = out.flush();
}

/// Interactive operator on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalOperator;

impl Operator for TerminalOperator {
    async fn confirm(&self, prompt: &str, text: &str, editable: bool) -> Resolution {
        let (prompt, text) = (prompt.to_string(), text.to_string());
        let result = tokio::task::spawn_blocking(move || confirm_blocking(&prompt, &text, editable)).await;
        match result {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(e)) => {
                warn!(error = %e, "confirmation prompt failed");
                Resolution::Declined
            }
            Err(e) => {
                warn!(error = %e, "confirmation task failed");
                Resolution::Declined
            }
        }
    }

    async fn countdown(&self, seconds: u64, state: &SessionState) -> CountdownEnd {
        let mut countdown = Countdown::new(seconds);
        if let Some(end) = countdown.end() {
            return end;
        }

        // Single-slot channel: a key pressed while one is pending is dropped.
        let (tx, mut rx) = mpsc::channel::<CountdownKey>(1);
        let stop = Arc::new(AtomicBool::new(false));
        let reader_stop = stop.clone();
        let reader = tokio::task::spawn_blocking(move || -> io::Result<()> {
            let _guard = TerminalGuard::enable()?;
            while !reader_stop.load(Ordering::SeqCst) {
                if !event::poll(Duration::from_millis(100))? {
                    continue;
                }
                if let Event::Key(key) = event::read()? {
                    if let Some(k) = map_key(key) {
                        let _ = tx.try_send(k);
                    }
                }
            }
            Ok(())
        });

        print_countdown(&countdown);
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.tick().await;
        let end = loop {
            tokio::select! {
                Some(key) = rx.recv() => countdown.apply_key(key),
                _ = ticker.tick() => countdown.tick(),
            }
            print_countdown(&countdown);
            if let Some(end) = countdown.end() {
                break end;
            }
        };

        stop.store(true, Ordering::SeqCst);
        if let Ok(Err(e)) = reader.await {
            warn!(error = %e, "countdown key reader failed");
        }
        println!();
        if end == CountdownEnd::Interrupted {
            state.interrupt();
        }
        end
    }

    fn show_reply(&self, message: &str) {
        let mut in_fence = false;
        for line in message.lines() {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                println!("{}", line.dark_grey());
            } else if in_fence {
                println!("{}", line.green());
            } else {
                println!("{line}");
            }
        }
        println!();
    }

    fn show_action(&self, label: &str, text: &str) {
        println!("{} {}", label.dark_grey(), text.yellow());
    }

    fn notice(&self, text: &str) {
        println!("{}", text.dark_grey());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn edit_in_place() {
        let mut line = LineBuffer::with_text("ls -la");
        assert_eq!(line.cursor(), 6);
        line.apply(key(KeyCode::Home));
        line.apply(key(KeyCode::Right));
        line.apply(key(KeyCode::Right));
        line.apply(key(KeyCode::Char('x')));
        assert_eq!(line.text(), "lsx -la");
        line.apply(key(KeyCode::Backspace));
        line.apply(key(KeyCode::End));
        line.apply(key(KeyCode::Char('h')));
        assert_eq!(
            line.apply(key(KeyCode::Enter)),
            Some(LineEnd::Submitted("ls -lah".into()))
        );
    }

    #[test]
    fn ctrl_u_kills_to_start() {
        let mut line = LineBuffer::with_text("rm -rf build");
        line.apply(key(KeyCode::Left));
        line.apply(key(KeyCode::Left));
        line.apply(ctrl('u'));
        assert_eq!(line.text(), "ld");
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    fn ctrl_c_interrupts() {
        let mut line = LineBuffer::default();
        assert_eq!(line.apply(ctrl('c')), Some(LineEnd::Interrupted));
    }

    #[test]
    fn delete_at_end_is_noop() {
        let mut line = LineBuffer::with_text("ab");
        line.apply(key(KeyCode::Delete));
        assert_eq!(line.text(), "ab");
    }

    #[test]
    fn answers() {
        assert_eq!(parse_answer("", true), Answer::Yes);
        assert_eq!(parse_answer(" Yes ", false), Answer::Yes);
        assert_eq!(parse_answer("e", true), Answer::Edit);
        assert_eq!(parse_answer("edit", false), Answer::No);
        assert_eq!(parse_answer("nope", true), Answer::No);
    }

    #[test]
    fn countdown_keys() {
        assert_eq!(map_key(key(KeyCode::Char(' '))), Some(CountdownKey::TogglePause));
        assert_eq!(map_key(key(KeyCode::Enter)), Some(CountdownKey::Skip));
        assert_eq!(map_key(ctrl('c')), Some(CountdownKey::Interrupt));
        assert_eq!(map_key(key(KeyCode::Char('c'))), None);
    }
}
