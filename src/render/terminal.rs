//! Single-line terminal output with a blinking cursor.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use super::Renderer;
use crate::consts::CURSOR_BLINK;
use crate::scheduler::lock;

/// Cursor glyph.
const CURSOR: &str = "▌";

/// Clear the line and return to column 0.
const CLEAR_LINE: &str = "\x1b[2K\r";

struct Line {
    out: Box<dyn Write + Send>,
    visible: String,
    cursor_on: bool,
    frames: u64,
    cycles: u64,
}

impl Line {
    fn draw(&mut self) {
        let cursor = if self.cursor_on { CURSOR } else { " " };
        let _ = write!(self.out, "{CLEAR_LINE}{}{cursor}", self.visible);
        let _ = self.out.flush();
    }

    fn clear(&mut self) {
        let _ = write!(self.out, "{CLEAR_LINE}");
        let _ = self.out.flush();
    }
}

/// Redraws one terminal line for every frame.
///
/// Counts frames and completed cycles (a delete-out that reached the empty
/// string) for the session summary.
pub struct TerminalRenderer {
    line: Mutex<Line>,
}

impl TerminalRenderer {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            line: Mutex::new(Line {
                out: Box::new(out),
                visible: String::new(),
                cursor_on: true,
                frames: 0,
                cycles: 0,
            }),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn frames(&self) -> u64 {
        lock(&self.line).frames
    }

    pub fn cycles(&self) -> u64 {
        lock(&self.line).cycles
    }

    /// Flip the cursor and redraw the current text.
    pub fn toggle_cursor(&self) {
        let mut line = lock(&self.line);
        line.cursor_on = !line.cursor_on;
        line.draw();
    }

    /// Wipe the line, e.g. before printing a summary.
    pub fn clear(&self) {
        lock(&self.line).clear();
    }
}

impl Renderer for TerminalRenderer {
    fn render(&self, visible: &str, deleting: bool) {
        let mut line = lock(&self.line);
        line.visible.clear();
        line.visible.push_str(visible);
        line.cursor_on = true;
        line.frames += 1;
        if deleting && visible.is_empty() {
            line.cycles += 1;
        }
        line.draw();
    }
}

/// Blinks the cursor of a [`TerminalRenderer`] from a background task.
///
/// Call [`CursorBlink::start`] to begin, then [`CursorBlink::stop`] when done.
pub struct CursorBlink {
    handle: JoinHandle<()>,
    cancel: tokio::sync::watch::Sender<bool>,
}

impl CursorBlink {
    pub fn start(renderer: Arc<TerminalRenderer>) -> Self {
        let (cancel_tx, mut cancel_rx) = tokio::sync::watch::channel(false);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(CURSOR_BLINK) => renderer.toggle_cursor(),
                    _ = cancel_rx.changed() => break,
                }
            }
            renderer.clear();
        });

        Self {
            handle,
            cancel: cancel_tx,
        }
    }

    /// Stop blinking and clear the line.
    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        let _ = self.handle.await;
    }
}
