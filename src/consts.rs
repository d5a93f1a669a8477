//! Project-wide constants.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Delay between revealed characters.
pub const DEFAULT_TYPE_INTERVAL_MS: i64 = 90;

/// Delay between removed characters.
pub const DEFAULT_DELETE_INTERVAL_MS: i64 = 45;

/// How long the full text stays on screen before deletion starts.
pub const DEFAULT_HOLD_MS: i64 = 1_500;

/// Pause between an emptied line and the next type-in.
pub const DEFAULT_RESTART_PAUSE_MS: i64 = 250;

/// Panel grows to cover the card.
pub const DEFAULT_PANEL_EXPAND: Duration = Duration::from_millis(600);

/// Covered panel swaps its form.
pub const DEFAULT_PANEL_SWAP: Duration = Duration::from_millis(400);

/// Panel slides back and the content fades in.
pub const DEFAULT_PANEL_SETTLE: Duration = Duration::from_millis(800);

/// Cursor blink half-period.
pub const CURSOR_BLINK: Duration = Duration::from_millis(530);

/// Text played when none is given.
pub const DEFAULT_TEXT: &str = "Build fast. Ship pretty. Scale with confidence.";

/// Default database path: `~/.typist/typist.db`.
pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".typist").join("typist.db"))
}

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Format a millisecond count for display, e.g. `1,500ms`.
pub fn format_ms(ms: i64) -> String {
    if ms < 0 {
        format!("-{}ms", format_number(ms.unsigned_abs()))
    } else {
        format!("{}ms", format_number(ms as u64))
    }
}
