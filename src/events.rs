//! Progress reports from running animations.
//!
//! A [`TextSequencer`](crate::sequencer::TextSequencer) or
//! [`PanelController`](crate::panel::PanelController) built with a bus
//! publishes every phase change and frame on it, in the order they happen.
//! The CLI listens here to know when a sequence has gone inert.

use tokio::sync::broadcast;

use crate::panel::PanelView;
use crate::sequencer::Phase;

/// Frames buffered per listener before a slow one starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A sequence entered a new phase.
    PhaseChanged { generation: u64, phase: Phase },
    /// A sequence rendered new text.
    Frame {
        generation: u64,
        visible: String,
        deleting: bool,
    },
    /// The sliding panel moved to a new view.
    Panel(PanelView),
}

/// Fan-out of [`Event`]s to any number of listeners.
///
/// Publishing never blocks the tick that reports it. A listener that falls
/// more than the capacity behind sees `RecvError::Lagged`.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns how many listeners the event reached; zero is not an error.
    pub fn publish(&self, event: Event) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Events published from now on. Nothing is replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
