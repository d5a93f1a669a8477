//! The typewriter state machine.
//!
//! A [`TextSequencer`] drives one text through type-in, hold, delete-out and
//! restart on timers registered with a [`Scheduler`]. Every tick captures the
//! generation it was scheduled under; restarts and cancellation bump the
//! generation, so a tick that fires late finds a mismatch and does nothing.
//!
//! Only one tick per instance is ever pending, so ticks never overlap.

mod slot;
mod text;

pub use slot::SequencerSlot;
pub use text::{Glyphs, Granularity};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use parking_lot::ReentrantMutex;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::consts::{
    DEFAULT_DELETE_INTERVAL_MS, DEFAULT_HOLD_MS, DEFAULT_RESTART_PAUSE_MS,
    DEFAULT_TYPE_INTERVAL_MS,
};
use crate::error::{SequenceError, SequenceResult};
use crate::events::{Event, EventBus};
use crate::render::Renderer;
use crate::scheduler::{Scheduler, TimerToken, lock};

/// What to animate and how fast. Durations are milliseconds.
///
/// Durations are signed so that bad input survives deserialization and is
/// rejected by [`SequenceConfig::timings`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub text: String,
    pub start_delay_ms: i64,
    pub type_interval_ms: i64,
    pub delete_interval_ms: i64,
    pub hold_ms: i64,
    pub restart_pause_ms: i64,
    #[serde(rename = "loop")]
    pub looping: bool,
    /// When false the full text is rendered once and nothing is scheduled.
    pub enabled: bool,
    pub granularity: Granularity,
    /// Scales each type/delete interval by a random factor in
    /// `[1 - jitter, 1 + jitter]`. Must lie in `[0, 1]`.
    pub jitter: f64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            start_delay_ms: 0,
            type_interval_ms: DEFAULT_TYPE_INTERVAL_MS,
            delete_interval_ms: DEFAULT_DELETE_INTERVAL_MS,
            hold_ms: DEFAULT_HOLD_MS,
            restart_pause_ms: DEFAULT_RESTART_PAUSE_MS,
            looping: true,
            enabled: true,
            granularity: Granularity::default(),
            jitter: 0.0,
        }
    }
}

impl SequenceConfig {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Validate the config and convert its durations.
    pub fn timings(&self) -> SequenceResult<Timings> {
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(SequenceError::invalid(format!(
                "jitter must be within [0, 1], got {}",
                self.jitter
            )));
        }
        Ok(Timings {
            start_delay: millis("start_delay_ms", self.start_delay_ms)?,
            type_interval: millis("type_interval_ms", self.type_interval_ms)?,
            delete_interval: millis("delete_interval_ms", self.delete_interval_ms)?,
            hold: millis("hold_ms", self.hold_ms)?,
            restart_pause: millis("restart_pause_ms", self.restart_pause_ms)?,
        })
    }
}

fn millis(field: &str, value: i64) -> SequenceResult<Duration> {
    u64::try_from(value)
        .map(Duration::from_millis)
        .map_err(|_| SequenceError::invalid(format!("{field} must be non-negative, got {value}")))
}

/// Validated durations of a [`SequenceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub start_delay: Duration,
    pub type_interval: Duration,
    pub delete_interval: Duration,
    pub hold: Duration,
    pub restart_pause: Duration,
}

/// Where a sequence is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    TypingIn,
    Holding,
    DeletingOut,
    RestartPause,
    /// Inert: a non-looping sequence finished typing, or it was cancelled.
    Finished,
}

/// Snapshot of a running sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerState {
    /// Always a prefix of the configured text.
    pub visible: String,
    pub phase: Phase,
    pub generation: u64,
}

struct Inner {
    state: SequencerState,
    /// Units of text currently shown.
    shown: usize,
    pending: Option<TimerToken>,
    cancelled: bool,
}

/// One running instance. Owned by its pending tick and its handles.
struct Sequence {
    glyphs: Glyphs,
    timings: Timings,
    looping: bool,
    jitter: f64,
    inner: Mutex<Inner>,
    /// Held while a tick renders. Reentrant so a renderer may cancel its
    /// own sequence.
    gate: ReentrantMutex<()>,
    renderer: Arc<dyn Renderer>,
    scheduler: Arc<dyn Scheduler>,
    events: Option<Arc<EventBus>>,
}

/// One observable effect of a tick, replayed in order after the state lock
/// is released.
enum Change {
    Entered(Phase),
    Frame { visible: String, deleting: bool },
}

impl Sequence {
    fn tick(self: Arc<Self>, generation: u64) {
        let mut inner = lock(&self.inner);
        if inner.cancelled || inner.state.generation != generation {
            trace!(
                generation,
                current = inner.state.generation,
                "stale tick dropped"
            );
            return;
        }
        inner.pending = None;

        let changes = self.advance(&mut inner);
        let generation = inner.state.generation;
        let phase = inner.state.phase;
        drop(inner);

        {
            // Cancel takes the same gate, so it cannot land between the
            // check and the render.
            let _gate = self.gate.lock();
            for change in changes {
                if lock(&self.inner).cancelled {
                    trace!(generation, "cancelled mid-tick");
                    return;
                }
                match change {
                    Change::Entered(phase) => self.announce(generation, phase),
                    Change::Frame { visible, deleting } => {
                        self.renderer.render(&visible, deleting);
                        if let Some(bus) = &self.events {
                            bus.publish(Event::Frame {
                                generation,
                                visible,
                                deleting,
                            });
                        }
                    }
                }
            }
        }

        if let Some(delay) = self.delay_for(phase) {
            self.schedule(delay, generation);
        }
    }

    /// Apply one tick's worth of the state machine.
    fn advance(&self, inner: &mut Inner) -> Vec<Change> {
        let mut changes = Vec::new();
        match inner.state.phase {
            Phase::Idle => {
                enter(inner, &mut changes, Phase::TypingIn);
                self.reveal(inner, &mut changes);
            }
            Phase::TypingIn => self.reveal(inner, &mut changes),
            Phase::Holding => {
                enter(inner, &mut changes, Phase::DeletingOut);
                self.remove(inner, &mut changes);
            }
            Phase::DeletingOut => self.remove(inner, &mut changes),
            Phase::RestartPause => {
                inner.state.generation += 1;
                enter(inner, &mut changes, Phase::TypingIn);
                self.reveal(inner, &mut changes);
            }
            Phase::Finished => {}
        }
        changes
    }

    fn reveal(&self, inner: &mut Inner, changes: &mut Vec<Change>) {
        if inner.shown < self.glyphs.len() {
            inner.shown += 1;
            inner.state.visible = self.glyphs.prefix(inner.shown).to_string();
            changes.push(Change::Frame {
                visible: inner.state.visible.clone(),
                deleting: false,
            });
        }
        if inner.shown == self.glyphs.len() {
            let next = if self.looping {
                Phase::Holding
            } else {
                Phase::Finished
            };
            enter(inner, changes, next);
        }
    }

    fn remove(&self, inner: &mut Inner, changes: &mut Vec<Change>) {
        if inner.shown > 0 {
            inner.shown -= 1;
            inner.state.visible = self.glyphs.prefix(inner.shown).to_string();
            changes.push(Change::Frame {
                visible: inner.state.visible.clone(),
                deleting: true,
            });
        }
        if inner.shown == 0 {
            enter(inner, changes, Phase::RestartPause);
        }
    }

    /// Wait before the next tick in `phase`, or `None` when inert.
    fn delay_for(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Idle => Some(self.timings.start_delay),
            Phase::TypingIn => Some(self.jittered(self.timings.type_interval)),
            Phase::Holding => Some(self.timings.hold),
            Phase::DeletingOut => Some(self.jittered(self.timings.delete_interval)),
            Phase::RestartPause => Some(self.timings.restart_pause),
            Phase::Finished => None,
        }
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.jitter <= 0.0 || base.is_zero() {
            return base;
        }
        let factor = rand::rng().random_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        base.mul_f64(factor)
    }

    /// Register the next tick, unless the sequence moved on meanwhile.
    ///
    /// Holds the state lock across registration so a tick that fires on
    /// another thread cannot observe `pending` before it is stored.
    fn schedule(self: &Arc<Self>, delay: Duration, generation: u64) {
        let mut inner = lock(&self.inner);
        if inner.cancelled || inner.state.generation != generation {
            return;
        }
        let sequence = Arc::clone(self);
        let token = self
            .scheduler
            .schedule_after(delay, Box::new(move || sequence.tick(generation)));
        inner.pending = Some(token);
    }

    fn announce(&self, generation: u64, phase: Phase) {
        debug!(generation, ?phase, "phase changed");
        if let Some(bus) = &self.events {
            bus.publish(Event::PhaseChanged { generation, phase });
        }
    }
}

fn enter(inner: &mut Inner, changes: &mut Vec<Change>, phase: Phase) {
    inner.state.phase = phase;
    changes.push(Change::Entered(phase));
}

/// Starts sequences on a shared scheduler.
#[derive(Clone)]
pub struct TextSequencer {
    scheduler: Arc<dyn Scheduler>,
    events: Option<Arc<EventBus>>,
}

impl TextSequencer {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            events: None,
        }
    }

    /// Report phase changes and frames on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Start a new instance.
    ///
    /// Fails with [`SequenceError::InvalidConfiguration`] before anything is
    /// scheduled. A disabled config renders the full text once, synchronously.
    pub fn start(
        &self,
        config: &SequenceConfig,
        renderer: Arc<dyn Renderer>,
    ) -> SequenceResult<Handle> {
        let timings = config.timings()?;

        if !config.enabled {
            renderer.render(&config.text, false);
            return Ok(Handle {
                kind: HandleKind::Static(SequencerState {
                    visible: config.text.clone(),
                    phase: Phase::Finished,
                    generation: 0,
                }),
            });
        }

        let sequence = Arc::new(Sequence {
            glyphs: Glyphs::new(&config.text, config.granularity),
            timings,
            looping: config.looping,
            jitter: config.jitter,
            inner: Mutex::new(Inner {
                state: SequencerState {
                    visible: String::new(),
                    phase: Phase::Idle,
                    generation: 0,
                },
                shown: 0,
                pending: None,
                cancelled: false,
            }),
            gate: ReentrantMutex::new(()),
            renderer,
            scheduler: Arc::clone(&self.scheduler),
            events: self.events.clone(),
        });

        debug!(
            units = sequence.glyphs.len(),
            looping = config.looping,
            "sequence started"
        );
        sequence.announce(0, Phase::Idle);
        sequence.schedule(timings.start_delay, 0);

        Ok(Handle {
            kind: HandleKind::Running(sequence),
        })
    }
}

#[derive(Clone)]
enum HandleKind {
    Static(SequencerState),
    Running(Arc<Sequence>),
}

/// Controls one started instance. Dropping a handle does not cancel it.
#[derive(Clone)]
pub struct Handle {
    kind: HandleKind,
}

impl Handle {
    /// Invalidate every pending and future tick. Idempotent.
    ///
    /// If a tick is rendering on another thread, this waits for that frame
    /// to finish. Once it returns the renderer is never called again.
    pub fn cancel(&self) {
        let HandleKind::Running(sequence) = &self.kind else {
            return;
        };
        let _gate = sequence.gate.lock();
        let mut inner = lock(&sequence.inner);
        if inner.cancelled {
            return;
        }
        inner.cancelled = true;
        inner.state.generation += 1;
        inner.state.phase = Phase::Finished;
        let generation = inner.state.generation;
        let pending = inner.pending.take();
        drop(inner);

        if let Some(token) = pending {
            token.cancel();
        }
        debug!(generation, "sequence cancelled");
        sequence.announce(generation, Phase::Finished);
    }

    pub fn state(&self) -> SequencerState {
        match &self.kind {
            HandleKind::Static(state) => state.clone(),
            HandleKind::Running(sequence) => lock(&sequence.inner).state.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn visible(&self) -> String {
        self.state().visible
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// True once the sequence reached its terminal phase.
    pub fn is_finished(&self) -> bool {
        self.phase() == Phase::Finished
    }
}
