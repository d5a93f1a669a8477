//! The sliding two-panel login/signup transition.
//!
//! What the card looks like is a pure function of [`PanelState`] (see
//! [`view`]). [`PanelController`] walks that state through a fixed chain of
//! timed toggles whenever the form changes, using the same generation-tag
//! approach as the sequencer so an interrupted switch leaves no stragglers.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::consts::{DEFAULT_PANEL_EXPAND, DEFAULT_PANEL_SETTLE, DEFAULT_PANEL_SWAP};
use crate::events::{Event, EventBus};
use crate::scheduler::{Scheduler, TimerToken, lock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Form {
    Login,
    Signup,
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Form::Login => f.write_str("login"),
            Form::Signup => f.write_str("signup"),
        }
    }
}

/// The three toggles the transition chains together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelState {
    /// The overlay panel covers the whole card.
    pub panel_open: bool,
    /// The form content may be shown.
    pub panel_ready: bool,
    pub login_view: bool,
}

impl PanelState {
    /// At rest on `form`.
    pub fn settled(form: Form) -> Self {
        Self {
            panel_open: false,
            panel_ready: true,
            login_view: form == Form::Login,
        }
    }

    pub fn form(&self) -> Form {
        if self.login_view {
            Form::Login
        } else {
            Form::Signup
        }
    }
}

/// What the renderer paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub width_pct: u8,
    /// Left edge of the overlay panel.
    pub offset_pct: u8,
    pub content_visible: bool,
    pub form: Form,
}

/// Map panel toggles to a paintable view.
///
/// At rest the overlay covers the half opposite the form: the right half for
/// login, the left half for signup.
pub fn view(state: PanelState) -> PanelView {
    let (width_pct, offset_pct) = match (state.panel_open, state.login_view) {
        (true, _) => (100, 0),
        (false, true) => (50, 50),
        (false, false) => (50, 0),
    };
    PanelView {
        width_pct,
        offset_pct,
        content_visible: state.panel_ready && !state.panel_open,
        form: state.form(),
    }
}

/// Delays between the toggles of one switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelTimings {
    /// Panel covering the card, before the form flips.
    pub expand: Duration,
    /// Flipped form, before the panel slides back.
    pub swap: Duration,
    /// Panel back at rest, before the content shows.
    pub settle: Duration,
}

impl PanelTimings {
    pub fn total(&self) -> Duration {
        self.expand + self.swap + self.settle
    }
}

impl Default for PanelTimings {
    fn default() -> Self {
        Self {
            expand: DEFAULT_PANEL_EXPAND,
            swap: DEFAULT_PANEL_SWAP,
            settle: DEFAULT_PANEL_SETTLE,
        }
    }
}

/// Receives every view the controller moves through.
pub trait PanelObserver: Send + Sync {
    fn on_view(&self, view: PanelView);
}

impl<F> PanelObserver for F
where
    F: Fn(PanelView) + Send + Sync,
{
    fn on_view(&self, view: PanelView) {
        self(view)
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Flip,
    Collapse,
    Reveal,
}

struct Control {
    panel: PanelState,
    target: Form,
    generation: u64,
    pending: Option<TimerToken>,
}

struct Shared {
    control: Mutex<Control>,
    timings: PanelTimings,
    scheduler: Arc<dyn Scheduler>,
    observer: Arc<dyn PanelObserver>,
    events: Option<Arc<EventBus>>,
}

/// Drives [`PanelState`] through a switch between forms.
#[derive(Clone)]
pub struct PanelController {
    shared: Arc<Shared>,
}

impl PanelController {
    pub fn new(
        initial: Form,
        timings: PanelTimings,
        scheduler: Arc<dyn Scheduler>,
        observer: Arc<dyn PanelObserver>,
    ) -> Self {
        Self::build(initial, timings, scheduler, observer, None)
    }

    /// Same as [`PanelController::new`], also emitting [`Event::Panel`] on `bus`.
    pub fn with_events(
        initial: Form,
        timings: PanelTimings,
        scheduler: Arc<dyn Scheduler>,
        observer: Arc<dyn PanelObserver>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self::build(initial, timings, scheduler, observer, Some(bus))
    }

    fn build(
        initial: Form,
        timings: PanelTimings,
        scheduler: Arc<dyn Scheduler>,
        observer: Arc<dyn PanelObserver>,
        events: Option<Arc<EventBus>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    panel: PanelState::settled(initial),
                    target: initial,
                    generation: 0,
                    pending: None,
                }),
                timings,
                scheduler,
                observer,
                events,
            }),
        }
    }

    pub fn state(&self) -> PanelState {
        lock(&self.shared.control).panel
    }

    pub fn view(&self) -> PanelView {
        view(self.state())
    }

    /// Start moving to `form`. Switching to the form already targeted is a
    /// no-op; switching mid-transition abandons the old chain.
    pub fn switch_to(&self, form: Form) {
        let mut control = lock(&self.shared.control);
        if control.target == form {
            return;
        }
        control.generation += 1;
        control.target = form;
        control.panel.panel_open = true;
        control.panel.panel_ready = false;
        let generation = control.generation;
        let snapshot = control.panel;
        let stale = control.pending.take();
        drop(control);

        if let Some(token) = stale {
            token.cancel();
        }
        debug!(%form, generation, "panel switch started");
        self.shared.notify(snapshot);
        Shared::schedule(&self.shared, self.shared.timings.expand, Stage::Flip, generation);
    }
}

impl Shared {
    fn step(self: Arc<Self>, stage: Stage, generation: u64) {
        let mut control = lock(&self.control);
        if control.generation != generation {
            return;
        }
        control.pending = None;
        let next = match stage {
            Stage::Flip => {
                control.panel.login_view = control.target == Form::Login;
                Some((self.timings.swap, Stage::Collapse))
            }
            Stage::Collapse => {
                control.panel.panel_open = false;
                Some((self.timings.settle, Stage::Reveal))
            }
            Stage::Reveal => {
                control.panel.panel_ready = true;
                None
            }
        };
        let snapshot = control.panel;
        drop(control);

        debug!(?stage, generation, "panel stage");
        self.notify(snapshot);
        if let Some((delay, stage)) = next {
            Shared::schedule(&self, delay, stage, generation);
        }
    }

    fn schedule(this: &Arc<Self>, delay: Duration, stage: Stage, generation: u64) {
        let mut control = lock(&this.control);
        if control.generation != generation {
            return;
        }
        let shared = Arc::clone(this);
        let token = this
            .scheduler
            .schedule_after(delay, Box::new(move || shared.step(stage, generation)));
        control.pending = Some(token);
    }

    fn notify(&self, state: PanelState) {
        let view = view(state);
        self.observer.on_view(view);
        if let Some(bus) = &self.events {
            bus.publish(Event::Panel(view));
        }
    }
}
