use std::sync::Arc;

use tracing::debug;

use super::{Handle, SequenceConfig, TextSequencer};
use crate::error::SequenceResult;
use crate::render::Renderer;

/// Holds at most one running sequence for a renderer.
///
/// Playing a new config replaces the current instance; dropping the slot
/// cancels it.
pub struct SequencerSlot {
    sequencer: TextSequencer,
    renderer: Arc<dyn Renderer>,
    current: Option<Handle>,
}

impl SequencerSlot {
    pub fn new(sequencer: TextSequencer, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            sequencer,
            renderer,
            current: None,
        }
    }

    /// Replace the running sequence with one for `config`.
    ///
    /// An invalid config is rejected before the current sequence is touched.
    pub fn play(&mut self, config: &SequenceConfig) -> SequenceResult<&Handle> {
        config.timings()?;
        self.stop();
        let handle = self.sequencer.start(config, Arc::clone(&self.renderer))?;
        debug!("slot switched to a new sequence");
        Ok(&*self.current.insert(handle))
    }

    /// Cancel the running sequence, if any.
    pub fn stop(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.cancel();
        }
    }

    pub fn current(&self) -> Option<&Handle> {
        self.current.as_ref()
    }
}

impl Drop for SequencerSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::manual::ManualScheduler;
    use std::sync::Mutex;
    use std::time::Duration;

    fn setup() -> (Arc<ManualScheduler>, Arc<Mutex<Vec<String>>>, SequencerSlot) {
        let clock = Arc::new(ManualScheduler::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let renderer: Arc<dyn Renderer> = Arc::new(move |visible: &str, _deleting: bool| {
            sink.lock().unwrap().push(visible.to_string());
        });
        let slot = SequencerSlot::new(TextSequencer::new(clock.clone()), renderer);
        (clock, seen, slot)
    }

    fn typing(text: &str) -> SequenceConfig {
        SequenceConfig {
            type_interval_ms: 10,
            looping: false,
            ..SequenceConfig::new(text)
        }
    }

    #[test]
    fn new_config_replaces_old_sequence() {
        let (clock, seen, mut slot) = setup();

        slot.play(&typing("abc")).unwrap();
        clock.advance(Duration::from_millis(5));
        slot.play(&typing("xy")).unwrap();
        clock.advance(Duration::from_millis(100));

        assert_eq!(*seen.lock().unwrap(), vec!["a", "x", "xy"]);
    }

    #[test]
    fn invalid_config_keeps_current_sequence() {
        let (clock, seen, mut slot) = setup();

        slot.play(&typing("ab")).unwrap();
        let bad = SequenceConfig {
            hold_ms: -1,
            ..typing("zz")
        };
        assert!(slot.play(&bad).is_err());
        clock.advance(Duration::from_millis(100));

        assert_eq!(*seen.lock().unwrap(), vec!["a", "ab"]);
        assert!(slot.current().is_some());
    }

    #[test]
    fn drop_cancels() {
        let (clock, seen, mut slot) = setup();
        slot.play(&typing("abc")).unwrap();
        drop(slot);

        clock.advance(Duration::from_millis(100));
        assert!(seen.lock().unwrap().is_empty());
    }
}
