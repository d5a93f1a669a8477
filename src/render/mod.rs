//! Where sequencer frames end up.

pub mod terminal;

/// Receives every frame a sequencer produces.
///
/// Implemented for any `Fn(&str, bool)` closure, so tests can collect
/// frames without a dedicated type.
pub trait Renderer: Send + Sync {
    /// `visible` is the current prefix, `deleting` is true during delete-out.
    fn render(&self, visible: &str, deleting: bool);
}

impl<F> Renderer for F
where
    F: Fn(&str, bool) + Send + Sync,
{
    fn render(&self, visible: &str, deleting: bool) {
        self(visible, deleting)
    }
}
