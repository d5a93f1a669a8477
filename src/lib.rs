pub mod banner;
pub mod consts;
pub mod error;
pub mod events;
pub mod panel;
pub mod presets;
pub mod render;
pub mod scheduler;
pub mod sequencer;
