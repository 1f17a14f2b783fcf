//! Presentation boundary
//!
//! The simulation never touches the DOM, audio or scene graph. After each tick
//! the host captures a [`HudSnapshot`] and hands the drained events to a
//! [`Presenter`], which fans them out to the sinks.

pub mod hud;
pub mod sinks;

pub use hud::HudSnapshot;
pub use sinks::{EffectSink, HudSink, LogSink, PresentStats, Presenter, SceneSink, SinkError};
