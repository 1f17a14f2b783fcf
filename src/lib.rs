//! Future Drive - a lane-based driving game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (vehicle, traffic, obstacles, stages)
//! - `ui`: HUD snapshot and presentation sinks
//! - `platform`: Browser/native platform abstraction
//! - `tuning`: Data-driven game balance
//! - `settings`, `highscores`: Persisted player data

pub mod highscores;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod ui;

pub use highscores::HighScores;
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Nominal frame time; the simulation ticks once per rendered frame
    pub const FRAME_DT: f32 = 1.0 / 60.0;
    /// Longest frame the simulation will integrate (tab switches, stalls)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Player sits at the origin of the longitudinal axis
    pub const PLAYER_Z: f32 = 0.0;
}
