//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only
//! - Time comes from the tick's dt, never the wall clock
//! - No rendering, audio or DOM dependencies; outbound intents go through
//!   the event queue

pub mod collision;
pub mod effects;
pub mod events;
pub mod obstacles;
pub mod spawn;
pub mod stage;
pub mod state;
pub mod tick;
pub mod traffic;
pub mod vehicle;

pub use collision::{CollisionContext, CollisionCoordinator, CollisionReport};
pub use effects::{ImpactProfile, Severity, SpeedEffect, SpeedEffects};
pub use events::{ActorId, ActorKind, EffectKind, EventQueue, GameEvent, SoundCue};
pub use obstacles::{Obstacle, ObstacleField, ObstacleHit, ObstacleKind};
pub use spawn::{IdAllocator, SpawnOutcome};
pub use stage::{LapOutcome, LapTracker, StageConfig, StageController, default_stages};
pub use state::{GamePhase, GameState};
pub use tick::{TickInput, tick};
pub use traffic::{TrafficHit, TrafficManager, TrafficVehicle};
pub use vehicle::{Controls, LightState, PlayerVehicle};
