//! Outbound intents produced by the simulation
//!
//! The tick never calls into rendering or audio. It appends events here and the
//! presentation layer drains them after the tick completes.

use serde::{Deserialize, Serialize};

use super::obstacles::ObstacleKind;

/// Opaque handle tying a visual actor to a simulated entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

/// What kind of visual an actor handle stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    Truck,
    Obstacle(ObstacleKind),
}

/// Screen effect requested on impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    Shake,
    /// White impact flash
    Flash,
    /// Screen shake with a white flash
    ShakeFlash,
}

impl EffectKind {
    pub fn has_shake(self) -> bool {
        matches!(self, EffectKind::Shake | EffectKind::ShakeFlash)
    }

    pub fn has_flash(self) -> bool {
        matches!(self, EffectKind::Flash | EffectKind::ShakeFlash)
    }

    /// What remains of this effect with the given parts enabled
    pub fn keep(self, shake: bool, flash: bool) -> Option<EffectKind> {
        match (self.has_shake() && shake, self.has_flash() && flash) {
            (true, true) => Some(EffectKind::ShakeFlash),
            (true, false) => Some(EffectKind::Shake),
            (false, true) => Some(EffectKind::Flash),
            (false, false) => None,
        }
    }
}

/// Discrete audio cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    Crash,
    Bump,
    Thud,
    Brake,
    Point,
    Magic,
    /// Countdown beat
    Menu,
}

impl SoundCue {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundCue::Crash => "crash",
            SoundCue::Bump => "bump",
            SoundCue::Thud => "thud",
            SoundCue::Brake => "brake",
            SoundCue::Point => "point",
            SoundCue::Magic => "magic",
            SoundCue::Menu => "menu",
        }
    }
}

/// Everything the simulation asks of the outside world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ActorSpawned { id: ActorId, kind: ActorKind },
    ActorDespawned { id: ActorId },
    Effect {
        kind: EffectKind,
        intensity: f32,
        duration_ms: f64,
    },
    Sound { cue: SoundCue, intensity: f32 },
    /// Pre-race count; 0 is "GO!"
    Countdown { count: u32 },
    StageEntered {
        stage: u32,
        name: String,
        description: String,
        terminal: bool,
    },
    LapCompleted { lap: u32, max_laps: u32 },
    Victory { score: u64 },
}

/// Queue of events produced during ticks, drained by the presentation layer
#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn sound(&mut self, cue: SoundCue, intensity: f32) {
        self.events.push(GameEvent::Sound { cue, intensity });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }

    /// Take every pending event, leaving the queue empty
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
