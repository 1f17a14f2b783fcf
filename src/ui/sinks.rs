//! Presentation sinks
//!
//! Sinks are fire-and-forget from the simulation's point of view: failures are
//! logged and dropped, never fed back into the tick.

use thiserror::Error;

use super::hud::HudSnapshot;
use crate::settings::Settings;
use crate::sim::{ActorId, ActorKind, EffectKind, GameEvent, SoundCue};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("missing element #{0}")]
    MissingElement(String),
    #[error("{sink} sink failed: {reason}")]
    Failed { sink: &'static str, reason: String },
}

/// Scene graph: one visual actor per simulated entity
pub trait SceneSink {
    fn spawn(&mut self, id: ActorId, kind: ActorKind) -> Result<(), SinkError>;
    fn despawn(&mut self, id: ActorId) -> Result<(), SinkError>;
}

/// Screen effects, audio and transient banners
pub trait EffectSink {
    fn effect(&mut self, kind: EffectKind, intensity: f32, duration_ms: f64)
    -> Result<(), SinkError>;
    fn sound(&mut self, cue: SoundCue, volume: f32) -> Result<(), SinkError>;
    fn banner(&mut self, text: &str) -> Result<(), SinkError>;
}

pub trait HudSink {
    fn update(&mut self, hud: &HudSnapshot) -> Result<(), SinkError>;
}

/// Counts of what a presentation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentStats {
    pub delivered: usize,
    pub suppressed: usize,
    pub failed: usize,
}

/// Routes drained events to the sinks, applying player preferences
pub struct Presenter<S, E, H> {
    pub scene: S,
    pub effects: E,
    pub hud: H,
    pub settings: Settings,
}

impl<S: SceneSink, E: EffectSink, H: HudSink> Presenter<S, E, H> {
    pub fn new(scene: S, effects: E, hud: H, settings: Settings) -> Self {
        Self {
            scene,
            effects,
            hud,
            settings,
        }
    }

    pub fn present(&mut self, events: Vec<GameEvent>, hud: &HudSnapshot) -> PresentStats {
        let mut stats = PresentStats::default();
        for event in events {
            let result = match event {
                GameEvent::ActorSpawned { id, kind } => Some(self.scene.spawn(id, kind)),
                GameEvent::ActorDespawned { id } => Some(self.scene.despawn(id)),
                GameEvent::Effect {
                    kind,
                    intensity,
                    duration_ms,
                } => kind
                    .keep(
                        self.settings.effective_screen_shake(),
                        self.settings.effective_impact_flash(),
                    )
                    .map(|kind| self.effects.effect(kind, intensity, duration_ms)),
                GameEvent::Sound { cue, intensity } => {
                    let volume = self.settings.effective_sfx_volume(intensity);
                    if volume > 0.0 {
                        Some(self.effects.sound(cue, volume))
                    } else {
                        None
                    }
                }
                GameEvent::StageEntered {
                    ref name,
                    ref description,
                    ..
                } => Some(self.effects.banner(&format!("Entering {} - {}", name, description))),
                GameEvent::Countdown { count } => Some(self.effects.banner(&countdown_text(count))),
                GameEvent::LapCompleted { lap, max_laps } => {
                    Some(self.effects.banner(&format!("Lap {} of {}", lap, max_laps)))
                }
                GameEvent::Victory { score } => {
                    Some(self.effects.banner(&format!("Victory! Final score: {}", score)))
                }
            };
            match result {
                Some(Ok(())) => stats.delivered += 1,
                Some(Err(e)) => {
                    log::warn!("Dropped presentation event: {}", e);
                    stats.failed += 1;
                }
                None => stats.suppressed += 1,
            }
        }

        if let Err(e) = self.hud.update(hud) {
            log::warn!("HUD update failed: {}", e);
            stats.failed += 1;
        }
        stats
    }
}

fn countdown_text(count: u32) -> String {
    if count > 0 { count.to_string() } else { "GO!".to_string() }
}

/// Sink that narrates everything through the log; used by the headless run
#[derive(Debug, Default)]
pub struct LogSink {
    pub actors: usize,
}

impl SceneSink for LogSink {
    fn spawn(&mut self, id: ActorId, kind: ActorKind) -> Result<(), SinkError> {
        self.actors += 1;
        log::debug!("spawn {:?} {:?}", id, kind);
        Ok(())
    }

    fn despawn(&mut self, id: ActorId) -> Result<(), SinkError> {
        self.actors = self.actors.saturating_sub(1);
        log::debug!("despawn {:?}", id);
        Ok(())
    }
}

impl EffectSink for LogSink {
    fn effect(
        &mut self,
        kind: EffectKind,
        intensity: f32,
        duration_ms: f64,
    ) -> Result<(), SinkError> {
        log::debug!("{:?} x{:.2} for {}ms", kind, intensity, duration_ms);
        Ok(())
    }

    fn sound(&mut self, cue: SoundCue, volume: f32) -> Result<(), SinkError> {
        log::debug!("sound {} at {:.2}", cue.as_str(), volume);
        Ok(())
    }

    fn banner(&mut self, text: &str) -> Result<(), SinkError> {
        log::info!("{}", text);
        Ok(())
    }
}

impl HudSink for LogSink {
    fn update(&mut self, _hud: &HudSnapshot) -> Result<(), SinkError> {
        Ok(())
    }
}
