//! Transient speed penalties
//!
//! Collisions push a [`SpeedEffect`]; while any effect is live the effective speed
//! multiplier is the strongest (smallest) one.

use serde::{Deserialize, Serialize};

use super::events::SoundCue;

/// Qualitative severity of a collision, used to pick presentation effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Light,
    Medium,
    Heavy,
}

/// Presentation response to an impact
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactProfile {
    pub shake: f32,
    pub duration_ms: f64,
    pub cue: SoundCue,
}

impl Severity {
    pub fn impact(self) -> ImpactProfile {
        match self {
            Severity::Light => ImpactProfile {
                shake: 0.3,
                duration_ms: 500.0,
                cue: SoundCue::Bump,
            },
            Severity::Medium => ImpactProfile {
                shake: 0.5,
                duration_ms: 800.0,
                cue: SoundCue::Thud,
            },
            Severity::Heavy => ImpactProfile {
                shake: 0.8,
                duration_ms: 1000.0,
                cue: SoundCue::Crash,
            },
        }
    }
}

/// A multiplicative speed penalty that expires at a simulation timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedEffect {
    /// 0 < multiplier <= 1
    pub multiplier: f32,
    /// Simulation clock (ms) at which the effect ends
    pub expires_at_ms: f64,
}

/// Active speed effects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeedEffects {
    active: Vec<SpeedEffect>,
}

impl SpeedEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a penalty lasting `recovery_ms` from `now_ms`
    pub fn add(&mut self, multiplier: f32, recovery_ms: f64, now_ms: f64) {
        self.active.push(SpeedEffect {
            multiplier: multiplier.clamp(f32::MIN_POSITIVE, 1.0),
            expires_at_ms: now_ms + recovery_ms,
        });
    }

    /// Drop effects whose expiry is not after `now_ms`
    pub fn prune(&mut self, now_ms: f64) {
        self.active.retain(|e| e.expires_at_ms > now_ms);
    }

    /// Strongest live penalty, 1.0 when nothing is active
    pub fn multiplier(&self, now_ms: f64) -> f32 {
        self.active
            .iter()
            .filter(|e| e.expires_at_ms > now_ms)
            .map(|e| e.multiplier)
            .fold(1.0, f32::min)
    }

    pub fn effective_speed(&self, base_speed: f32, now_ms: f64) -> f32 {
        base_speed * self.multiplier(now_ms)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}
