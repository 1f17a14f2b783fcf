//! HUD snapshot
//!
//! Pure output: computed from the game state after a tick, never read back.

use crate::sim::{GamePhase, GameState, LightState};

#[derive(Debug, Clone, PartialEq)]
pub struct HudSnapshot {
    pub speed_kmh: u32,
    pub distance_m: u64,
    pub points: f32,
    pub score: u64,
    pub stage_label: String,
    pub lap_label: String,
    pub phase: GamePhase,
    pub lights: LightState,
}

impl HudSnapshot {
    pub fn capture(state: &GameState) -> Self {
        let progression = &state.tuning.progression;
        let distance = state.player.distance.max(0.0);

        let stage_label = if state.free_ride {
            "Free Ride Mode".to_string()
        } else {
            match state.stage_config() {
                Some(stage) => format!("Stage {}: {}", state.current_stage(), stage.name),
                None => format!("Stage {}", state.current_stage()),
            }
        };

        let lap = state.laps.current_lap().min(progression.max_laps);
        let percent = state.laps.progress_percent(distance, progression);

        Self {
            speed_kmh: (state.player.speed * progression.kmh_per_speed_unit).round() as u32,
            distance_m: distance.round() as u64,
            points: state.points(),
            score: state.score(),
            stage_label,
            lap_label: format!("Lap: {}/{} ({:.1}%)", lap, progression.max_laps, percent),
            phase: state.phase,
            lights: state.player.lights,
        }
    }

    pub fn speed_text(&self) -> String {
        format!("{} km/h", self.speed_kmh)
    }

    pub fn distance_text(&self) -> String {
        format!("Distance: {}m", self.distance_m)
    }

    pub fn points_text(&self) -> String {
        format!("Points: {:.2}", self.points)
    }

    pub fn score_text(&self) -> String {
        format!("Score: {}", self.score)
    }
}
