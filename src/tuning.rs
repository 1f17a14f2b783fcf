//! Data-driven game balance
//!
//! Every tunable constant of the simulation lives here. Defaults reproduce the
//! shipped game; a JSON document can override any subset of fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::stage::{StageConfig, default_stages};

/// Errors raised while loading or validating a tuning document
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("tuning JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("stage table is empty")]
    NoStages,
    #[error("first stage must start at distance 0, found {0}")]
    FirstStageOffset(f32),
    #[error("stage {index} threshold {threshold} does not exceed the previous one")]
    UnorderedStage { index: usize, threshold: f32 },
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

/// One band of a piecewise-constant speed curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedBand {
    /// Upper bound (acceleration curves) or lower bound (brake/coast curves)
    pub bound: f32,
    pub multiplier: f32,
}

/// Piecewise-constant multiplier over speed bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedCurve {
    pub bands: Vec<SpeedBand>,
}

impl SpeedCurve {
    pub fn new(bands: &[(f32, f32)]) -> Self {
        Self {
            bands: bands
                .iter()
                .map(|&(bound, multiplier)| SpeedBand { bound, multiplier })
                .collect(),
        }
    }

    /// Multiplier of the first band whose upper bound is at least `speed`.
    /// Bands are listed from the lowest bound up.
    pub fn multiplier_up_to(&self, speed: f32) -> f32 {
        self.bands
            .iter()
            .find(|b| speed <= b.bound)
            .map_or(1.0, |b| b.multiplier)
    }

    /// Multiplier of the first band whose lower bound is at most `speed`.
    /// Bands are listed from the highest bound down.
    pub fn multiplier_from(&self, speed: f32) -> f32 {
        self.bands
            .iter()
            .find(|b| speed >= b.bound)
            .map_or(1.0, |b| b.multiplier)
    }
}

/// Player vehicle handling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    pub max_speed: f32,
    pub acceleration: f32,
    pub acceleration_curve: SpeedCurve,
    pub brake_force: f32,
    pub brake_curve: SpeedCurve,
    /// Time for the brake to ramp to full strength (ms)
    pub brake_ramp_ms: f64,
    pub deceleration: f32,
    pub deceleration_curve: SpeedCurve,
    pub steer_speed: f32,
    /// Extra steering authority at full speed factor (speed >= 100)
    pub steer_speed_boost: f32,
    pub max_lane_deviation: f32,
    /// Lateral range reached by a full-scale pointer input
    pub pointer_range: f32,
    pub max_wheel_turn: f32,
    /// Fraction of wheel angle removed per tick when not steering
    pub wheel_return: f32,
    pub signal_interval_ms: f64,
    /// Distance gained per tick per unit of speed
    pub distance_per_tick: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            max_speed: 220.0,
            acceleration: 0.3,
            acceleration_curve: SpeedCurve::new(&[
                (60.0, 1.2),
                (120.0, 0.9),
                (180.0, 0.6),
                (220.0, 0.3),
            ]),
            brake_force: 0.5,
            brake_curve: SpeedCurve::new(&[(180.0, 1.8), (120.0, 1.4), (60.0, 1.1), (0.0, 0.9)]),
            brake_ramp_ms: 150.0,
            deceleration: 0.08,
            deceleration_curve: SpeedCurve::new(&[
                (180.0, 1.6),
                (120.0, 1.2),
                (60.0, 0.8),
                (0.0, 0.4),
            ]),
            steer_speed: 0.22,
            steer_speed_boost: 0.3,
            max_lane_deviation: 4.5,
            pointer_range: 4.0,
            max_wheel_turn: std::f32::consts::FRAC_PI_4,
            wheel_return: 0.15,
            signal_interval_ms: 500.0,
            distance_per_tick: 1.0 / 60.0,
        }
    }
}

/// Obstacle spawning, movement and rigid-body flight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleTuning {
    pub lane_width: f32,
    pub spawn_ahead: f32,
    pub spawn_spread: f32,
    pub min_separation: f32,
    pub max_obstacles: usize,
    /// Spawn rate per second = (base + per_stage * stage) * U(1 - jitter, 1 + jitter)
    pub spawn_rate_base: f32,
    pub spawn_rate_per_stage: f32,
    pub spawn_rate_jitter: f32,
    pub player_lane_weight_base: f32,
    pub player_lane_weight_per_stage: f32,
    pub player_lane_weight_cap: f32,
    pub window_behind: f32,
    pub window_ahead: f32,
    pub lateral_limit: f32,
    pub hit_width_factor: f32,
    pub hit_length_factor: f32,
    pub gravity: f32,
    pub air_resistance: f32,
    pub ground_friction: f32,
    pub restitution: f32,
    pub rest_threshold: f32,
    pub ground_spin_damping: f32,
}

impl Default for ObstacleTuning {
    fn default() -> Self {
        Self {
            lane_width: 3.5,
            spawn_ahead: 150.0,
            spawn_spread: 50.0,
            min_separation: 20.0,
            max_obstacles: 16,
            spawn_rate_base: 0.1,
            spawn_rate_per_stage: 0.05,
            spawn_rate_jitter: 0.2,
            player_lane_weight_base: 0.3,
            player_lane_weight_per_stage: 0.1,
            player_lane_weight_cap: 0.6,
            window_behind: -50.0,
            window_ahead: 200.0,
            lateral_limit: 20.0,
            hit_width_factor: 0.8,
            hit_length_factor: 0.7,
            gravity: -9.81,
            air_resistance: 0.02,
            ground_friction: 0.3,
            restitution: 0.6,
            rest_threshold: 0.1,
            ground_spin_damping: 0.8,
        }
    }
}

/// AI traffic spawning, movement and hitboxes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficTuning {
    pub lane_width: f32,
    pub vehicle_width: f32,
    pub vehicle_length: f32,
    /// Fraction of the relative speed a truck actually closes per second
    pub speed_factor: f32,
    pub spawn_z: f32,
    pub spawn_jitter: f32,
    pub speed_jitter: f32,
    /// Vehicles beyond +/- this longitudinal distance are dropped
    pub window: f32,
    pub safe_distance: f32,
    pub safe_distance_shrink: f32,
    pub center_lane_base: f32,
    pub center_lane_per_stage: f32,
    pub wobble_amplitude: f32,
    pub wobble_frequency: f32,
    pub width_threshold: f32,
    pub length_threshold: f32,
    /// Threshold reduction at stage == strictness_stages
    pub strictness: f32,
    pub strictness_stages: f32,
    pub overtake_lateral_fraction: f32,
    pub overtake_multiplier: f32,
    pub overtake_multiplier_per_stage: f32,
    pub cull_window: f32,
    pub cull_chance: f64,
}

impl Default for TrafficTuning {
    fn default() -> Self {
        Self {
            lane_width: 3.0,
            vehicle_width: 2.8,
            vehicle_length: 7.0,
            speed_factor: 0.7,
            spawn_z: 200.0,
            spawn_jitter: 50.0,
            speed_jitter: 5.0,
            window: 250.0,
            safe_distance: 70.0,
            safe_distance_shrink: 0.1,
            center_lane_base: 0.3,
            center_lane_per_stage: 0.1,
            wobble_amplitude: 0.1,
            wobble_frequency: 0.01,
            width_threshold: 0.9,
            length_threshold: 0.8,
            strictness: 0.1,
            strictness_stages: 3.0,
            overtake_lateral_fraction: 0.3,
            overtake_multiplier: 0.4,
            overtake_multiplier_per_stage: 0.05,
            cull_window: 50.0,
            cull_chance: 0.1,
        }
    }
}

/// Collision response toward the player
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionTuning {
    pub overtake_speed_retained: f32,
    pub crash_speed_retained: f32,
    pub crash_shake: f32,
    pub crash_duration_ms: f64,
    pub sound_cooldown_ms: f64,
    /// Speed at which crash sounds reach full intensity
    pub full_intensity_speed: f32,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            overtake_speed_retained: 0.3,
            crash_speed_retained: 0.5,
            crash_shake: 1.0,
            crash_duration_ms: 1000.0,
            sound_cooldown_ms: 300.0,
            full_intensity_speed: 100.0,
        }
    }
}

/// Laps, points and display units
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionTuning {
    pub meters_per_point: f32,
    pub lap_distance: f32,
    pub max_laps: u32,
    pub kmh_per_speed_unit: f32,
}

impl Default for ProgressionTuning {
    fn default() -> Self {
        Self {
            meters_per_point: 50.0,
            lap_distance: 1000.0,
            max_laps: 6,
            kmh_per_speed_unit: 3.6,
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub vehicle: VehicleTuning,
    pub obstacles: ObstacleTuning,
    pub traffic: TrafficTuning,
    pub collisions: CollisionTuning,
    pub progression: ProgressionTuning,
    pub stages: Vec<StageConfig>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            vehicle: VehicleTuning::default(),
            obstacles: ObstacleTuning::default(),
            traffic: TrafficTuning::default(),
            collisions: CollisionTuning::default(),
            progression: ProgressionTuning::default(),
            stages: default_stages(),
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) tuning document and validate it
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        let first = self.stages.first().ok_or(TuningError::NoStages)?;
        if first.distance_required != 0.0 {
            return Err(TuningError::FirstStageOffset(first.distance_required));
        }
        for (index, pair) in self.stages.windows(2).enumerate() {
            if pair[1].distance_required <= pair[0].distance_required {
                return Err(TuningError::UnorderedStage {
                    index: index + 1,
                    threshold: pair[1].distance_required,
                });
            }
        }

        let c = &self.collisions;
        check_unit("collisions.overtake_speed_retained", c.overtake_speed_retained)?;
        check_unit("collisions.crash_speed_retained", c.crash_speed_retained)?;
        check_unit("obstacles.restitution", self.obstacles.restitution)?;
        check_unit("obstacles.air_resistance", self.obstacles.air_resistance)?;
        check_unit("obstacles.ground_friction", self.obstacles.ground_friction)?;
        check_unit("vehicle.wheel_return", self.vehicle.wheel_return)?;
        check_unit("traffic.cull_chance", self.traffic.cull_chance as f32)?;
        Ok(())
    }
}

fn check_unit(field: &'static str, value: f32) -> Result<(), TuningError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TuningError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceleration_curve_picks_first_upper_bound() {
        let curve = VehicleTuning::default().acceleration_curve;
        assert_eq!(curve.multiplier_up_to(0.0), 1.2);
        assert_eq!(curve.multiplier_up_to(60.0), 1.2);
        assert_eq!(curve.multiplier_up_to(60.5), 0.9);
        assert_eq!(curve.multiplier_up_to(219.0), 0.3);
        // Beyond the last band (free ride)
        assert_eq!(curve.multiplier_up_to(500.0), 1.0);
    }

    #[test]
    fn test_brake_curve_checks_highest_band_first() {
        let curve = VehicleTuning::default().brake_curve;
        assert_eq!(curve.multiplier_from(200.0), 1.8);
        assert_eq!(curve.multiplier_from(120.0), 1.4);
        assert_eq!(curve.multiplier_from(59.0), 0.9);
        assert_eq!(curve.multiplier_from(0.0), 0.9);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "traffic": { "overtake_multiplier": 0.5 } }"#)
            .expect("partial tuning should parse");
        assert_eq!(tuning.traffic.overtake_multiplier, 0.5);
        assert_eq!(tuning.traffic.vehicle_width, 2.8);
        assert_eq!(tuning.stages.len(), 4);
    }

    #[test]
    fn test_rejects_unordered_stages() {
        let mut tuning = Tuning::default();
        tuning.stages[2].distance_required = 1000.0;
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::UnorderedStage { index: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_retention() {
        let mut tuning = Tuning::default();
        tuning.collisions.crash_speed_retained = 1.5;
        assert!(matches!(tuning.validate(), Err(TuningError::OutOfRange { .. })));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(Tuning::from_json("{ nope"), Err(TuningError::Parse(_))));
    }
}
