//! Player vehicle kinematics
//!
//! Discrete control intents become per-tick speed and lateral-offset updates
//! through piecewise speed curves. World X grows to the right; lane -1 is left.

use serde::{Deserialize, Serialize};

use crate::consts::PLAYER_Z;
use crate::tuning::VehicleTuning;

/// Held control intents for the current tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub accelerate: bool,
    pub brake: bool,
    pub steer_left: bool,
    pub steer_right: bool,
}

/// Light/signal projection for rendering. Never read back by the physics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    pub brake_lights: bool,
    pub left_signal: bool,
    pub right_signal: bool,
}

/// The player's car
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerVehicle {
    /// 0..=max_speed
    pub speed: f32,
    /// Infinite in free-ride mode
    pub max_speed: f32,
    /// Lateral position, bounded by +/- max lane deviation
    pub lateral_offset: f32,
    /// Longitudinal position of the car in the scrolling frame (always 0)
    pub z: f32,
    /// Cumulative distance travelled (m)
    pub distance: f32,
    pub controls: Controls,
    /// Visual front-wheel angle (radians)
    pub wheel_angle: f32,
    pub lights: LightState,
    /// Clock (ms) at which the current brake press started
    brake_started_ms: Option<f64>,
    signal_phase_on: bool,
    last_signal_toggle_ms: f64,
}

impl PlayerVehicle {
    pub fn new(tuning: &VehicleTuning) -> Self {
        Self {
            speed: 0.0,
            max_speed: tuning.max_speed,
            lateral_offset: 0.0,
            z: PLAYER_Z,
            distance: 0.0,
            controls: Controls::default(),
            wheel_angle: 0.0,
            lights: LightState::default(),
            brake_started_ms: None,
            signal_phase_on: false,
            last_signal_toggle_ms: 0.0,
        }
    }

    /// World X used for collision tests
    pub fn x(&self) -> f32 {
        self.lateral_offset
    }

    pub fn is_braking(&self) -> bool {
        self.brake_started_ms.is_some()
    }

    /// Advance one tick. `distance_multiplier` is the active speed-effect
    /// multiplier so distance follows effective rather than base speed.
    ///
    /// Returns true on the tick the brake is first pressed.
    pub fn update(
        &mut self,
        tuning: &VehicleTuning,
        now_ms: f64,
        distance_multiplier: f32,
    ) -> bool {
        let controls = self.controls;
        let mut brake_pressed = false;

        if controls.accelerate && !controls.brake {
            let mult = tuning.acceleration_curve.multiplier_up_to(self.speed);
            self.speed = (self.speed + tuning.acceleration * mult).min(self.max_speed);
            self.brake_started_ms = None;
        } else if controls.brake {
            let started = *self.brake_started_ms.get_or_insert_with(|| {
                brake_pressed = true;
                now_ms
            });
            let ramp = if tuning.brake_ramp_ms > 0.0 {
                ((now_ms - started).clamp(0.0, tuning.brake_ramp_ms) / tuning.brake_ramp_ms) as f32
            } else {
                1.0
            };
            let mult = tuning.brake_curve.multiplier_from(self.speed);
            self.speed = (self.speed - tuning.brake_force * mult * ramp).max(0.0);
        } else {
            let mult = tuning.deceleration_curve.multiplier_from(self.speed);
            self.speed = (self.speed - tuning.deceleration * mult).max(0.0);
            self.brake_started_ms = None;
        }

        self.steer(tuning);
        self.update_lights(tuning, now_ms);

        self.distance += self.speed * distance_multiplier * tuning.distance_per_tick;
        brake_pressed
    }

    fn steer(&mut self, tuning: &VehicleTuning) {
        let speed_factor = (self.speed / 100.0).min(1.0);
        let step = tuning.steer_speed * (1.0 + speed_factor * tuning.steer_speed_boost);
        let bound = tuning.max_lane_deviation;

        if self.controls.steer_left {
            self.lateral_offset = (self.lateral_offset - step).max(-bound);
            self.wheel_angle = self.wheel_angle_for_offset(tuning);
        } else if self.controls.steer_right {
            self.lateral_offset = (self.lateral_offset + step).min(bound);
            self.wheel_angle = self.wheel_angle_for_offset(tuning);
        } else if self.wheel_angle.abs() > 0.01 {
            // Offset stays put; only the wheels self-centre
            self.wheel_angle *= 1.0 - tuning.wheel_return;
        } else {
            self.wheel_angle = 0.0;
        }
    }

    fn wheel_angle_for_offset(&self, tuning: &VehicleTuning) -> f32 {
        let max = tuning.max_wheel_turn;
        (max * self.lateral_offset / tuning.max_lane_deviation).clamp(-max, max)
    }

    fn update_lights(&mut self, tuning: &VehicleTuning, now_ms: f64) {
        if now_ms - self.last_signal_toggle_ms > tuning.signal_interval_ms {
            self.signal_phase_on = !self.signal_phase_on;
            self.last_signal_toggle_ms = now_ms;
        }
        self.lights = LightState {
            brake_lights: self.controls.brake,
            left_signal: self.controls.steer_left && self.signal_phase_on,
            right_signal: self.controls.steer_right && self.signal_phase_on,
        };
    }

    /// Direct steering from a normalized pointer position in [-1, 1]
    pub fn set_pointer_steering(&mut self, normalized: f32, tuning: &VehicleTuning) {
        let n = normalized.clamp(-1.0, 1.0);
        let range = tuning.pointer_range.min(tuning.max_lane_deviation);
        self.lateral_offset = n * range;
        let max = tuning.max_wheel_turn;
        self.wheel_angle = (n * max * range / 3.0).clamp(-max, max);
    }

    /// Lift or restore the speed cap
    pub fn set_free_ride(&mut self, enabled: bool, tuning: &VehicleTuning) {
        if enabled {
            self.max_speed = f32::INFINITY;
        } else {
            self.max_speed = tuning.max_speed;
            self.speed = self.speed.min(self.max_speed);
        }
    }

    pub fn reset(&mut self, tuning: &VehicleTuning) {
        *self = Self::new(tuning);
    }
}
