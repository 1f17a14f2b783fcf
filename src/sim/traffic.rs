//! AI traffic
//!
//! Trucks are simulated in the player's reference frame: each tick they move by
//! their speed relative to the player, so slower trucks drift toward and past
//! the player while faster ones pull away.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::events::{ActorId, ActorKind, EventQueue, GameEvent};
use super::spawn::{IdAllocator, SpawnOutcome};
use super::stage::StageConfig;
use crate::tuning::TrafficTuning;

/// One AI truck
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficVehicle {
    pub id: ActorId,
    /// -1, 0 or 1
    pub lane: i8,
    pub speed: f32,
    /// Longitudinal position relative to the player
    pub z: f32,
    pub active: bool,
    pub width: f32,
    pub length: f32,
    /// Presentation hints
    pub brake_lights: bool,
    pub wheel_rotation: f32,
}

/// Geometry of a traffic contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficHit {
    pub id: ActorId,
    pub dx: f32,
    pub dz: f32,
    /// Player speed minus truck speed
    pub relative_speed: f32,
    pub overtaking: bool,
}

impl TrafficVehicle {
    pub fn new(id: ActorId, lane: i8, speed: f32, z: f32, t: &TrafficTuning) -> Self {
        Self {
            id,
            lane,
            speed,
            z,
            active: true,
            width: t.vehicle_width,
            length: t.vehicle_length,
            brake_lights: false,
            wheel_rotation: 0.0,
        }
    }

    /// Lane centre plus a small deterministic weave driven by position
    pub fn x(&self, t: &TrafficTuning) -> f32 {
        self.lane as f32 * t.lane_width + (self.z * t.wobble_frequency).sin() * t.wobble_amplitude
    }

    fn advance(&mut self, player_speed: f32, dt: f32, t: &TrafficTuning) {
        let relative = self.speed - player_speed;
        self.wheel_rotation += relative * dt * 2.0;
        self.brake_lights = relative < -1.0;
        self.z += relative * t.speed_factor * dt;
        if self.z.abs() > t.window {
            self.active = false;
        }
    }

    /// Width/length thresholds, tightening as stages rise
    pub fn thresholds(&self, stage: u32, t: &TrafficTuning) -> (f32, f32) {
        let difficulty = stage as f32 / t.strictness_stages;
        (
            self.width * (t.width_threshold - difficulty * t.strictness),
            self.length * (t.length_threshold - difficulty * t.strictness),
        )
    }

    /// Player behind the truck and laterally clear of its core
    pub fn is_overtaking(&self, player_x: f32, player_z: f32, t: &TrafficTuning) -> bool {
        let dx = (self.x(t) - player_x).abs();
        player_z < self.z && dx > self.width * t.overtake_lateral_fraction
    }

    pub fn check_collision(
        &self,
        player_x: f32,
        player_z: f32,
        stage: u32,
        t: &TrafficTuning,
    ) -> bool {
        if !self.active {
            return false;
        }
        let dx = (self.x(t) - player_x).abs();
        let dz = (self.z - player_z).abs();
        let (width, length) = self.thresholds(stage, t);

        if self.is_overtaking(player_x, player_z, t) {
            let m = (t.overtake_multiplier
                - t.overtake_multiplier_per_stage * stage.saturating_sub(1) as f32)
                .max(0.0);
            dx < width * m && dz < length * m
        } else {
            dx < width && dz < length
        }
    }

    pub fn collision_details(
        &self,
        player_x: f32,
        player_z: f32,
        player_speed: f32,
        t: &TrafficTuning,
    ) -> TrafficHit {
        TrafficHit {
            id: self.id,
            dx: (self.x(t) - player_x).abs(),
            dz: (self.z - player_z).abs(),
            relative_speed: player_speed - self.speed,
            overtaking: self.is_overtaking(player_x, player_z, t),
        }
    }
}

/// Owns every live truck and the stage-driven spawn schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficManager {
    vehicles: Vec<TrafficVehicle>,
    spawn_timer_ms: f64,
    max_vehicles: usize,
    spawn_interval_ms: f64,
    speed_bias: f32,
    /// Terminal stage: trucks thin out and nothing spawns
    culling: bool,
}

impl TrafficManager {
    pub fn new(stage: &StageConfig) -> Self {
        let mut manager = Self {
            vehicles: Vec::new(),
            spawn_timer_ms: 0.0,
            max_vehicles: 0,
            spawn_interval_ms: 0.0,
            speed_bias: 0.0,
            culling: false,
        };
        manager.apply_stage(stage);
        manager
    }

    pub fn vehicles(&self) -> &[TrafficVehicle] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn is_culling(&self) -> bool {
        self.culling
    }

    pub fn max_vehicles(&self) -> usize {
        self.max_vehicles
    }

    pub fn spawn_interval_ms(&self) -> f64 {
        self.spawn_interval_ms
    }

    /// Take on a stage's difficulty bundle
    pub fn apply_stage(&mut self, stage: &StageConfig) {
        self.max_vehicles = stage.max_vehicles;
        self.spawn_interval_ms = stage.spawn_interval_ms;
        self.speed_bias = stage.speed_bias;
        if stage.terminal {
            self.begin_cull();
        }
    }

    /// Deactivate every truck; they are thinned out over the following ticks
    pub fn begin_cull(&mut self) {
        for vehicle in &mut self.vehicles {
            vehicle.active = false;
        }
        self.culling = true;
    }

    /// Per-tick update: spawn schedule, then movement and cleanup.
    /// Returns the outcome when a spawn attempt was due this tick.
    #[allow(clippy::too_many_arguments)]
    pub fn update<R: Rng>(
        &mut self,
        player_speed: f32,
        dt: f32,
        stage: u32,
        t: &TrafficTuning,
        rng: &mut R,
        ids: &mut IdAllocator,
        events: &mut EventQueue,
    ) -> Option<SpawnOutcome> {
        if self.culling {
            self.cull(player_speed, dt, t, rng, events);
            return None;
        }

        let outcome = self.spawn_tick(player_speed, dt, stage, t, rng, ids, events);
        self.advance(player_speed, dt, t, events);
        outcome
    }

    /// Advance the spawn timer and attempt a spawn once the interval elapses
    #[allow(clippy::too_many_arguments)]
    pub fn spawn_tick<R: Rng>(
        &mut self,
        player_speed: f32,
        dt: f32,
        stage: u32,
        t: &TrafficTuning,
        rng: &mut R,
        ids: &mut IdAllocator,
        events: &mut EventQueue,
    ) -> Option<SpawnOutcome> {
        self.spawn_timer_ms += dt as f64 * 1000.0;
        if self.spawn_timer_ms < self.spawn_interval_ms {
            return None;
        }
        self.spawn_timer_ms = 0.0;
        Some(self.spawn(player_speed, stage, t, rng, ids, events))
    }

    /// One spawn attempt ahead of the player
    pub fn spawn<R: Rng>(
        &mut self,
        player_speed: f32,
        stage: u32,
        t: &TrafficTuning,
        rng: &mut R,
        ids: &mut IdAllocator,
        events: &mut EventQueue,
    ) -> SpawnOutcome {
        if self.vehicles.len() >= self.max_vehicles {
            return SpawnOutcome::CapReached;
        }

        let speed = player_speed + self.speed_bias + (rng.random::<f32>() - 0.5) * t.speed_jitter;
        let z = t.spawn_z + (rng.random::<f32>() - 0.5) * t.spawn_jitter;
        let center_chance =
            t.center_lane_base + t.center_lane_per_stage * stage.saturating_sub(1) as f32;
        let lane = if rng.random::<f32>() < center_chance {
            0
        } else if rng.random_bool(0.5) {
            -1
        } else {
            1
        };

        self.try_place(lane, speed, z, stage, t, ids, events)
    }

    /// Place a truck unless one in the same or a neighbouring lane is too close
    #[allow(clippy::too_many_arguments)]
    pub fn try_place(
        &mut self,
        lane: i8,
        speed: f32,
        z: f32,
        stage: u32,
        t: &TrafficTuning,
        ids: &mut IdAllocator,
        events: &mut EventQueue,
    ) -> SpawnOutcome {
        let min_gap = safe_distance(stage, t);
        let crowded = self
            .vehicles
            .iter()
            .any(|v| (v.z - z).abs() < min_gap && (v.lane - lane).abs() <= 1);
        if crowded {
            return SpawnOutcome::Unsafe;
        }

        let id = ids.next_id();
        self.vehicles.push(TrafficVehicle::new(id, lane, speed, z, t));
        events.push(GameEvent::ActorSpawned {
            id,
            kind: ActorKind::Truck,
        });
        log::debug!("Spawned truck in lane {} at z={:.1}, speed {:.1}", lane, z, speed);
        SpawnOutcome::Spawned(id)
    }

    fn advance(&mut self, player_speed: f32, dt: f32, t: &TrafficTuning, events: &mut EventQueue) {
        self.vehicles.retain_mut(|v| {
            if !v.active {
                events.push(GameEvent::ActorDespawned { id: v.id });
                return false;
            }
            v.advance(player_speed, dt, t);
            true
        });
    }

    fn cull<R: Rng>(
        &mut self,
        player_speed: f32,
        dt: f32,
        t: &TrafficTuning,
        rng: &mut R,
        events: &mut EventQueue,
    ) {
        self.vehicles.retain_mut(|v| {
            if v.z.abs() > t.cull_window || rng.random_bool(t.cull_chance) {
                events.push(GameEvent::ActorDespawned { id: v.id });
                return false;
            }
            v.advance(player_speed, dt, t);
            true
        });
    }

    pub fn check_collision(
        &self,
        player_x: f32,
        player_z: f32,
        stage: u32,
        t: &TrafficTuning,
    ) -> bool {
        self.vehicles
            .iter()
            .any(|v| v.check_collision(player_x, player_z, stage, t))
    }

    /// Details of the first truck in contact with the player, if any
    pub fn collision_details(
        &self,
        player_x: f32,
        player_z: f32,
        player_speed: f32,
        stage: u32,
        t: &TrafficTuning,
    ) -> Option<TrafficHit> {
        self.vehicles
            .iter()
            .find(|v| v.check_collision(player_x, player_z, stage, t))
            .map(|v| v.collision_details(player_x, player_z, player_speed, t))
    }

    /// Remove every truck and restore the given stage's schedule
    pub fn reset(&mut self, stage: &StageConfig, events: &mut EventQueue) {
        for vehicle in self.vehicles.drain(..) {
            events.push(GameEvent::ActorDespawned { id: vehicle.id });
        }
        self.spawn_timer_ms = 0.0;
        self.culling = false;
        self.apply_stage(stage);
    }
}

/// Minimum spawn gap, shrinking with stage
pub fn safe_distance(stage: u32, t: &TrafficTuning) -> f32 {
    t.safe_distance * (1.0 - t.safe_distance_shrink * stage.saturating_sub(1) as f32)
}
