//! Road obstacles: cones, potholes and roadblocks
//!
//! Obstacles spawn ahead of the player and scroll back at player speed. A struck
//! cone leaves the road and flies as a rigid body until it drifts out of range.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::effects::{ImpactProfile, Severity};
use super::events::{ActorId, ActorKind, EventQueue, GameEvent};
use super::spawn::{IdAllocator, SpawnOutcome, pick_weighted};
use crate::tuning::ObstacleTuning;

/// Obstacle variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Light hazard, knocked into rigid-body flight on impact
    Cone,
    /// Ground hazard
    Pothole,
    /// Barrier spanning more than a lane
    Roadblock,
}

/// Fixed speed penalty applied on impact
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyProfile {
    pub multiplier: f32,
    pub recovery_ms: f64,
    pub severity: Severity,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 3] = [
        ObstacleKind::Cone,
        ObstacleKind::Pothole,
        ObstacleKind::Roadblock,
    ];

    pub fn width(self) -> f32 {
        match self {
            ObstacleKind::Cone => 1.0,
            ObstacleKind::Pothole => 2.0,
            ObstacleKind::Roadblock => 6.0,
        }
    }

    pub fn length(self) -> f32 {
        match self {
            ObstacleKind::Cone => 1.0,
            ObstacleKind::Pothole | ObstacleKind::Roadblock => 2.0,
        }
    }

    /// Stages in which this kind may spawn
    pub fn stage_range(self) -> std::ops::RangeInclusive<u32> {
        match self {
            ObstacleKind::Cone => 1..=4,
            ObstacleKind::Pothole => 2..=4,
            ObstacleKind::Roadblock => 3..=4,
        }
    }

    /// Unnormalized spawn weight at `stage`
    pub fn spawn_weight(self, stage: u32) -> f32 {
        let (base, per_stage) = match self {
            ObstacleKind::Cone => (0.5, 0.1),
            ObstacleKind::Pothole => (0.3, 0.15),
            ObstacleKind::Roadblock => (0.2, 0.2),
        };
        base + per_stage * stage.saturating_sub(1) as f32
    }

    pub fn penalty(self) -> PenaltyProfile {
        match self {
            ObstacleKind::Cone => PenaltyProfile {
                multiplier: 0.2,
                recovery_ms: 1000.0,
                severity: Severity::Light,
            },
            ObstacleKind::Pothole => PenaltyProfile {
                multiplier: 0.2,
                recovery_ms: 2000.0,
                severity: Severity::Medium,
            },
            ObstacleKind::Roadblock => PenaltyProfile {
                multiplier: 0.2,
                recovery_ms: 3000.0,
                severity: Severity::Heavy,
            },
        }
    }

    /// Shake and cue follow the penalty's severity
    pub fn impact(self) -> ImpactProfile {
        self.penalty().severity.impact()
    }

    /// Light hazards fly when struck instead of staying put
    pub fn is_light(self) -> bool {
        self == ObstacleKind::Cone
    }
}

/// Free-flight state of a struck light hazard
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Accumulated Euler rotation for rendering
    pub rotation: Vec3,
}

/// A single obstacle on the road
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: ActorId,
    pub kind: ObstacleKind,
    /// -1, 0 or 1
    pub lane: i8,
    pub position: Vec3,
    pub active: bool,
    pub has_collided: bool,
    /// Present once a light hazard has been knocked into flight
    pub body: Option<RigidBody>,
}

impl Obstacle {
    pub fn new(id: ActorId, kind: ObstacleKind, lane: i8, z: f32, lane_width: f32) -> Self {
        Self {
            id,
            kind,
            lane,
            position: Vec3::new(lane as f32 * lane_width, 0.0, z),
            active: true,
            has_collided: false,
            body: None,
        }
    }

    pub fn is_flying(&self) -> bool {
        self.body.is_some()
    }

    fn advance(&mut self, player_speed: f32, dt: f32, t: &ObstacleTuning) {
        match self.body.as_mut() {
            Some(body) => {
                let pos = &mut self.position;
                pos.x += body.velocity.x * dt;
                pos.y += body.velocity.y * dt;
                pos.z += (body.velocity.z - player_speed) * dt;

                body.velocity.y += t.gravity * dt;
                body.velocity *= 1.0 - t.air_resistance;
                body.angular_velocity *= 1.0 - t.air_resistance;
                body.rotation += body.angular_velocity * dt;

                if pos.y < 0.0 {
                    pos.y = 0.0;
                    body.velocity.y = -body.velocity.y * t.restitution;
                    body.velocity.x *= 1.0 - t.ground_friction;
                    body.velocity.z *= 1.0 - t.ground_friction;
                    body.angular_velocity *= t.ground_spin_damping;
                    if body.velocity.y.abs() < t.rest_threshold {
                        body.velocity.y = 0.0;
                    }
                }
            }
            None => self.position.z -= player_speed * dt,
        }

        if self.position.z < t.window_behind
            || self.position.z > t.window_ahead
            || self.position.x.abs() > t.lateral_limit
        {
            self.active = false;
        }
    }

    fn overlaps(&self, player_x: f32, player_z: f32, t: &ObstacleTuning) -> bool {
        let dx = (self.position.x - player_x).abs();
        let dz = (self.position.z - player_z).abs();
        dx < self.kind.width() * t.hit_width_factor && dz < self.kind.length() * t.hit_length_factor
    }

    /// Launch into rigid-body flight away from the player
    fn knock<R: Rng>(&mut self, player_x: f32, player_speed: f32, rng: &mut R) {
        let impact_x = self.position.x - player_x;
        let side = if impact_x > 0.0 {
            1.0
        } else if impact_x < 0.0 {
            -1.0
        } else if rng.random_bool(0.5) {
            1.0
        } else {
            -1.0
        };

        let mut spin = || (rng.random::<f32>() - 0.5) * 10.0;
        let angular_velocity = Vec3::new(spin(), spin(), spin());
        let velocity = Vec3::new(
            side * (5.0 + rng.random::<f32>() * 3.0),
            8.0 + rng.random::<f32>() * 4.0,
            player_speed * 0.5,
        );
        self.body = Some(RigidBody {
            velocity,
            angular_velocity,
            rotation: Vec3::ZERO,
        });
    }
}

/// A registered obstacle impact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleHit {
    pub id: ActorId,
    pub kind: ObstacleKind,
    pub penalty: PenaltyProfile,
    pub impact: ImpactProfile,
    pub position: Vec3,
}

/// Owns every live obstacle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle>,
    /// Difficulty stage applied by the stage controller
    stage: u32,
}

impl Default for ObstacleField {
    fn default() -> Self {
        Self::new()
    }
}

impl ObstacleField {
    pub fn new() -> Self {
        Self {
            obstacles: Vec::new(),
            stage: 1,
        }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn set_stage(&mut self, stage: u32) {
        self.stage = stage.max(1);
    }

    /// Advance all obstacles, drop stale ones, then roll for a spawn
    pub fn update<R: Rng>(
        &mut self,
        player_speed: f32,
        dt: f32,
        t: &ObstacleTuning,
        rng: &mut R,
        ids: &mut IdAllocator,
        events: &mut EventQueue,
    ) -> Option<SpawnOutcome> {
        self.advance(player_speed, dt, t, events);
        self.spawn_tick(dt, t, rng, ids, events)
    }

    pub fn advance(
        &mut self,
        player_speed: f32,
        dt: f32,
        t: &ObstacleTuning,
        events: &mut EventQueue,
    ) {
        for obstacle in self.obstacles.iter_mut().filter(|o| o.active) {
            obstacle.advance(player_speed, dt, t);
        }
        self.obstacles.retain(|o| {
            if !o.active {
                events.push(GameEvent::ActorDespawned { id: o.id });
            }
            o.active
        });
    }

    /// Per-second spawn chance for the current stage, before jitter
    pub fn spawn_rate(&self, t: &ObstacleTuning) -> f32 {
        t.spawn_rate_base + t.spawn_rate_per_stage * self.stage as f32
    }

    /// Roll against the stage spawn rate; `None` when no attempt is made
    pub fn spawn_tick<R: Rng>(
        &mut self,
        dt: f32,
        t: &ObstacleTuning,
        rng: &mut R,
        ids: &mut IdAllocator,
        events: &mut EventQueue,
    ) -> Option<SpawnOutcome> {
        let jitter = 1.0 - t.spawn_rate_jitter + rng.random::<f32>() * 2.0 * t.spawn_rate_jitter;
        let chance = self.spawn_rate(t) * jitter * dt;
        if rng.random::<f32>() >= chance {
            return None;
        }
        Some(self.spawn(t, rng, ids, events))
    }

    /// One spawn attempt at the current stage
    pub fn spawn<R: Rng>(
        &mut self,
        t: &ObstacleTuning,
        rng: &mut R,
        ids: &mut IdAllocator,
        events: &mut EventQueue,
    ) -> SpawnOutcome {
        if self.obstacles.len() >= t.max_obstacles {
            return SpawnOutcome::CapReached;
        }
        let Some(kind) = choose_kind(self.stage, rng.random::<f32>()) else {
            return SpawnOutcome::NothingEligible;
        };
        let lane = choose_lane(self.stage, rng.random::<f32>(), t);
        let z = t.spawn_ahead + rng.random::<f32>() * t.spawn_spread;
        self.try_place(kind, lane, z, t, ids, events)
    }

    /// Place an obstacle unless another one already occupies that stretch of road
    pub fn try_place(
        &mut self,
        kind: ObstacleKind,
        lane: i8,
        z: f32,
        t: &ObstacleTuning,
        ids: &mut IdAllocator,
        events: &mut EventQueue,
    ) -> SpawnOutcome {
        let x = lane as f32 * t.lane_width;
        let crowded = self.obstacles.iter().any(|o| {
            (o.position.z - z).abs() < t.min_separation && (o.position.x - x).abs() < o.kind.width()
        });
        if crowded {
            return SpawnOutcome::Unsafe;
        }

        let id = ids.next_id();
        self.obstacles.push(Obstacle::new(id, kind, lane, z, t.lane_width));
        events.push(GameEvent::ActorSpawned {
            id,
            kind: ActorKind::Obstacle(kind),
        });
        log::debug!("Spawned {:?} in lane {} at z={:.1}", kind, lane, z);
        SpawnOutcome::Spawned(id)
    }

    /// Register impacts with the player. Each obstacle hits at most once; a
    /// struck cone is launched into flight.
    pub fn query_collisions<R: Rng>(
        &mut self,
        player_x: f32,
        player_z: f32,
        player_speed: f32,
        t: &ObstacleTuning,
        rng: &mut R,
    ) -> Vec<ObstacleHit> {
        let mut hits = Vec::new();
        for obstacle in &mut self.obstacles {
            let live = obstacle.active && !obstacle.has_collided;
            if !live || !obstacle.overlaps(player_x, player_z, t) {
                continue;
            }
            if obstacle.kind.is_light() {
                obstacle.knock(player_x, player_speed, rng);
            }
            obstacle.has_collided = true;
            hits.push(ObstacleHit {
                id: obstacle.id,
                kind: obstacle.kind,
                penalty: obstacle.kind.penalty(),
                impact: obstacle.kind.impact(),
                position: obstacle.position,
            });
        }
        hits
    }

    /// Remove everything, telling the scene to drop each actor
    pub fn reset(&mut self, events: &mut EventQueue) {
        for obstacle in self.obstacles.drain(..) {
            events.push(GameEvent::ActorDespawned { id: obstacle.id });
        }
        self.stage = 1;
    }
}

/// Pick an obstacle kind for `stage` from a uniform roll in [0, 1)
pub fn choose_kind(stage: u32, roll: f32) -> Option<ObstacleKind> {
    let eligible: Vec<ObstacleKind> = ObstacleKind::ALL
        .into_iter()
        .filter(|k| k.stage_range().contains(&stage))
        .collect();
    if eligible.is_empty() {
        return None;
    }
    let weights: Vec<f32> = eligible.iter().map(|k| k.spawn_weight(stage)).collect();
    Some(eligible[pick_weighted(&weights, roll)])
}

/// Pick a lane, favouring the centre lane more as stages rise
pub fn choose_lane(stage: u32, roll: f32, t: &ObstacleTuning) -> i8 {
    let center = (t.player_lane_weight_base + t.player_lane_weight_per_stage * stage as f32)
        .min(t.player_lane_weight_cap);
    let side = (1.0 - center) / 2.0;
    const LANES: [i8; 3] = [-1, 0, 1];
    LANES[pick_weighted(&[side, center, side], roll)]
}
