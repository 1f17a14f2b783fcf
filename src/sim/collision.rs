//! Collision resolution
//!
//! Queries traffic first, then obstacles, against the player's already-updated
//! position. Responses mutate the player's speed directly (traffic) or push a
//! speed effect (obstacles), and every contact is turned into presentation
//! intents on the event queue.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::effects::SpeedEffects;
use super::events::{EffectKind, EventQueue, GameEvent, SoundCue};
use super::obstacles::{ObstacleField, ObstacleHit};
use super::traffic::{TrafficHit, TrafficManager};
use super::vehicle::PlayerVehicle;
use crate::tuning::Tuning;

/// Contacts resolved during one tick
#[derive(Debug, Clone, Default)]
pub struct CollisionReport {
    pub traffic: Option<TrafficHit>,
    pub obstacles: Vec<ObstacleHit>,
}

impl CollisionReport {
    pub fn is_empty(&self) -> bool {
        self.traffic.is_none() && self.obstacles.is_empty()
    }
}

/// Turns contacts into speed changes and effect intents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollisionCoordinator {
    /// Clock time of the last collision sound
    last_sound_ms: Option<f64>,
}

/// Everything a collision pass touches, borrowed from the game state
pub struct CollisionContext<'a, R: Rng> {
    pub player: &'a mut PlayerVehicle,
    pub traffic: &'a TrafficManager,
    pub obstacles: &'a mut ObstacleField,
    pub effects: &'a mut SpeedEffects,
    pub stage: u32,
    pub tuning: &'a Tuning,
    pub now_ms: f64,
    pub rng: &'a mut R,
    pub events: &'a mut EventQueue,
}

impl CollisionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sounds are rate limited; speed responses are not
    fn can_play_sound(&mut self, now_ms: f64, cooldown_ms: f64) -> bool {
        match self.last_sound_ms {
            Some(last) if now_ms - last <= cooldown_ms => false,
            _ => {
                self.last_sound_ms = Some(now_ms);
                true
            }
        }
    }

    fn impact_intensity(&self, ctx_speed: f32, full_intensity_speed: f32) -> f32 {
        if full_intensity_speed <= 0.0 {
            return 1.0;
        }
        (ctx_speed / full_intensity_speed).clamp(0.0, 1.0)
    }

    pub fn resolve<R: Rng>(&mut self, ctx: CollisionContext<'_, R>) -> CollisionReport {
        let CollisionContext {
            player,
            traffic,
            obstacles,
            effects,
            stage,
            tuning,
            now_ms,
            rng,
            events,
        } = ctx;
        let c = &tuning.collisions;
        let mut report = CollisionReport::default();

        let effective = effects.effective_speed(player.speed, now_ms);
        let intensity = self.impact_intensity(effective, c.full_intensity_speed);

        let traffic_hit =
            traffic.collision_details(player.x(), player.z, player.speed, stage, &tuning.traffic);
        if let Some(hit) = traffic_hit {
            if self.can_play_sound(now_ms, c.sound_cooldown_ms) {
                events.sound(SoundCue::Crash, intensity);
            }
            if hit.overtaking {
                player.speed *= c.overtake_speed_retained;
            } else {
                player.speed *= c.crash_speed_retained;
                events.push(GameEvent::Effect {
                    kind: EffectKind::ShakeFlash,
                    intensity: c.crash_shake,
                    duration_ms: c.crash_duration_ms,
                });
            }
            log::debug!(
                "Traffic contact with {:?} (overtaking: {}, dx {:.2}, dz {:.2})",
                hit.id,
                hit.overtaking,
                hit.dx,
                hit.dz
            );
            report.traffic = Some(hit);
        }

        // Struck cones launch at the slowed speed the player is actually moving at
        let hits =
            obstacles.query_collisions(player.x(), player.z, effective, &tuning.obstacles, rng);
        for hit in &hits {
            if self.can_play_sound(now_ms, c.sound_cooldown_ms) {
                events.sound(hit.impact.cue, intensity);
            }
            effects.add(hit.penalty.multiplier, hit.penalty.recovery_ms, now_ms);
            events.push(GameEvent::Effect {
                kind: EffectKind::ShakeFlash,
                intensity: hit.impact.shake,
                duration_ms: hit.impact.duration_ms,
            });
            log::debug!("Hit {:?} {:?}", hit.kind, hit.id);
        }
        report.obstacles = hits;

        report
    }

    pub fn reset(&mut self) {
        self.last_sound_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::effects::Severity;
    use crate::sim::obstacles::ObstacleKind;
    use crate::sim::spawn::IdAllocator;
    use crate::sim::stage::default_stages;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Fixture {
        tuning: Tuning,
        player: PlayerVehicle,
        traffic: TrafficManager,
        obstacles: ObstacleField,
        effects: SpeedEffects,
        ids: IdAllocator,
        events: EventQueue,
        rng: Pcg32,
        coordinator: CollisionCoordinator,
    }

    impl Fixture {
        fn new() -> Self {
            let tuning = Tuning::default();
            let mut player = PlayerVehicle::new(&tuning.vehicle);
            player.speed = 80.0;
            Self {
                traffic: TrafficManager::new(&default_stages()[0]),
                player,
                obstacles: ObstacleField::new(),
                effects: SpeedEffects::new(),
                ids: IdAllocator::default(),
                events: EventQueue::new(),
                rng: Pcg32::seed_from_u64(1),
                coordinator: CollisionCoordinator::new(),
                tuning,
            }
        }

        fn resolve(&mut self, now_ms: f64) -> CollisionReport {
            self.coordinator.resolve(CollisionContext {
                player: &mut self.player,
                traffic: &self.traffic,
                obstacles: &mut self.obstacles,
                effects: &mut self.effects,
                stage: 1,
                tuning: &self.tuning,
                now_ms,
                rng: &mut self.rng,
                events: &mut self.events,
            })
        }
    }

    #[test]
    fn test_nothing_nearby() {
        let mut f = Fixture::new();
        let report = f.resolve(0.0);
        assert!(report.is_empty());
        assert_eq!(f.player.speed, 80.0);
        assert!(f.events.is_empty());
    }

    #[test]
    fn test_head_on_truck_halves_speed_and_shakes() {
        let mut f = Fixture::new();
        f.traffic
            .try_place(0, 40.0, 1.0, 1, &f.tuning.traffic, &mut f.ids, &mut f.events);
        f.events.drain();

        let report = f.resolve(0.0);
        assert!(report.traffic.is_some_and(|h| !h.overtaking));
        assert_eq!(f.player.speed, 40.0);
        let events = f.events.drain();
        assert!(events.contains(&GameEvent::Sound {
            cue: SoundCue::Crash,
            intensity: 0.8
        }));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::Effect { intensity, duration_ms, .. }
                if *intensity == 1.0 && *duration_ms == 1000.0
        )));
    }

    #[test]
    fn test_overtaking_contact_only_slows() {
        let mut f = Fixture::new();
        f.traffic
            .try_place(0, 40.0, 1.0, 1, &f.tuning.traffic, &mut f.ids, &mut f.events);
        f.events.drain();
        // Behind the truck and offset past 0.3 * width, inside the shrunken stage-1 box
        f.player.lateral_offset = 0.9;

        let report = f.resolve(0.0);
        assert!(report.traffic.is_some_and(|h| h.overtaking));
        assert!((f.player.speed - 24.0).abs() < 1e-4);
        assert!(!f.events.iter().any(|e| matches!(e, GameEvent::Effect { .. })));
    }

    #[test]
    fn test_overlap_applies_every_tick_but_sound_is_rate_limited() {
        let mut f = Fixture::new();
        f.traffic
            .try_place(0, 40.0, 1.0, 1, &f.tuning.traffic, &mut f.ids, &mut f.events);
        f.events.drain();

        f.resolve(0.0);
        f.resolve(16.0);
        assert_eq!(f.player.speed, 20.0);
        let sounds = f
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::Sound { .. }))
            .count();
        assert_eq!(sounds, 1);

        f.resolve(400.0);
        let sounds = f
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::Sound { .. }))
            .count();
        assert_eq!(sounds, 2);
    }

    #[test]
    fn test_obstacle_hit_adds_speed_effect_once() {
        let mut f = Fixture::new();
        let t = f.tuning.obstacles.clone();
        f.obstacles
            .try_place(ObstacleKind::Pothole, 0, 0.0, &t, &mut f.ids, &mut f.events);
        f.events.drain();

        let report = f.resolve(1000.0);
        assert_eq!(report.obstacles.len(), 1);
        assert_eq!(f.effects.len(), 1);
        // Base speed untouched; only the effective speed drops
        assert_eq!(f.player.speed, 80.0);
        assert!((f.effects.effective_speed(80.0, 1500.0) - 16.0).abs() < 1e-4);

        let events = f.events.drain();
        assert!(events.contains(&GameEvent::Sound {
            cue: SoundCue::Thud,
            intensity: 0.8
        }));

        // Already struck
        let report = f.resolve(1016.0);
        assert!(report.obstacles.is_empty());
        assert_eq!(f.effects.len(), 1);
    }

    #[test]
    fn test_cone_launch_follows_effective_speed() {
        let mut f = Fixture::new();
        f.effects.add(0.5, 2000.0, 0.0);
        let t = f.tuning.obstacles.clone();
        f.obstacles
            .try_place(ObstacleKind::Cone, 0, 0.0, &t, &mut f.ids, &mut f.events);

        let report = f.resolve(100.0);
        assert_eq!(report.obstacles.len(), 1);
        let body = f.obstacles.obstacles()[0].body.expect("struck cone should fly");
        // Half of the slowed 40 rather than half of the base 80
        assert_eq!(body.velocity.z, 20.0);
    }

    #[test]
    fn test_cone_hit_uses_light_impact() {
        let mut f = Fixture::new();
        let t = f.tuning.obstacles.clone();
        f.obstacles
            .try_place(ObstacleKind::Cone, 0, 0.0, &t, &mut f.ids, &mut f.events);
        f.events.drain();

        f.resolve(0.0);
        let light = Severity::Light.impact();
        let events = f.events.drain();
        assert!(events.contains(&GameEvent::Sound {
            cue: light.cue,
            intensity: 0.8
        }));
        assert!(events.contains(&GameEvent::Effect {
            kind: EffectKind::ShakeFlash,
            intensity: light.shake,
            duration_ms: light.duration_ms,
        }));
    }
}
