//! Game state and run lifecycle
//!
//! Everything the tick mutates lives here, owned in one place so a reset can
//! clear it atomically.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::CollisionCoordinator;
use super::effects::SpeedEffects;
use super::events::{EventQueue, GameEvent, SoundCue};
use super::obstacles::ObstacleField;
use super::spawn::IdAllocator;
use super::stage::{LapTracker, StageConfig, StageController};
use super::traffic::TrafficManager;
use super::vehicle::PlayerVehicle;
use crate::tuning::Tuning;

/// Counts shown before "GO!"
pub const COUNTDOWN_FROM: u32 = 3;
/// Time each count (and "GO!") stays up
pub const COUNTDOWN_STEP_MS: u32 = 1000;

/// Current phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Menu; nothing simulates
    Title,
    /// 3-2-1-GO before a run. Controls are ignored and nothing moves.
    Countdown { remaining_ms: u32 },
    Playing,
    Paused,
    /// Final lap done. The world keeps moving but progression has stopped.
    Victory,
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Simulation clock, advanced by each tick's dt
    pub clock_ms: f64,
    pub time_ticks: u64,
    pub phase: GamePhase,
    pub free_ride: bool,
    pub player: PlayerVehicle,
    pub traffic: TrafficManager,
    pub obstacles: ObstacleField,
    pub effects: SpeedEffects,
    pub stages: StageController,
    pub laps: LapTracker,
    pub collisions: CollisionCoordinator,
    pub ids: IdAllocator,
    /// Intents produced by ticks, drained by the presentation layer
    pub events: EventQueue,
    pub tuning: Tuning,
    /// Score frozen when the run was won
    pub final_score: Option<u64>,
}

impl GameState {
    /// Create a new game state with default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        let first = first_stage(&tuning);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            clock_ms: 0.0,
            time_ticks: 0,
            phase: GamePhase::Title,
            free_ride: false,
            player: PlayerVehicle::new(&tuning.vehicle),
            traffic: TrafficManager::new(&first),
            obstacles: ObstacleField::new(),
            effects: SpeedEffects::new(),
            stages: StageController::new(),
            laps: LapTracker::default(),
            collisions: CollisionCoordinator::new(),
            ids: IdAllocator::default(),
            events: EventQueue::new(),
            tuning,
            final_score: None,
        }
    }

    /// Begin a fresh run with the pre-race countdown
    pub fn start(&mut self) {
        self.reset();
        self.phase = GamePhase::Countdown {
            remaining_ms: (COUNTDOWN_FROM + 1) * COUNTDOWN_STEP_MS,
        };
        self.announce_count(COUNTDOWN_FROM);
        log::info!("Run starting (seed {})", self.seed);
    }

    /// Hand control to the player
    pub fn begin_race(&mut self) {
        self.phase = GamePhase::Playing;
        log::info!("Race on");
    }

    /// Run the countdown clock; a no-op outside the countdown
    pub fn advance_countdown(&mut self, elapsed_ms: u32) {
        let GamePhase::Countdown { remaining_ms } = self.phase else {
            return;
        };
        let left = remaining_ms.saturating_sub(elapsed_ms);
        // Each step boundary crossed shows the next count, ending with GO (0)
        let before = remaining_ms.div_ceil(COUNTDOWN_STEP_MS);
        let after = left.div_ceil(COUNTDOWN_STEP_MS).max(1);
        for steps in (after..before).rev() {
            self.announce_count(steps - 1);
        }
        if left == 0 {
            self.begin_race();
        } else {
            self.phase = GamePhase::Countdown { remaining_ms: left };
        }
    }

    fn announce_count(&mut self, count: u32) {
        self.events.push(GameEvent::Countdown { count });
        let cue = if count > 0 { SoundCue::Menu } else { SoundCue::Point };
        self.events.sound(cue, 1.0);
    }

    pub fn toggle_pause(&mut self) {
        self.phase = match self.phase {
            GamePhase::Playing => GamePhase::Paused,
            GamePhase::Paused => GamePhase::Playing,
            other => other,
        };
    }

    /// Clear every transient collection and accumulator. Despawn events are
    /// emitted for each live actor so the scene drops its handles. Safe to
    /// call repeatedly.
    pub fn reset(&mut self) {
        let first = first_stage(&self.tuning);
        self.traffic.reset(&first, &mut self.events);
        self.obstacles.reset(&mut self.events);
        self.effects.clear();
        self.stages.reset();
        self.laps.reset();
        self.collisions.reset();
        self.player.reset(&self.tuning.vehicle);
        self.free_ride = false;
        self.clock_ms = 0.0;
        self.time_ticks = 0;
        self.final_score = None;
        log::info!("Game state reset");
    }

    pub fn return_to_title(&mut self) {
        self.reset();
        self.phase = GamePhase::Title;
    }

    pub fn set_free_ride(&mut self, enabled: bool) {
        if self.free_ride == enabled {
            return;
        }
        self.free_ride = enabled;
        self.player.set_free_ride(enabled, &self.tuning.vehicle);
        log::info!("Free ride {}", if enabled { "on" } else { "off" });
    }

    /// Enter the victory phase, freezing the score
    pub fn win(&mut self) {
        let score = self.score();
        self.phase = GamePhase::Victory;
        self.final_score = Some(score);
        self.events.push(GameEvent::Victory { score });
        log::info!("Victory with score {}", score);
    }

    /// Points earned, counted on whole meters
    pub fn points(&self) -> f32 {
        let per_point = self.tuning.progression.meters_per_point;
        if per_point <= 0.0 {
            return 0.0;
        }
        self.player.distance.round() / per_point
    }

    pub fn score(&self) -> u64 {
        self.final_score.unwrap_or_else(|| self.points().floor() as u64)
    }

    pub fn current_stage(&self) -> u32 {
        self.stages.current()
    }

    pub fn stage_config(&self) -> Option<&StageConfig> {
        self.stages.config(&self.tuning.stages)
    }

    pub fn effective_speed(&self) -> f32 {
        self.effects.effective_speed(self.player.speed, self.clock_ms)
    }

    /// Hand the pending intents to the presentation layer
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }
}

fn first_stage(tuning: &Tuning) -> StageConfig {
    tuning.stages.first().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::obstacles::ObstacleKind;

    #[test]
    fn test_new_state_waits_on_title() {
        let state = GameState::new(42);
        assert_eq!(state.phase, GamePhase::Title);
        assert_eq!(state.current_stage(), 1);
        assert_eq!(state.score(), 0);
        assert_eq!(state.traffic.max_vehicles(), 6);
    }

    #[test]
    fn test_pause_toggles_only_while_playing() {
        let mut state = GameState::new(1);
        state.toggle_pause();
        assert_eq!(state.phase, GamePhase::Title);

        state.start();
        state.toggle_pause();
        assert!(matches!(state.phase, GamePhase::Countdown { .. }));

        state.begin_race();
        state.toggle_pause();
        assert_eq!(state.phase, GamePhase::Paused);
        state.toggle_pause();
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_reset_is_idempotent_and_despawns_actors() {
        let mut state = GameState::new(3);
        state.start();
        state.drain_events();

        let t = state.tuning.clone();
        let (ids, events) = (&mut state.ids, &mut state.events);
        state.traffic.try_place(0, 30.0, 100.0, 1, &t.traffic, ids, events);
        state
            .obstacles
            .try_place(ObstacleKind::Cone, 1, 150.0, &t.obstacles, ids, events);
        state.effects.add(0.2, 1000.0, 0.0);
        state.player.distance = 2500.0;
        state.drain_events();

        state.reset();
        state.reset();

        assert!(state.traffic.is_empty());
        assert!(state.obstacles.is_empty());
        assert!(state.effects.is_empty());
        assert_eq!(state.player.distance, 0.0);
        assert_eq!(state.clock_ms, 0.0);
        let despawns = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::ActorDespawned { .. }))
            .count();
        assert_eq!(despawns, 2);
    }

    #[test]
    fn test_points_and_score() {
        let mut state = GameState::new(3);
        state.player.distance = 1234.0;
        assert!((state.points() - 24.68).abs() < 1e-3);
        assert_eq!(state.score(), 24);

        // Fractional meters round before scoring
        state.player.distance = 1234.4;
        assert!((state.points() - 24.68).abs() < 1e-3);
        state.player.distance = 1249.6;
        assert!((state.points() - 25.0).abs() < 1e-3);
        assert_eq!(state.score(), 25);
    }

    #[test]
    fn test_win_freezes_score() {
        let mut state = GameState::new(3);
        state.start();
        state.player.distance = 6000.0;
        state.win();
        state.player.distance = 9000.0;
        assert_eq!(state.phase, GamePhase::Victory);
        assert_eq!(state.score(), 120);
        assert!(state.drain_events().contains(&GameEvent::Victory { score: 120 }));
    }

    #[test]
    fn test_countdown_announces_three_two_one_go() {
        let mut state = GameState::new(9);
        state.start();
        assert_eq!(state.phase, GamePhase::Countdown { remaining_ms: 4000 });

        for _ in 0..40 {
            state.advance_countdown(100);
        }
        assert_eq!(state.phase, GamePhase::Playing);

        let events = state.drain_events();
        let counts: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Countdown { count } => Some(*count),
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![3, 2, 1, 0]);
        let cues: Vec<SoundCue> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Sound { cue, .. } => Some(*cue),
                _ => None,
            })
            .collect();
        assert_eq!(cues, vec![SoundCue::Menu, SoundCue::Menu, SoundCue::Menu, SoundCue::Point]);
    }

    #[test]
    fn test_countdown_long_step_still_says_go() {
        let mut state = GameState::new(9);
        state.start();
        state.advance_countdown(2500);
        state.drain_events();

        state.advance_countdown(5000);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.drain_events().contains(&GameEvent::Countdown { count: 0 }));

        // Outside the countdown nothing happens
        state.advance_countdown(1000);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_return_to_title_clears_run() {
        let mut state = GameState::new(3);
        state.start();
        state.begin_race();
        state.player.distance = 800.0;
        state.set_free_ride(true);

        state.return_to_title();
        assert_eq!(state.phase, GamePhase::Title);
        assert_eq!(state.player.distance, 0.0);
        assert!(!state.free_ride);
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn test_free_ride_lifts_cap_until_restart() {
        let mut state = GameState::new(3);
        state.start();
        state.set_free_ride(true);
        assert!(state.player.max_speed.is_infinite());

        state.start();
        assert!(!state.free_ride);
        assert_eq!(state.player.max_speed, state.tuning.vehicle.max_speed);
    }
}
