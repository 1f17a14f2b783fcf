//! Distance-gated stages and laps

use serde::{Deserialize, Serialize};

use super::events::{EventQueue, GameEvent, SoundCue};
use super::obstacles::ObstacleField;
use super::traffic::TrafficManager;
use crate::tuning::ProgressionTuning;

/// One entry of the stage table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Cumulative distance at which the stage begins
    pub distance_required: f32,
    #[serde(default)]
    pub max_vehicles: usize,
    #[serde(default)]
    pub spawn_interval_ms: f64,
    /// Traffic speed relative to the player
    #[serde(default)]
    pub speed_bias: f32,
    /// Scenic final stage: traffic is culled and no longer spawns
    #[serde(default)]
    pub terminal: bool,
}

impl StageConfig {
    fn new(
        name: &str,
        description: &str,
        distance_required: f32,
        max_vehicles: usize,
        speed_bias: f32,
        spawn_interval_ms: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            distance_required,
            max_vehicles,
            spawn_interval_ms,
            speed_bias,
            terminal: false,
        }
    }
}

pub fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig::new(
            "Nyarugenge District",
            "Navigate through the bustling city center!",
            0.0,
            6,
            -30.0,
            4000.0,
        ),
        StageConfig::new(
            "Kicukiro District",
            "Challenge yourself in the industrial zone!",
            2000.0,
            8,
            -25.0,
            3500.0,
        ),
        StageConfig::new(
            "Gasabo District",
            "Master the crowded residential district!",
            4000.0,
            10,
            -20.0,
            3000.0,
        ),
        StageConfig {
            terminal: true,
            ..StageConfig::new("Magic Garden", "A peaceful paradise awaits...", 6000.0, 0, 0.0, 0.0)
        },
    ]
}

/// 1-based stage id for a cumulative distance. Stages must be sorted by threshold.
pub fn stage_for_distance(stages: &[StageConfig], distance: f32) -> u32 {
    let reached = stages.iter().filter(|s| distance >= s.distance_required).count();
    reached.max(1) as u32
}

/// Tracks the current stage and pushes difficulty changes into the subsystems
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageController {
    current: u32,
}

impl Default for StageController {
    fn default() -> Self {
        Self { current: 1 }
    }
}

impl StageController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn config<'a>(&self, stages: &'a [StageConfig]) -> Option<&'a StageConfig> {
        stages.get(self.current as usize - 1)
    }

    pub fn is_terminal(&self, stages: &[StageConfig]) -> bool {
        self.config(stages).is_some_and(|s| s.terminal)
    }

    /// Stage the distance has reached, if it is beyond the current one.
    /// Never reports a lower stage.
    pub fn check(&self, distance: f32, stages: &[StageConfig]) -> Option<u32> {
        let target = stage_for_distance(stages, distance);
        (target > self.current).then_some(target)
    }

    /// Advance through every stage the distance has crossed, applying each
    /// stage's bundle and notifying once per stage entered.
    /// Returns the new stage when a transition happened.
    pub fn update(
        &mut self,
        distance: f32,
        stages: &[StageConfig],
        traffic: &mut TrafficManager,
        obstacles: &mut ObstacleField,
        events: &mut EventQueue,
    ) -> Option<u32> {
        let target = self.check(distance, stages)?;
        while self.current < target {
            self.current += 1;
            let Some(config) = stages.get(self.current as usize - 1) else {
                break;
            };
            self.enter(config, traffic, obstacles, events);
        }
        Some(self.current)
    }

    fn enter(
        &self,
        config: &StageConfig,
        traffic: &mut TrafficManager,
        obstacles: &mut ObstacleField,
        events: &mut EventQueue,
    ) {
        log::info!("Entering {} ({})", config.name, config.description);
        traffic.apply_stage(config);
        obstacles.set_stage(self.current);
        events.push(GameEvent::StageEntered {
            stage: self.current,
            name: config.name.clone(),
            description: config.description.clone(),
            terminal: config.terminal,
        });
        let cue = if config.terminal { SoundCue::Magic } else { SoundCue::Point };
        events.sound(cue, 1.0);
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }
}

/// What a lap check produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LapOutcome {
    Completed(u32),
    /// The final lap is done
    Finished,
}

/// Lap counter: a lap completes every `lap_distance` metres past the last one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LapTracker {
    current_lap: u32,
    last_lap_distance: f32,
}

impl Default for LapTracker {
    fn default() -> Self {
        Self {
            current_lap: 1,
            last_lap_distance: 0.0,
        }
    }
}

impl LapTracker {
    pub fn current_lap(&self) -> u32 {
        self.current_lap
    }

    /// Completion of the current lap, 0-100
    pub fn progress_percent(&self, distance: f32, t: &ProgressionTuning) -> f32 {
        if t.lap_distance <= 0.0 {
            return 0.0;
        }
        ((distance - self.last_lap_distance) / t.lap_distance * 100.0).clamp(0.0, 100.0)
    }

    pub fn update(
        &mut self,
        distance: f32,
        t: &ProgressionTuning,
        events: &mut EventQueue,
    ) -> Option<LapOutcome> {
        if distance - self.last_lap_distance < t.lap_distance {
            return None;
        }
        self.current_lap += 1;
        self.last_lap_distance = distance;

        if self.current_lap > t.max_laps {
            return Some(LapOutcome::Finished);
        }

        log::info!("Lap {} of {}", self.current_lap, t.max_laps);
        events.push(GameEvent::LapCompleted {
            lap: self.current_lap,
            max_laps: t.max_laps,
        });
        events.sound(SoundCue::Point, 1.0);
        Some(LapOutcome::Completed(self.current_lap))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct World {
        stages: Vec<StageConfig>,
        traffic: TrafficManager,
        obstacles: ObstacleField,
        events: EventQueue,
    }

    impl World {
        fn drive(&mut self, controller: &mut StageController, distance: f32) -> Option<u32> {
            let World {
                stages,
                traffic,
                obstacles,
                events,
            } = self;
            controller.update(distance, stages, traffic, obstacles, events)
        }
    }

    fn world() -> World {
        let stages = default_stages();
        World {
            traffic: TrafficManager::new(&stages[0]),
            obstacles: ObstacleField::new(),
            events: EventQueue::new(),
            stages,
        }
    }

    #[test]
    fn test_stage_for_distance() {
        let stages = default_stages();
        assert_eq!(stage_for_distance(&stages, 0.0), 1);
        assert_eq!(stage_for_distance(&stages, 1999.9), 1);
        assert_eq!(stage_for_distance(&stages, 2000.0), 2);
        assert_eq!(stage_for_distance(&stages, 5000.0), 3);
        assert_eq!(stage_for_distance(&stages, 1.0e6), 4);
    }

    #[test]
    fn test_crossing_threshold_notifies_once() {
        let mut w = world();
        let mut controller = StageController::new();

        assert_eq!(w.drive(&mut controller, 1999.0), None);
        assert!(w.events.is_empty());

        assert_eq!(w.drive(&mut controller, 2001.0), Some(2));
        assert_eq!(w.drive(&mut controller, 2002.0), None);

        let entered: Vec<_> = w
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::StageEntered { .. }))
            .collect();
        assert_eq!(entered.len(), 1);
        assert_eq!(controller.current(), 2);
        assert_eq!(w.obstacles.stage(), 2);
        assert_eq!(w.traffic.max_vehicles(), 8);
        assert_eq!(w.traffic.spawn_interval_ms(), 3500.0);
    }

    #[test]
    fn test_start_is_not_a_transition() {
        let mut w = world();
        let mut controller = StageController::new();
        assert_eq!(w.drive(&mut controller, 0.0), None);
        assert!(w.events.is_empty());
    }

    #[test]
    fn test_no_regression_on_lower_distance() {
        let w = world();
        let mut controller = StageController::new();
        controller.current = 3;
        assert_eq!(controller.check(100.0, &w.stages), None);
    }

    #[test]
    fn test_terminal_stage_starts_cull_with_magic_cue() {
        let mut w = world();
        let mut controller = StageController::new();
        controller.current = 3;
        w.drive(&mut controller, 6000.0);

        assert!(controller.is_terminal(&w.stages));
        assert!(w.traffic.is_culling());
        let events = w.events.drain();
        assert!(events.iter().any(|e| matches!(e, GameEvent::StageEntered { terminal: true, .. })));
        assert!(events.contains(&GameEvent::Sound {
            cue: SoundCue::Magic,
            intensity: 1.0
        }));
    }

    #[test]
    fn test_jump_visits_every_stage() {
        let mut w = world();
        let mut controller = StageController::new();
        w.drive(&mut controller, 4500.0);
        let stages: Vec<u32> = w
            .events
            .iter()
            .filter_map(|e| match e {
                GameEvent::StageEntered { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(stages, vec![2, 3]);
    }

    #[test]
    fn test_lap_completion_and_finish() {
        let t = ProgressionTuning::default();
        let mut laps = LapTracker::default();
        let mut events = EventQueue::new();

        assert_eq!(laps.update(999.0, &t, &mut events), None);
        assert!((laps.progress_percent(500.0, &t) - 50.0).abs() < 1e-4);
        assert_eq!(laps.update(1000.0, &t, &mut events), Some(LapOutcome::Completed(2)));
        let lap_two = GameEvent::LapCompleted { lap: 2, max_laps: 6 };
        assert!(events.iter().any(|e| *e == lap_two));

        for lap in 3..=6 {
            let outcome = laps.update(lap as f32 * 1000.0 - 1000.0, &t, &mut events);
            assert_eq!(outcome, Some(LapOutcome::Completed(lap)));
        }
        assert_eq!(laps.update(6000.0, &t, &mut events), Some(LapOutcome::Finished));
    }

    #[test]
    fn test_lap_reset() {
        let t = ProgressionTuning::default();
        let mut laps = LapTracker::default();
        laps.update(1500.0, &t, &mut EventQueue::new());
        laps.reset();
        assert_eq!(laps.current_lap(), 1);
        assert_eq!(laps.progress_percent(0.0, &t), 0.0);
    }

    proptest! {
        #[test]
        fn stage_is_monotonic_in_distance(
            mut steps in proptest::collection::vec(0.0f32..400.0, 1..60),
        ) {
            let mut w = world();
            let mut controller = StageController::new();
            let mut distance = 0.0;
            let mut previous = controller.current();
            steps.sort_by(f32::total_cmp);
            for step in steps {
                distance += step;
                w.drive(&mut controller, distance);
                prop_assert!(controller.current() >= previous);
                prop_assert!(controller.current() - previous <= 1);
                prop_assert_eq!(controller.current(), stage_for_distance(&w.stages, distance));
                previous = controller.current();
            }
        }
    }
}
