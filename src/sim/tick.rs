//! Per-frame simulation tick
//!
//! A run opens with a countdown that only runs its own clock. After that the
//! order within a tick is fixed: vehicle, then traffic and obstacles, then
//! collision resolution, then stage and lap progression. Collisions see the
//! player's updated position and progression sees the updated distance.

use super::collision::CollisionContext;
use super::events::SoundCue;
use super::stage::LapOutcome;
use super::state::{GamePhase, GameState};
use super::vehicle::Controls;
use crate::consts::MAX_FRAME_DT;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Held keys
    pub controls: Controls,
    /// Normalized pointer position in [-1, 1] when mouse steering is on
    pub pointer_steer: Option<f32>,
    /// Pause toggle
    pub pause: bool,
    pub toggle_free_ride: bool,
    /// Start a fresh run
    pub restart: bool,
    /// Abandon the run and go back to the menu
    pub return_to_title: bool,
    /// Demo mode - the autopilot drives
    pub idle_mode: bool,
}

/// Advance the game state by one frame of `dt` seconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.return_to_title {
        state.return_to_title();
    }
    if input.restart {
        state.start();
    }

    let dt = dt.clamp(0.0, MAX_FRAME_DT);
    // Every other input waits for GO
    if let GamePhase::Countdown { .. } = state.phase {
        state.advance_countdown((dt * 1000.0).round() as u32);
        return;
    }

    if input.toggle_free_ride {
        state.set_free_ride(!state.free_ride);
    }
    if input.pause {
        state.toggle_pause();
    }
    if matches!(state.phase, GamePhase::Title | GamePhase::Paused) {
        return;
    }

    state.time_ticks += 1;
    state.clock_ms += dt as f64 * 1000.0;
    let now = state.clock_ms;
    state.effects.prune(now);

    // Vehicle
    state.player.controls = if input.idle_mode {
        autopilot(state)
    } else {
        input.controls
    };
    if let Some(pointer) = input.pointer_steer {
        // The pointer owns steering; arrow keys only drive the pedals
        state.player.controls.steer_left = false;
        state.player.controls.steer_right = false;
        state.player.set_pointer_steering(pointer, &state.tuning.vehicle);
    }
    let multiplier = state.effects.multiplier(now);
    if state.player.update(&state.tuning.vehicle, now, multiplier) {
        state.events.sound(SoundCue::Brake, 1.0);
    }

    // Traffic and obstacles move in the player's frame at the effective speed
    let effective = state.player.speed * multiplier;
    let stage = state.stages.current();
    state.traffic.update(
        effective,
        dt,
        stage,
        &state.tuning.traffic,
        &mut state.rng,
        &mut state.ids,
        &mut state.events,
    );
    state.obstacles.update(
        effective,
        dt,
        &state.tuning.obstacles,
        &mut state.rng,
        &mut state.ids,
        &mut state.events,
    );

    state.collisions.resolve(CollisionContext {
        player: &mut state.player,
        traffic: &state.traffic,
        obstacles: &mut state.obstacles,
        effects: &mut state.effects,
        stage,
        tuning: &state.tuning,
        now_ms: now,
        rng: &mut state.rng,
        events: &mut state.events,
    });

    // Progression stops in free ride and after the last lap
    if state.phase != GamePhase::Playing || state.free_ride {
        return;
    }
    let distance = state.player.distance;
    state.stages.update(
        distance,
        &state.tuning.stages,
        &mut state.traffic,
        &mut state.obstacles,
        &mut state.events,
    );
    let lap = state
        .laps
        .update(distance, &state.tuning.progression, &mut state.events);
    if let Some(LapOutcome::Finished) = lap {
        state.win();
    }
}

/// Demo driver: keep accelerating and drift toward the clearest lane ahead
fn autopilot(state: &GameState) -> Controls {
    let lane_width = state.tuning.obstacles.lane_width;
    let threat = |lane: i8| -> f32 {
        let x = lane as f32 * lane_width;
        let trucks = state
            .traffic
            .vehicles()
            .iter()
            .filter(|v| v.active && v.z > -5.0)
            .filter(|v| (v.x(&state.tuning.traffic) - x).abs() < lane_width * 0.75)
            .map(|v| v.z);
        let obstacles = state
            .obstacles
            .obstacles()
            .iter()
            .filter(|o| o.active && !o.has_collided && o.position.z > -2.0)
            .filter(|o| (o.position.x - x).abs() < lane_width * 0.75)
            .map(|o| o.position.z);
        // Nearest hazard ahead; empty lanes score as far away
        trucks.chain(obstacles).fold(f32::MAX, f32::min)
    };

    let target = [0i8, -1, 1]
        .into_iter()
        .max_by(|a, b| threat(*a).total_cmp(&threat(*b)))
        .unwrap_or(0);
    let target_x = target as f32 * lane_width;
    let offset = state.player.lateral_offset;

    Controls {
        accelerate: true,
        brake: false,
        steer_left: offset > target_x + 0.3,
        steer_right: offset < target_x - 0.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FRAME_DT;
    use crate::sim::events::GameEvent;
    use crate::sim::obstacles::ObstacleKind;

    fn playing(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        state.start();
        state.begin_race();
        state.drain_events();
        state
    }

    fn accelerate() -> TickInput {
        TickInput {
            controls: Controls {
                accelerate: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_title_does_not_simulate() {
        let mut state = GameState::new(1);
        tick(&mut state, &accelerate(), FRAME_DT);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.player.speed, 0.0);
    }

    #[test]
    fn test_accelerating_moves_the_car() {
        let mut state = playing(1);
        for _ in 0..120 {
            tick(&mut state, &accelerate(), FRAME_DT);
        }
        assert!(state.player.speed > 0.0);
        assert!(state.player.distance > 0.0);
        assert!((state.clock_ms - 2000.0).abs() < 1.0);
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut state = playing(1);
        tick(&mut state, &accelerate(), FRAME_DT);
        let pause = TickInput {
            pause: true,
            ..accelerate()
        };
        tick(&mut state, &pause, FRAME_DT);
        let (speed, ticks) = (state.player.speed, state.time_ticks);
        for _ in 0..30 {
            tick(&mut state, &accelerate(), FRAME_DT);
        }
        assert_eq!(state.player.speed, speed);
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let mut state = playing(1);
        tick(&mut state, &accelerate(), 5.0);
        assert!((state.clock_ms - MAX_FRAME_DT as f64 * 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_brake_cue_on_press_edge_only() {
        let mut state = playing(1);
        state.player.speed = 50.0;
        let brake = TickInput {
            controls: Controls {
                brake: true,
                ..Default::default()
            },
            ..Default::default()
        };
        for _ in 0..10 {
            tick(&mut state, &brake, FRAME_DT);
        }
        let brakes = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::Sound { cue: SoundCue::Brake, .. }))
            .count();
        assert_eq!(brakes, 1);
    }

    #[test]
    fn test_obstacle_hit_slows_effective_speed() {
        let mut state = playing(1);
        state.player.speed = 60.0;
        let t = state.tuning.obstacles.clone();
        state
            .obstacles
            .try_place(ObstacleKind::Roadblock, 0, 0.5, &t, &mut state.ids, &mut state.events);

        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.effects.len(), 1);
        assert!(state.effective_speed() < state.player.speed * 0.25);
    }

    #[test]
    fn test_stage_transition_after_threshold() {
        let mut state = playing(1);
        state.player.distance = 1999.9;
        state.player.speed = 60.0;
        tick(&mut state, &accelerate(), FRAME_DT);
        assert_eq!(state.current_stage(), 2);
        let entered = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::StageEntered { .. }))
            .count();
        assert_eq!(entered, 1);
        assert_eq!(state.obstacles.stage(), 2);
    }

    #[test]
    fn test_free_ride_skips_progression() {
        let mut state = playing(1);
        let toggle = TickInput {
            toggle_free_ride: true,
            ..accelerate()
        };
        tick(&mut state, &toggle, FRAME_DT);
        assert!(state.free_ride);

        state.player.distance = 4500.0;
        tick(&mut state, &accelerate(), FRAME_DT);
        assert_eq!(state.current_stage(), 1);
        assert_eq!(state.laps.current_lap(), 1);
    }

    #[test]
    fn test_finishing_last_lap_wins_and_keeps_simulating() {
        let mut state = playing(1);
        for lap in 1..=5 {
            state.player.distance = lap as f32 * 1000.0;
            tick(&mut state, &TickInput::default(), FRAME_DT);
        }
        assert_eq!(state.laps.current_lap(), 6);
        assert_eq!(state.phase, GamePhase::Playing);

        state.player.distance = 6000.0;
        tick(&mut state, &TickInput::default(), FRAME_DT);
        assert_eq!(state.phase, GamePhase::Victory);
        assert!(state.traffic.is_culling());

        let events = state.drain_events();
        let stage_at = events
            .iter()
            .position(|e| matches!(e, GameEvent::StageEntered { terminal: true, .. }));
        let victory_at = events.iter().position(|e| matches!(e, GameEvent::Victory { .. }));
        assert!(stage_at.is_some() && victory_at.is_some());
        assert!(stage_at < victory_at);

        let ticks = state.time_ticks;
        tick(&mut state, &accelerate(), FRAME_DT);
        assert_eq!(state.time_ticks, ticks + 1);
        assert_eq!(state.score(), 120);
    }

    #[test]
    fn test_restart_clears_run() {
        let mut state = playing(1);
        for _ in 0..60 {
            tick(&mut state, &accelerate(), FRAME_DT);
        }
        let restart = TickInput {
            restart: true,
            ..Default::default()
        };
        tick(&mut state, &restart, FRAME_DT);
        assert!(matches!(state.phase, GamePhase::Countdown { .. }));
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.player.distance, 0.0);
    }

    #[test]
    fn test_countdown_ignores_controls_until_go() {
        let mut state = GameState::new(1);
        state.start();
        let eager = TickInput {
            pause: true,
            toggle_free_ride: true,
            ..accelerate()
        };
        // 3.9 seconds of countdown
        for _ in 0..39 {
            tick(&mut state, &eager, 0.1);
        }
        assert!(matches!(state.phase, GamePhase::Countdown { .. }));
        assert_eq!(state.player.speed, 0.0);
        assert_eq!(state.time_ticks, 0);
        assert!(!state.free_ride);

        tick(&mut state, &accelerate(), 0.1);
        assert_eq!(state.phase, GamePhase::Playing);
        let go = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::Countdown { .. }))
            .count();
        assert_eq!(go, 4);

        tick(&mut state, &accelerate(), FRAME_DT);
        assert!(state.player.speed > 0.0);
    }

    #[test]
    fn test_pointer_overrides_arrow_steering() {
        let mut state = playing(1);
        let input = TickInput {
            controls: Controls {
                steer_left: true,
                ..Default::default()
            },
            pointer_steer: Some(0.0),
            ..Default::default()
        };
        tick(&mut state, &input, FRAME_DT);
        assert!(!state.player.controls.steer_left);
        assert!(!state.player.controls.steer_right);
    }

    #[test]
    fn test_return_to_title_stops_simulation() {
        let mut state = playing(1);
        for _ in 0..30 {
            tick(&mut state, &accelerate(), FRAME_DT);
        }
        let quit = TickInput {
            return_to_title: true,
            ..accelerate()
        };
        tick(&mut state, &quit, FRAME_DT);
        assert_eq!(state.phase, GamePhase::Title);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.player.speed, 0.0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed| {
            let mut state = playing(seed);
            for _ in 0..1200 {
                let input = TickInput {
                    idle_mode: true,
                    ..Default::default()
                };
                tick(&mut state, &input, FRAME_DT);
            }
            (state.player.distance, state.traffic.len(), state.obstacles.len())
        };
        assert_eq!(run(77), run(77));
    }

    #[test]
    fn test_autopilot_avoids_blocked_lane() {
        let mut state = playing(1);
        let t = state.tuning.obstacles.clone();
        state
            .obstacles
            .try_place(ObstacleKind::Roadblock, 0, 30.0, &t, &mut state.ids, &mut state.events);
        let controls = autopilot(&state);
        assert!(controls.accelerate);
        assert!(controls.steer_left || controls.steer_right);
    }
}
