//! Future Drive entry point
//!
//! Handles platform-specific initialization and runs the game loop. The browser
//! build ticks once per animation frame; the native build runs a headless
//! autopilot session and logs the result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, KeyboardEvent, MouseEvent};

    use future_drive::platform::{self, Storage};
    use future_drive::sim::{
        ActorId, ActorKind, EffectKind, GamePhase, GameState, SoundCue, TickInput, tick,
    };
    use future_drive::ui::{EffectSink, HudSink, HudSnapshot, Presenter, SceneSink, SinkError};
    use future_drive::{HighScores, Settings, consts::*};

    /// Actor bookkeeping; meshes live on the JS side
    struct DomScene {
        document: Document,
        actors: usize,
    }

    impl SceneSink for DomScene {
        fn spawn(&mut self, id: ActorId, kind: ActorKind) -> Result<(), SinkError> {
            self.actors += 1;
            log::debug!("spawn {:?} {:?}", id, kind);
            self.publish()
        }

        fn despawn(&mut self, id: ActorId) -> Result<(), SinkError> {
            self.actors = self.actors.saturating_sub(1);
            log::debug!("despawn {:?}", id);
            self.publish()
        }
    }

    impl DomScene {
        fn publish(&self) -> Result<(), SinkError> {
            let root = self
                .document
                .get_element_by_id("game-container")
                .ok_or_else(|| SinkError::MissingElement("game-container".to_string()))?;
            root.set_attribute("data-actors", &self.actors.to_string())
                .map_err(|e| SinkError::Failed {
                    sink: "scene",
                    reason: format!("{:?}", e),
                })
        }
    }

    const FLASH_MS: f64 = 150.0;

    struct DomEffects {
        document: Document,
    }

    impl DomEffects {
        fn body(&self) -> Result<web_sys::HtmlElement, SinkError> {
            self.document
                .body()
                .ok_or_else(|| SinkError::MissingElement("body".to_string()))
        }
    }

    fn dom_error(sink: &'static str) -> impl Fn(JsValue) -> SinkError {
        move |e| SinkError::Failed {
            sink,
            reason: format!("{:?}", e),
        }
    }

    impl EffectSink for DomEffects {
        fn effect(
            &mut self,
            kind: EffectKind,
            intensity: f32,
            duration_ms: f64,
        ) -> Result<(), SinkError> {
            let body = self.body()?;
            if kind.has_shake() {
                body.class_list().add_1("shake").map_err(dom_error("effects"))?;
                body.set_attribute("data-shake", &format!("{:.2}", intensity))
                    .map_err(dom_error("effects"))?;
                remove_class_later(body.clone(), "shake", duration_ms);
            }
            if kind.has_flash() {
                body.class_list().add_1("flash").map_err(dom_error("effects"))?;
                remove_class_later(body, "flash", FLASH_MS.min(duration_ms));
            }
            Ok(())
        }

        fn sound(&mut self, cue: SoundCue, volume: f32) -> Result<(), SinkError> {
            // Audio synthesis lives in the page script; it listens for this attribute
            let body = self.body()?;
            body.set_attribute("data-sound", &format!("{}:{:.2}", cue.as_str(), volume))
                .map_err(dom_error("audio"))
        }

        fn banner(&mut self, text: &str) -> Result<(), SinkError> {
            let body = self.body()?;
            let banner = self.document.create_element("div").map_err(dom_error("banner"))?;
            banner.set_class_name("stage-transition");
            banner.set_text_content(Some(text));
            body.append_child(&banner).map_err(dom_error("banner"))?;
            remove_element_later(banner, 2000.0);
            Ok(())
        }
    }

    fn remove_class_later(el: web_sys::HtmlElement, class: &'static str, delay_ms: f64) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move || {
            let _ = el.class_list().remove_1(class);
        });
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            delay_ms as i32,
        );
        closure.forget();
    }

    fn remove_element_later(el: web_sys::Element, delay_ms: f64) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move || el.remove());
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            delay_ms as i32,
        );
        closure.forget();
    }

    struct DomHud {
        document: Document,
    }

    impl DomHud {
        fn set_text(&self, id: &str, text: &str) -> Result<(), SinkError> {
            let el = self
                .document
                .get_element_by_id(id)
                .ok_or_else(|| SinkError::MissingElement(id.to_string()))?;
            if el.text_content().as_deref() != Some(text) {
                el.set_text_content(Some(text));
            }
            Ok(())
        }
    }

    impl HudSink for DomHud {
        fn update(&mut self, hud: &HudSnapshot) -> Result<(), SinkError> {
            self.set_text("speed", &hud.speed_text())?;
            self.set_text("distance", &hud.distance_text())?;
            self.set_text("points", &hud.points_text())?;
            self.set_text("score", &hud.score_text())?;
            self.set_text("stage", &hud.stage_label)?;
            self.set_text("lap-counter", &hud.lap_label)
        }
    }

    /// Game instance holding all state
    struct Game {
        state: GameState,
        presenter: Presenter<DomScene, DomEffects, DomHud>,
        input: TickInput,
        last_time: f64,
        storage: Box<dyn Storage>,
        high_scores: HighScores,
        recorded: bool,
    }

    impl Game {
        fn new(seed: u64, document: Document) -> Self {
            let storage = platform::default_storage();
            let settings = Settings::load(storage.as_ref());
            let high_scores = HighScores::load(storage.as_ref());
            Self {
                state: GameState::new(seed),
                presenter: Presenter::new(
                    DomScene {
                        document: document.clone(),
                        actors: 0,
                    },
                    DomEffects {
                        document: document.clone(),
                    },
                    DomHud { document },
                    settings,
                ),
                input: TickInput::default(),
                last_time: 0.0,
                storage,
                high_scores,
                recorded: false,
            }
        }

        fn update(&mut self, dt: f32) {
            // Leaving mid-run abandons it; keep its score if it earned one
            let leaving = self.input.restart || self.input.return_to_title;
            if leaving && matches!(self.state.phase, GamePhase::Playing | GamePhase::Paused) {
                self.record_run();
            }
            if leaving {
                self.recorded = false;
            }

            let input = self.input.clone();
            tick(&mut self.state, &input, dt);

            // Clear one-shot inputs after processing
            self.input.pause = false;
            self.input.restart = false;
            self.input.return_to_title = false;
            self.input.toggle_free_ride = false;

            if self.state.phase == GamePhase::Victory && !self.recorded {
                self.record_run();
            }

            let hud = HudSnapshot::capture(&self.state);
            let events = self.state.drain_events();
            self.presenter.present(events, &hud);
        }

        fn record_run(&mut self) {
            self.recorded = true;
            if self.high_scores.record_run(&self.state, platform::now_ms()).is_some() {
                self.high_scores.save(self.storage.as_ref());
            }
        }

        fn toggle_mouse_control(&mut self) {
            let settings = &mut self.presenter.settings;
            settings.mouse_control = !settings.mouse_control;
            settings.save(self.storage.as_ref());
            if !settings.mouse_control {
                self.input.pointer_steer = None;
            }
            log::info!("Mouse control: {}", settings.mouse_control);
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            return;
        }

        log::info!("Future Drive starting...");

        let Some(window) = web_sys::window() else {
            log::error!("no window");
            return;
        };
        let Some(document) = window.document() else {
            log::error!("no document");
            return;
        };

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed, document)));

        setup_input_handlers(&window, game.clone());
        request_animation_frame(game);
    }

    fn setup_input_handlers(window: &web_sys::Window, game: Rc<RefCell<Game>>) {
        // Held keys
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    "ArrowUp" => g.input.controls.accelerate = true,
                    "ArrowDown" => g.input.controls.brake = true,
                    "ArrowLeft" => g.input.controls.steer_left = true,
                    "ArrowRight" => g.input.controls.steer_right = true,
                    "Escape" | "p" | "P" => g.input.pause = true,
                    "f" | "F" => g.input.toggle_free_ride = true,
                    "m" | "M" => g.toggle_mouse_control(),
                    " " | "Enter" => {
                        if matches!(g.state.phase, GamePhase::Title | GamePhase::Victory) {
                            g.input.restart = true;
                        }
                    }
                    "r" | "R" => g.input.restart = true,
                    "q" | "Q" => {
                        if matches!(g.state.phase, GamePhase::Paused | GamePhase::Victory) {
                            g.input.return_to_title = true;
                        }
                    }
                    "i" | "I" => {
                        g.input.idle_mode = !g.input.idle_mode;
                        log::info!("Idle mode: {}", g.input.idle_mode);
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                let controls = &mut g.input.controls;
                match event.key().as_str() {
                    "ArrowUp" => controls.accelerate = false,
                    "ArrowDown" => controls.brake = false,
                    "ArrowLeft" => controls.steer_left = false,
                    "ArrowRight" => controls.steer_right = false,
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Pointer steering
        {
            let window_clone = window.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                if !g.presenter.settings.mouse_control || g.state.phase != GamePhase::Playing {
                    return;
                }
                let width = window_clone
                    .inner_width()
                    .ok()
                    .and_then(|w| w.as_f64())
                    .unwrap_or(1.0)
                    .max(1.0);
                let normalized = (event.client_x() as f64 / width) * 2.0 - 1.0;
                g.input.pointer_steer = Some(normalized as f32);
            });
            let _ = window
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                FRAME_DT
            };
            g.last_time = time;

            g.update(dt);
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use future_drive::consts::FRAME_DT;
    use future_drive::platform;
    use future_drive::sim::{GamePhase, GameState, TickInput, tick};
    use future_drive::ui::{HudSnapshot, LogSink, Presenter};
    use future_drive::{HighScores, Settings, Tuning};

    env_logger::init();
    log::info!("Future Drive (native) starting headless autopilot run...");

    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);
    let tuning = match args.next() {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| Tuning::from_json(&json).map_err(|e| e.to_string()))
        {
            Ok(tuning) => tuning,
            Err(e) => {
                log::warn!("Using default tuning, could not load {}: {}", path, e);
                Tuning::default()
            }
        },
        None => Tuning::default(),
    };

    let storage = platform::default_storage();
    let mut high_scores = HighScores::load(storage.as_ref());
    let mut presenter = Presenter::new(
        LogSink::default(),
        LogSink::default(),
        LogSink::default(),
        Settings::default(),
    );

    let mut state = GameState::with_tuning(seed, tuning);
    state.start();
    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };

    // Ten simulated minutes is plenty to finish every lap
    for _ in 0..(60 * 60 * 10) {
        tick(&mut state, &input, FRAME_DT);
        let hud = HudSnapshot::capture(&state);
        presenter.present(state.drain_events(), &hud);
        if state.phase == GamePhase::Victory {
            break;
        }
    }

    let hud = HudSnapshot::capture(&state);
    log::info!(
        "{} | {} | {} | {} | {}",
        hud.stage_label,
        hud.lap_label,
        hud.distance_text(),
        hud.speed_text(),
        hud.score_text()
    );
    if high_scores.record_run(&state, platform::now_ms()).is_some() {
        high_scores.save(storage.as_ref());
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
