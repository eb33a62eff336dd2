//! Infinite Slice entry point
//!
//! Web: wires the browser (pointer, resize, visibility) to the runtime and
//! drives it from requestAnimationFrame. The page's renderer polls events
//! as JSON. Native: runs a headless autopilot session and logs it.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use infinite_slice::audio::{AudioSink, NullAudio, WebAudio};
    use infinite_slice::persistence::{LocalStorageStore, MemoryStore, ScoreStore};
    use infinite_slice::platform::{self, FrameClock};
    use infinite_slice::services::QueuePresenter;
    use infinite_slice::sim::GamePhase;
    use infinite_slice::{Game, Settings, Tuning};

    /// Game plus the queue the page polls
    struct Runtime {
        game: Game,
        events: QueuePresenter,
        clock: FrameClock,
    }

    thread_local! {
        static RUNTIME: RefCell<Option<Rc<RefCell<Runtime>>>> = const { RefCell::new(None) };
    }

    fn with_runtime<T>(f: impl FnOnce(&mut Runtime) -> T) -> Option<T> {
        RUNTIME.with(|slot| {
            let runtime = slot.borrow().clone()?;
            let mut runtime = runtime.borrow_mut();
            Some(f(&mut runtime))
        })
    }

    /// Start (or restart) a session. Must follow a user gesture so audio can resume.
    #[wasm_bindgen]
    pub fn start_game() {
        with_runtime(|rt| {
            rt.clock.reset();
            rt.game.start();
        });
    }

    /// Events since the last call, as a JSON array
    #[wasm_bindgen]
    pub fn drain_game_events() -> String {
        with_runtime(|rt| rt.events.drain_json()).unwrap_or_else(|| "[]".to_string())
    }

    #[wasm_bindgen]
    pub fn continue_endless() -> bool {
        with_runtime(|rt| rt.game.continue_endless()).unwrap_or(false)
    }

    #[wasm_bindgen]
    pub fn finish_mission() -> bool {
        with_runtime(|rt| rt.game.finish_mission()).unwrap_or(false)
    }

    /// Replace the player's preferences and persist them
    #[wasm_bindgen]
    pub fn apply_settings_json(json: &str) -> bool {
        let settings: Settings = match serde_json::from_str(json) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("Ignoring invalid settings: {err}");
                return false;
            }
        };
        settings.save();
        with_runtime(|rt| rt.game.set_settings(settings)).is_some()
    }

    #[wasm_bindgen]
    pub fn toggle_pause() {
        with_runtime(|rt| {
            if !rt.game.pause() {
                rt.clock.reset();
                rt.game.resume();
            }
        });
    }

    pub fn run() -> Result<(), JsValue> {
        platform::init_logging();
        log::info!("Infinite Slice starting...");

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

        let store: Box<dyn ScoreStore> = match LocalStorageStore::new() {
            Ok(store) => Box::new(store),
            Err(err) => {
                log::warn!("LocalStorage unavailable ({err}), best score will not persist");
                Box::new(MemoryStore::new())
            }
        };
        let audio: Box<dyn AudioSink> = match WebAudio::new() {
            Ok(audio) => Box::new(audio),
            Err(err) => {
                log::warn!("Web Audio unavailable ({err}), running silent");
                Box::new(NullAudio)
            }
        };
        let events = QueuePresenter::new();
        let game = Game::new(
            platform::session_seed(),
            Tuning::default(),
            Settings::load(),
            store,
            audio,
            Box::new(events.clone()),
        )
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

        let runtime = Rc::new(RefCell::new(Runtime {
            game,
            events,
            clock: FrameClock::new(),
        }));
        fit_to_window(&window, &runtime);
        setup_pointer_handlers(&window, runtime.clone())?;
        setup_resize(&window, runtime.clone())?;
        setup_auto_pause(&window, runtime.clone())?;
        RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime.clone()));

        request_animation_frame(runtime);
        log::info!("Ready, waiting for start_game()");
        Ok(())
    }

    fn fit_to_window(window: &web_sys::Window, runtime: &Rc<RefCell<Runtime>>) {
        let width = window.inner_width().ok().and_then(|v| v.as_f64());
        let height = window.inner_height().ok().and_then(|v| v.as_f64());
        if let (Some(width), Some(height)) = (width, height) {
            runtime
                .borrow_mut()
                .game
                .resize(width as f32, height as f32);
        }
    }

    fn setup_pointer_handlers(
        window: &web_sys::Window,
        runtime: Rc<RefCell<Runtime>>,
    ) -> Result<(), JsValue> {
        // Pointer down
        {
            let runtime = runtime.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::PointerEvent| {
                let mut rt = runtime.borrow_mut();
                let since_frame = rt.clock.since_last(event.time_stamp());
                rt.game.pointer_down(
                    event.client_x() as f32,
                    event.client_y() as f32,
                    since_frame,
                );
            });
            window
                .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Pointer move
        {
            let runtime = runtime.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::PointerEvent| {
                let mut rt = runtime.borrow_mut();
                let since_frame = rt.clock.since_last(event.time_stamp());
                rt.game.pointer_move(
                    event.client_x() as f32,
                    event.client_y() as f32,
                    since_frame,
                );
            });
            window
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Pointer up / cancel / leave all end the gesture
        for name in ["pointerup", "pointercancel", "pointerleave"] {
            let runtime = runtime.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::PointerEvent| {
                runtime.borrow_mut().game.pointer_up();
            });
            window.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn setup_resize(
        window: &web_sys::Window,
        runtime: Rc<RefCell<Runtime>>,
    ) -> Result<(), JsValue> {
        let window_clone = window.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            fit_to_window(&window_clone, &runtime);
        });
        window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    fn setup_auto_pause(
        window: &web_sys::Window,
        runtime: Rc<RefCell<Runtime>>,
    ) -> Result<(), JsValue> {
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        // Visibility change (tab switch, minimize)
        {
            let runtime = runtime.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut rt = runtime.borrow_mut();
                    if rt.game.phase() == GamePhase::Playing {
                        rt.game.pause();
                        log::info!("Auto-paused (tab hidden)");
                    }
                }
            });
            document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            )?;
            closure.forget();
        }

        // Window blur (click outside)
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut rt = runtime.borrow_mut();
                if rt.game.phase() == GamePhase::Playing {
                    rt.game.pause();
                    log::info!("Auto-paused (window blur)");
                }
            });
            window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn request_animation_frame(runtime: Rc<RefCell<Runtime>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(runtime, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(runtime: Rc<RefCell<Runtime>>, time: f64) {
        {
            let mut rt = runtime.borrow_mut();
            let dt = rt.clock.delta(time);
            rt.game.frame(dt);
        }
        request_animation_frame(runtime);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use infinite_slice::platform;

    platform::init_logging();
    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or_else(platform::session_seed);
    log::info!("Infinite Slice (native) starting with seed {seed}");
    log::info!("Native mode runs a headless autopilot - serve the web build to play");

    match autopilot::run(seed) {
        Ok(score) => log::info!("Autopilot finished with {score} points"),
        Err(err) => log::error!("Autopilot could not start: {err}"),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scripted player for native runs: swipes through the lowest regular
/// entity each frame and steers clear of the lime ones.
#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use glam::Vec2;

    use infinite_slice::audio::NullAudio;
    use infinite_slice::persistence::FileStore;
    use infinite_slice::services::{LogPresenter, ServiceError};
    use infinite_slice::sim::{EntityKind, GamePhase, project};
    use infinite_slice::{Game, Settings, Tuning};

    const FRAME_DT: f32 = 1.0 / 60.0;
    /// Half-length of a swipe (px)
    const SWIPE_REACH: f32 = 90.0;
    /// Swipes passing this close to a lime entity are skipped
    const SAFE_MARGIN: f32 = 80.0;
    /// Frames between swipes
    const COOLDOWN_FRAMES: u32 = 12;
    const MAX_FRAMES: u32 = 60 * 60 * 10;

    pub fn run(seed: u64) -> Result<u64, ServiceError> {
        let store = FileStore::in_dir(std::env::temp_dir());
        log::info!("Best score file: {}", store.path().display());

        let mut game = Game::new(
            seed,
            Tuning::default(),
            Settings::default(),
            Box::new(store),
            Box::new(NullAudio),
            Box::new(LogPresenter),
        )?;
        game.start();

        let mut cooldown = 0;
        let mut continued = false;
        for _ in 0..MAX_FRAMES {
            match game.phase() {
                GamePhase::Ended => break,
                GamePhase::MissionComplete => {
                    // Play one endless round, then stop at the next one
                    if continued {
                        game.finish_mission();
                    } else {
                        continued = game.continue_endless();
                    }
                    continue;
                }
                _ => {}
            }

            if cooldown == 0 {
                if let Some(target) = pick_target(&game) {
                    swipe(&mut game, target);
                    cooldown = COOLDOWN_FRAMES;
                }
            } else {
                cooldown -= 1;
            }
            game.frame(FRAME_DT);
        }

        Ok(game.state().score)
    }

    /// Screen position of the lowest safe entity
    fn pick_target(game: &Game) -> Option<Vec2> {
        let state = game.state();
        let project_entity = |position| project(position, &state.camera, state.viewport);
        let hazards: Vec<Vec2> = state
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Special)
            .filter_map(|e| project_entity(e.position))
            .collect();

        state
            .entities
            .iter()
            .filter(|e| e.kind != EntityKind::Special && !e.sliced)
            .filter_map(|e| project_entity(e.position))
            .filter(|p| state.viewport.contains(*p))
            .filter(|p| {
                hazards
                    .iter()
                    .all(|h| (h.y - p.y).abs() > SAFE_MARGIN || (h.x - p.x).abs() > SWIPE_REACH + SAFE_MARGIN)
            })
            .max_by(|a, b| a.y.total_cmp(&b.y))
    }

    /// Three samples spread over the first half of the frame
    fn swipe(game: &mut Game, target: Vec2) {
        let step = FRAME_DT / 6.0;
        game.pointer_down(target.x - SWIPE_REACH, target.y, 0.0);
        game.pointer_move(target.x - SWIPE_REACH * 0.5, target.y, step);
        game.pointer_move(target.x + SWIPE_REACH, target.y, step * 2.0);
        game.pointer_up();
    }
}
