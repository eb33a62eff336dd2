//! Session runtime
//!
//! Owns the simulation and its collaborators. Pointer input and frame
//! deltas go in; drained events fan out to audio, the presenter and the
//! score store. Collaborator failures are logged and never reach gameplay.

use glam::Vec2;

use crate::audio::AudioSink;
use crate::consts::MAX_FRAME_DT;
use crate::persistence::ScoreStore;
use crate::services::{Presenter, ServiceError};
use crate::settings::Settings;
use crate::sim::state::{GameEvent, GamePhase, GameState};
use crate::sim::tick::{self, PointerEvent, TickInput};
use crate::sim::{SliceEvent, progression};
use crate::tuning::Tuning;

pub struct Game {
    state: GameState,
    store: Box<dyn ScoreStore>,
    audio: Box<dyn AudioSink>,
    presenter: Box<dyn Presenter>,
    settings: Settings,
}

impl Game {
    /// Wire a session. Fails only if the presenter cannot initialize.
    pub fn new(
        seed: u64,
        tuning: Tuning,
        settings: Settings,
        store: Box<dyn ScoreStore>,
        mut audio: Box<dyn AudioSink>,
        mut presenter: Box<dyn Presenter>,
    ) -> Result<Self, ServiceError> {
        presenter.init()?;
        audio.set_volume(settings.effective_volume());
        Ok(Self {
            state: GameState::new(seed, tuning),
            store,
            audio,
            presenter,
            settings,
        })
    }

    /// Start (or restart) a session with the stored best score
    pub fn start(&mut self) {
        let best = self.store.best_score().unwrap_or_else(|err| {
            log::warn!("Could not read best score: {err}");
            0
        });
        self.audio.resume();
        tick::start(&mut self.state, best);
        self.dispatch();
    }

    /// Advance one animation frame
    pub fn frame(&mut self, dt: f32) {
        self.frame_with(&TickInput::default(), dt);
    }

    /// Advance one frame with buffered input
    pub fn frame_with(&mut self, input: &TickInput, dt: f32) {
        tick::tick(&mut self.state, input, dt.min(MAX_FRAME_DT));
        self.dispatch();
    }

    /// Begin a gesture. `since_frame` is how long after the last frame the
    /// sample arrived, in seconds.
    pub fn pointer_down(&mut self, x: f32, y: f32, since_frame: f32) {
        let time = self.sample_time(since_frame);
        self.pointer(PointerEvent::Down {
            position: Vec2::new(x, y),
            time,
        });
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, since_frame: f32) -> Vec<SliceEvent> {
        let time = self.sample_time(since_frame);
        self.pointer(PointerEvent::Move {
            position: Vec2::new(x, y),
            time,
        })
    }

    pub fn pointer_up(&mut self) {
        self.pointer(PointerEvent::Up);
    }

    /// Session-clock time of a sample arriving between frames
    fn sample_time(&self, since_frame: f32) -> f64 {
        let offset = if since_frame.is_finite() {
            since_frame.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };
        self.state.clock + offset as f64
    }

    fn pointer(&mut self, event: PointerEvent) -> Vec<SliceEvent> {
        let slices = tick::handle_pointer(&mut self.state, event);
        self.dispatch();
        slices
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        tick::resize(&mut self.state, width, height);
        self.presenter.resize(self.state.viewport);
    }

    pub fn pause(&mut self) -> bool {
        tick::pause(&mut self.state)
    }

    pub fn resume(&mut self) -> bool {
        tick::resume(&mut self.state)
    }

    /// Mission complete: keep playing in the endless level
    pub fn continue_endless(&mut self) -> bool {
        let continued = progression::continue_endless(&mut self.state);
        self.dispatch();
        continued
    }

    /// Mission complete: end the session as a win
    pub fn finish_mission(&mut self) -> bool {
        let finished = progression::finish_mission(&mut self.state);
        self.dispatch();
        finished
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.audio.set_volume(settings.effective_volume());
        self.settings = settings;
    }

    /// Stored best score (0 if the store is unreadable)
    pub fn best_score(&self) -> u64 {
        self.store.best_score().unwrap_or(0)
    }

    /// Fan drained events out to the collaborators
    fn dispatch(&mut self) {
        for event in self.state.drain_events() {
            match &event {
                GameEvent::Sound { cue, intensity } => {
                    if self.settings.muted {
                        continue;
                    }
                    if let Err(err) = self.audio.play(*cue, *intensity) {
                        log::warn!("Audio cue {cue:?} failed: {err}");
                    }
                }
                GameEvent::GameOver(report) => {
                    if let Err(err) = self.store.save_best_score_if_higher(report.score) {
                        log::warn!("Could not save best score: {err}");
                    }
                }
                _ => {}
            }

            if !self.settings.allows(&event) {
                continue;
            }
            if let Err(err) = self.presenter.present(&event) {
                log::warn!("Presenter rejected {event:?}: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{NullAudio, SoundCue};
    use crate::persistence::MemoryStore;
    use crate::sim::state::{Entity, EntityKind, MachineColor};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Recorder {
        events: Rc<RefCell<Vec<GameEvent>>>,
        fail: bool,
    }

    impl Presenter for Recorder {
        fn present(&mut self, event: &GameEvent) -> Result<(), ServiceError> {
            self.events.borrow_mut().push(event.clone());
            if self.fail {
                return Err(ServiceError::Backend("render".to_string()));
            }
            Ok(())
        }
    }

    struct BrokenAudio;

    impl AudioSink for BrokenAudio {
        fn play(&mut self, _cue: SoundCue, _intensity: f32) -> Result<(), ServiceError> {
            Err(ServiceError::Unavailable)
        }
    }

    struct NoCanvas;

    impl Presenter for NoCanvas {
        fn init(&mut self) -> Result<(), ServiceError> {
            Err(ServiceError::Unavailable)
        }

        fn present(&mut self, _event: &GameEvent) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    fn game_with(recorder: Recorder, audio: Box<dyn AudioSink>, best: u64) -> Game {
        Game::new(
            9,
            Tuning::default(),
            Settings::default(),
            Box::new(MemoryStore::with_best(best)),
            audio,
            Box::new(recorder),
        )
        .expect("presenter init")
    }

    #[test]
    fn test_presenter_init_failure_blocks_start() {
        let game = Game::new(
            1,
            Tuning::default(),
            Settings::default(),
            Box::new(MemoryStore::new()),
            Box::new(NullAudio),
            Box::new(NoCanvas),
        );
        assert_eq!(game.err(), Some(ServiceError::Unavailable));
    }

    #[test]
    fn test_start_reads_best_score() {
        let recorder = Recorder::default();
        let mut game = game_with(recorder.clone(), Box::new(NullAudio), 120);
        game.start();
        assert_eq!(game.phase(), GamePhase::Playing);
        assert_eq!(game.state().best_score, 120);
        assert!(
            recorder
                .events
                .borrow()
                .iter()
                .any(|e| matches!(e, GameEvent::LevelStarted { .. }))
        );
    }

    #[test]
    fn test_swipe_scores_through_runtime() {
        let mut game = game_with(Recorder::default(), Box::new(NullAudio), 0);
        game.start();
        let id = game.state.next_entity_id();
        game.state
            .add_entity(Entity::new(id, EntityKind::Normal, MachineColor::Green));

        game.pointer_down(300.0, 360.0, 0.0);
        game.pointer_move(500.0, 360.0, 0.004);
        let slices = game.pointer_move(900.0, 360.0, 0.008);
        game.pointer_up();

        assert_eq!(slices.len(), 1);
        assert_eq!(game.state().score, 10);
    }

    #[test]
    fn test_game_over_saves_record() {
        let mut game = game_with(Recorder::default(), Box::new(NullAudio), 5);
        game.start();
        game.state.score = 40;
        for _ in 0..250 {
            game.frame(0.1);
        }
        assert_eq!(game.phase(), GamePhase::Ended);
        assert_eq!(game.best_score(), 40);
    }

    #[test]
    fn test_lower_score_keeps_record() {
        let mut game = game_with(Recorder::default(), Box::new(NullAudio), 500);
        game.start();
        game.state.score = 40;
        for _ in 0..250 {
            game.frame(0.1);
        }
        assert_eq!(game.best_score(), 500);
    }

    #[test]
    fn test_service_failures_do_not_stop_play() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let mut game = game_with(recorder.clone(), Box::new(BrokenAudio), 0);
        game.start();
        for _ in 0..30 {
            game.frame(0.05);
        }
        assert_eq!(game.phase(), GamePhase::Playing);
        assert!(!recorder.events.borrow().is_empty());
    }

    #[test]
    fn test_reduced_motion_filters_effects() {
        let recorder = Recorder::default();
        let mut game = game_with(recorder.clone(), Box::new(NullAudio), 0);
        game.set_settings(Settings {
            reduced_motion: true,
            ..Settings::default()
        });
        game.start();
        // A special slice shakes the screen
        let id = game.state.next_entity_id();
        game.state
            .add_entity(Entity::new(id, EntityKind::Special, MachineColor::Lime));
        game.pointer_down(300.0, 360.0, 0.0);
        game.pointer_move(500.0, 360.0, 0.004);
        game.pointer_move(900.0, 360.0, 0.008);

        assert_eq!(game.state().lives, 2);
        assert!(
            !recorder
                .events
                .borrow()
                .iter()
                .any(|e| matches!(e, GameEvent::ScreenShake { .. }))
        );
    }

    #[test]
    fn test_swipe_between_frames_has_speed() {
        let mut game = game_with(Recorder::default(), Box::new(NullAudio), 0);
        game.start();
        game.frame(0.016);

        game.pointer_down(100.0, 100.0, 0.002);
        game.pointer_move(200.0, 100.0, 0.010);

        let points = game.state().blade.points();
        assert_eq!(points.len(), 2);
        assert!(points[1].time > points[0].time);
        assert!(game.state().blade.speed() > 0.0);
    }

    #[test]
    fn test_resize_moves_projection() {
        let mut game = game_with(Recorder::default(), Box::new(NullAudio), 0);
        game.resize(800.0, 600.0);
        assert_eq!(game.state().viewport.width, 800.0);
        assert!((game.state().camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }
}
