//! Presentation collaborator interface
//!
//! Renderer, HUD and DOM overlays live outside the core. They receive the
//! simulation's events and never feed anything back into game state.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::sim::{GameEvent, Viewport};

/// Failure of an external service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Backend missing (no audio context, no storage, no canvas)
    Unavailable,
    /// Backend present but the call failed
    Backend(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Unavailable => write!(f, "service unavailable"),
            ServiceError::Backend(msg) => write!(f, "service backend error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Renderer/UI collaborator. Every call is fire-and-forget.
pub trait Presenter {
    /// Prepare the surface. Failure here blocks the session from starting.
    fn init(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn present(&mut self, event: &GameEvent) -> Result<(), ServiceError>;

    fn resize(&mut self, _viewport: Viewport) {}
}

/// Presenter that narrates events through the log facade
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&mut self, event: &GameEvent) -> Result<(), ServiceError> {
        match event {
            GameEvent::GameOver(report) => log::info!(
                "Game over: score {} (max combo {}, {} slices, level {}){}{}",
                report.score,
                report.max_combo,
                report.total_slices,
                report.level_reached,
                if report.is_new_record { ", new record" } else { "" },
                if report.mission_complete { ", mission complete" } else { "" },
            ),
            GameEvent::Message { text, .. } | GameEvent::Banner { text, .. } => {
                log::info!("{text}")
            }
            GameEvent::LevelStarted { level_id, name } => {
                log::info!("Level {level_id:02} - {name}")
            }
            GameEvent::Countdown { remaining } => log::info!("{remaining}..."),
            GameEvent::Sound { .. } => {}
            other => log::debug!("{other:?}"),
        }
        Ok(())
    }
}

/// Presenter that buffers events as JSON for an external renderer to poll.
/// Clones share one queue.
#[derive(Debug, Default, Clone)]
pub struct QueuePresenter {
    queue: Rc<RefCell<Vec<serde_json::Value>>>,
}

impl QueuePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Take every buffered event as one JSON array
    pub fn drain_json(&self) -> String {
        let events = std::mem::take(&mut *self.queue.borrow_mut());
        serde_json::Value::Array(events).to_string()
    }
}

impl Presenter for QueuePresenter {
    fn present(&mut self, event: &GameEvent) -> Result<(), ServiceError> {
        let value =
            serde_json::to_value(event).map_err(|err| ServiceError::Backend(err.to_string()))?;
        self.queue.borrow_mut().push(value);
        Ok(())
    }
}
