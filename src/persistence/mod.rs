//! Best score persistence
//!
//! A single non-negative integer survives between sessions. Backends:
//! - `MemoryStore`: tests and headless runs
//! - `FileStore`: JSON file (native)
//! - `LocalStorageStore`: browser LocalStorage (wasm)

use serde::{Deserialize, Serialize};

use crate::services::ServiceError;

/// Storage key / file stem shared by every backend
pub const BEST_SCORE_KEY: &str = "infinite_slice_best_score";

/// Persistence collaborator
pub trait ScoreStore {
    /// Stored best, 0 when nothing was saved yet
    fn best_score(&self) -> Result<u64, ServiceError>;

    /// Overwrite the stored best unconditionally
    fn write_best_score(&mut self, score: u64) -> Result<(), ServiceError>;

    /// Store `score` if it beats the current best. Returns whether it did.
    fn save_best_score_if_higher(&mut self, score: u64) -> Result<bool, ServiceError> {
        if score <= self.best_score()? {
            return Ok(false);
        }
        self.write_best_score(score)?;
        log::info!("New best score: {score}");
        Ok(true)
    }
}

/// Volatile store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    best: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_best(best: u64) -> Self {
        Self { best }
    }
}

impl ScoreStore for MemoryStore {
    fn best_score(&self) -> Result<u64, ServiceError> {
        Ok(self.best)
    }

    fn write_best_score(&mut self, score: u64) -> Result<(), ServiceError> {
        self.best = score;
        Ok(())
    }
}

/// On-disk record
#[derive(Debug, Default, Serialize, Deserialize)]
struct ScoreRecord {
    best_score: u64,
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::FileStore;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::{BEST_SCORE_KEY, ScoreRecord, ScoreStore};
    use crate::services::ServiceError;

    /// JSON file store
    #[derive(Debug, Clone)]
    pub struct FileStore {
        path: PathBuf,
    }

    impl FileStore {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        /// `<dir>/infinite_slice_best_score.json`
        pub fn in_dir(dir: impl AsRef<Path>) -> Self {
            Self::new(dir.as_ref().join(format!("{BEST_SCORE_KEY}.json")))
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl ScoreStore for FileStore {
        fn best_score(&self) -> Result<u64, ServiceError> {
            let json = match std::fs::read_to_string(&self.path) {
                Ok(json) => json,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
                Err(err) => return Err(ServiceError::Backend(err.to_string())),
            };
            match serde_json::from_str::<ScoreRecord>(&json) {
                Ok(record) => Ok(record.best_score),
                Err(err) => {
                    log::warn!("Ignoring corrupt score file {}: {err}", self.path.display());
                    Ok(0)
                }
            }
        }

        fn write_best_score(&mut self, score: u64) -> Result<(), ServiceError> {
            let json = serde_json::to_string(&ScoreRecord { best_score: score })
                .map_err(|err| ServiceError::Backend(err.to_string()))?;
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|err| ServiceError::Backend(err.to_string()))?;
            }
            std::fs::write(&self.path, json).map_err(|err| ServiceError::Backend(err.to_string()))
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::LocalStorageStore;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::Storage;

    use super::{BEST_SCORE_KEY, ScoreStore};
    use crate::services::ServiceError;

    /// Browser LocalStorage store
    pub struct LocalStorageStore {
        storage: Storage,
    }

    impl LocalStorageStore {
        pub fn new() -> Result<Self, ServiceError> {
            let storage = web_sys::window()
                .and_then(|w| w.local_storage().ok())
                .flatten()
                .ok_or(ServiceError::Unavailable)?;
            Ok(Self { storage })
        }
    }

    impl ScoreStore for LocalStorageStore {
        fn best_score(&self) -> Result<u64, ServiceError> {
            let value = self
                .storage
                .get_item(BEST_SCORE_KEY)
                .map_err(|_| ServiceError::Backend("get_item".to_string()))?;
            Ok(value.and_then(|v| v.trim().parse().ok()).unwrap_or(0))
        }

        fn write_best_score(&mut self, score: u64) -> Result<(), ServiceError> {
            self.storage
                .set_item(BEST_SCORE_KEY, &score.to_string())
                .map_err(|_| ServiceError::Backend("set_item".to_string()))
        }
    }
}
