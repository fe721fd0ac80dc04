use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, error};

use crate::player::NEAR_END_WINDOW;

/// Consumes the playback controller's position reports. Delivery is
/// best-effort; implementations must not fail the caller.
pub trait PositionSink {
    fn report(&mut self, user_id: &str, video_id: &str, position: f64);
}

/// Saved playback position for one (user, video) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEntry {
    /// absolute timeline position in seconds
    pub position: f64,
    /// unix timestamp of the last report
    pub updated_at: u64,
}

/// Playback positions stored on disk.
///
/// The controller only reads an initial value at session start and reports
/// updates; this store owns the persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionStore {
    /// map from "user:video" to the saved entry
    entries: HashMap<String, PositionEntry>,
}

impl PositionStore {
    /// Load positions from disk, falling back to an empty store.
    pub fn load() -> Self {
        let path = match Self::store_path() {
            Ok(p) => p,
            Err(_) => return Self::default(),
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(store) => {
                    debug!("loaded playback positions");
                    store
                }
                Err(e) => {
                    error!("failed to parse positions: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("failed to read positions: {}", e);
                Self::default()
            }
        }
    }

    /// Save positions to disk, best-effort.
    pub fn save(&self) {
        let path = match Self::store_path() {
            Ok(p) => p,
            Err(_) => return,
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!("failed to create positions directory: {}", e);
                return;
            }
        }

        match serde_json::to_string_pretty(self) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(&path, contents) {
                    error!("failed to write positions: {}", e);
                }
            }
            Err(e) => {
                error!("failed to serialize positions: {}", e);
            }
        }
    }

    fn store_path() -> Result<PathBuf, ()> {
        ProjectDirs::from("", "", "debridstream")
            .map(|dirs| dirs.data_dir().join("positions.json"))
            .ok_or(())
    }

    fn make_key(user_id: &str, video_id: &str) -> String {
        format!("{}:{}", user_id, video_id)
    }

    /// Saved position in seconds, 0 when the video was never watched.
    pub fn get(&self, user_id: &str, video_id: &str) -> f64 {
        self.entries
            .get(&Self::make_key(user_id, video_id))
            .map(|e| e.position)
            .unwrap_or(0.0)
    }

    pub fn update(&mut self, user_id: &str, video_id: &str, position: f64) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.entries.insert(
            Self::make_key(user_id, video_id),
            PositionEntry {
                position,
                updated_at: now,
            },
        );
    }

    pub fn clear(&mut self, user_id: &str, video_id: &str) {
        self.entries.remove(&Self::make_key(user_id, video_id));
    }

    /// Position to resume a new session from.
    ///
    /// A saved position within [`NEAR_END_WINDOW`] of the duration counts as
    /// finished: the entry is cleared and playback restarts from 0.
    pub fn resume_position(&mut self, user_id: &str, video_id: &str, duration: f64) -> f64 {
        let position = self.get(user_id, video_id);

        if position > 0.0 && position >= duration - NEAR_END_WINDOW {
            debug!(user_id, video_id, position, "near-end position, restarting from 0");
            self.clear(user_id, video_id);
            return 0.0;
        }

        position
    }
}

impl PositionSink for PositionStore {
    fn report(&mut self, user_id: &str, video_id: &str, position: f64) {
        self.update(user_id, video_id, position);
        self.save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_unknown_is_zero() {
        let store = PositionStore::default();
        assert_eq!(store.get("u1", "v1"), 0.0);
    }

    #[test]
    fn test_update_and_get() {
        let mut store = PositionStore::default();

        store.update("u1", "v1", 42.5);
        store.update("u2", "v1", 10.0);

        assert_eq!(store.get("u1", "v1"), 42.5);
        assert_eq!(store.get("u2", "v1"), 10.0);

        store.update("u1", "v1", 50.0);
        assert_eq!(store.get("u1", "v1"), 50.0);
    }

    #[test]
    fn test_clear() {
        let mut store = PositionStore::default();

        store.update("u1", "v1", 42.5);
        store.clear("u1", "v1");

        assert_eq!(store.get("u1", "v1"), 0.0);
    }

    #[test]
    fn test_sink_argument_order_matches_store() {
        let mut store = PositionStore::default();

        PositionSink::report(&mut store, "u1", "v1", 33.0);

        assert_eq!(store.get("u1", "v1"), 33.0);
        assert_eq!(store.get("v1", "u1"), 0.0);
    }

    #[test]
    fn test_resume_position_mid_stream() {
        let mut store = PositionStore::default();
        store.update("u1", "v1", 120.0);

        assert_eq!(store.resume_position("u1", "v1", 3600.0), 120.0);
        // entry survives a mid-stream resume
        assert_eq!(store.get("u1", "v1"), 120.0);
    }

    #[test]
    fn test_resume_position_near_end_clears_entry() {
        let mut store = PositionStore::default();
        store.update("u1", "v1", 3595.0);

        assert_eq!(store.resume_position("u1", "v1", 3600.0), 0.0);
        assert_eq!(store.get("u1", "v1"), 0.0);
    }

    #[test]
    fn test_resume_position_never_watched() {
        let mut store = PositionStore::default();

        assert_eq!(store.resume_position("u1", "v1", 3600.0), 0.0);
    }

    #[test]
    fn test_roundtrips_through_json() {
        let mut store = PositionStore::default();
        store.update("u1", "v1", 99.9);

        let json = serde_json::to_string(&store).unwrap();
        let restored: PositionStore = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.get("u1", "v1"), 99.9);
    }
}
