use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::engine::state::PranaState;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::signals::Tick;

/// Single-writer JSON snapshot of the latest state.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Previous state, or first-tick defaults when the file is missing or
    /// unreadable.
    pub fn load(&self) -> PranaState {
        match self.try_load() {
            Ok(Some(state)) => state,
            Ok(None) => PranaState::default(),
            Err(err) => {
                log(
                    Level::Warn,
                    Domain::System,
                    "snapshot_unreadable",
                    obj(&[("path", v_str(&self.path.to_string_lossy())), ("msg", v_str(&format!("{:#}", err)))]),
                );
                PranaState::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<PranaState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).with_context(|| format!("read {}", self.path.display()))?;
        let state = serde_json::from_str(&raw).with_context(|| format!("parse {}", self.path.display()))?;
        Ok(Some(state))
    }

    /// Write to a sibling temp file, then rename over the snapshot.
    pub fn save(&self, state: &PranaState) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(state)?;
        fs::write(&tmp, body).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("rename into {}", self.path.display()))?;
        log(
            Level::Trace,
            Domain::System,
            "snapshot_saved",
            obj(&[("path", v_str(&self.path.to_string_lossy())), ("ts", json!(state.timestamp))]),
        );
        Ok(())
    }
}

/// Read the collector's latest tick.
pub fn load_tick(path: impl AsRef<Path>) -> Result<Tick> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("read tick {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse tick {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_snapshot_is_first_tick() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));
        let s = store.load();
        assert_eq!(s.timestamp, 0);
        assert_eq!(s.system.energy, 1.0);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested/state.json"));
        let mut s = PranaState::default();
        s.timestamp = 99;
        s.fear_index = 0.42;
        s.memory.changes_mean_buf = vec![0.1, -0.2];
        store.save(&s).unwrap();

        let back = store.load();
        assert_eq!(back.timestamp, 99);
        assert_eq!(back.fear_index, 0.42);
        assert_eq!(back.memory.changes_mean_buf, vec![0.1, -0.2]);
        assert!(!dir.path().join("nested/state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_snapshot_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        let s = SnapshotStore::new(&path).load();
        assert_eq!(s.system.stress, 0.15);
    }

    #[test]
    fn test_load_tick() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coins_state.json");
        fs::write(
            &path,
            r#"{"ts": 1700000000, "coins": {"bitcoin": {"price": 43000.5, "price_change_pct_24h": -1.2}}}"#,
        )
        .unwrap();
        let tick = load_tick(&path).unwrap();
        assert_eq!(tick.ts, Some(1_700_000_000));
        assert_eq!(tick.coins["bitcoin"].price_change_pct_24h, Some(-1.2));
        assert!(load_tick(dir.path().join("missing.json")).is_err());
    }
}
