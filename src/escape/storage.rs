//! Persistent escape-room state in sled: per-player progress, the latest
//! unfinished snapshot, and finished-session summaries with optional JSON export.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use log::debug;
use sled::IVec;

use crate::escape::errors::EscapeError;
use crate::escape::session::SessionSnapshot;
use crate::escape::types::{
    PlayerProgress, SessionSummary, PROGRESS_SCHEMA_VERSION, SNAPSHOT_SCHEMA_VERSION,
    SUMMARY_SCHEMA_VERSION,
};

const TREE_PROGRESS: &str = "escape_progress";
const TREE_SNAPSHOTS: &str = "escape_snapshots";
const TREE_SUMMARIES: &str = "escape_summaries";

fn next_timestamp_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1000)
}

/// Receives session results from a runner. Implemented by [`EscapeStore`];
/// tests plug in in-memory sinks.
pub trait SessionSink: Send + Sync {
    /// Called once when a session completes or expires.
    fn session_finished(
        &self,
        summary: &SessionSummary,
        progress: &PlayerProgress,
    ) -> Result<(), EscapeError>;

    /// Called when an unfinished session is paused or abandoned.
    fn checkpoint(
        &self,
        snapshot: &SessionSnapshot,
        progress: &PlayerProgress,
    ) -> Result<(), EscapeError>;
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct EscapeStoreBuilder {
    path: PathBuf,
    export_dir: Option<PathBuf>,
}

impl EscapeStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            export_dir: None,
        }
    }

    /// Also write each finished session summary as JSON under `dir`.
    pub fn with_summary_export(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    pub fn open(self) -> Result<EscapeStore, EscapeError> {
        let mut store = EscapeStore::open(self.path)?;
        store.export_dir = self.export_dir;
        Ok(store)
    }
}

/// Sled-backed persistence for player progress, saved sessions and results.
pub struct EscapeStore {
    _db: sled::Db,
    progress: sled::Tree,
    snapshots: sled::Tree,
    summaries: sled::Tree,
    export_dir: Option<PathBuf>,
}

impl EscapeStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EscapeError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let progress = db.open_tree(TREE_PROGRESS)?;
        let snapshots = db.open_tree(TREE_SNAPSHOTS)?;
        let summaries = db.open_tree(TREE_SUMMARIES)?;
        Ok(Self {
            _db: db,
            progress,
            snapshots,
            summaries,
            export_dir: None,
        })
    }

    fn players_key(player: &str) -> Vec<u8> {
        format!("players:{}", player.to_ascii_lowercase()).into_bytes()
    }

    fn summaries_prefix(player: &str) -> Vec<u8> {
        format!("summaries:{}:", player.to_ascii_lowercase()).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, EscapeError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, EscapeError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update a player's lifetime progress.
    pub fn put_progress(&self, progress: &PlayerProgress) -> Result<(), EscapeError> {
        let mut record = progress.clone();
        record.schema_version = PROGRESS_SCHEMA_VERSION;
        let bytes = Self::serialize(&record)?;
        self.progress.insert(Self::players_key(&record.player), bytes)?;
        self.progress.flush()?;
        Ok(())
    }

    pub fn get_progress(&self, player: &str) -> Result<PlayerProgress, EscapeError> {
        let Some(bytes) = self.progress.get(Self::players_key(player))? else {
            return Err(EscapeError::NotFound(format!("progress: {}", player)));
        };
        let record: PlayerProgress = Self::deserialize(bytes)?;
        if record.schema_version != PROGRESS_SCHEMA_VERSION {
            return Err(EscapeError::SchemaMismatch {
                entity: "progress",
                expected: PROGRESS_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Stored progress, or a fresh record for a first-time player.
    pub fn load_or_new_progress(&self, player: &str) -> Result<PlayerProgress, EscapeError> {
        match self.get_progress(player) {
            Ok(progress) => Ok(progress),
            Err(EscapeError::NotFound(_)) => Ok(PlayerProgress::new(player)),
            Err(e) => Err(e),
        }
    }

    pub fn list_players(&self) -> Result<Vec<String>, EscapeError> {
        let mut ids = Vec::new();
        for entry in self.progress.scan_prefix(b"players:") {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(player) = text.strip_prefix("players:") {
                ids.push(player.to_string());
            }
        }
        Ok(ids)
    }

    /// Save the in-flight session for `snapshot.player`, replacing any earlier one.
    pub fn put_snapshot(&self, snapshot: &SessionSnapshot) -> Result<(), EscapeError> {
        let bytes = Self::serialize(snapshot)?;
        self.snapshots
            .insert(Self::players_key(&snapshot.player), bytes)?;
        self.snapshots.flush()?;
        Ok(())
    }

    pub fn get_snapshot(&self, player: &str) -> Result<Option<SessionSnapshot>, EscapeError> {
        let Some(bytes) = self.snapshots.get(Self::players_key(player))? else {
            return Ok(None);
        };
        let snapshot: SessionSnapshot = Self::deserialize(bytes)?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(EscapeError::SchemaMismatch {
                entity: "snapshot",
                expected: SNAPSHOT_SCHEMA_VERSION,
                found: snapshot.schema_version,
            });
        }
        Ok(Some(snapshot))
    }

    pub fn delete_snapshot(&self, player: &str) -> Result<bool, EscapeError> {
        let removed = self.snapshots.remove(Self::players_key(player))?.is_some();
        self.snapshots.flush()?;
        Ok(removed)
    }

    /// Append a finished session's summary to the player's history.
    pub fn save_summary(&self, summary: &SessionSummary) -> Result<(), EscapeError> {
        let mut key = Self::summaries_prefix(&summary.player);
        key.extend_from_slice(format!("{:020}", next_timestamp_nanos()).as_bytes());
        let bytes = Self::serialize(summary)?;
        self.summaries.insert(key, bytes)?;
        self.summaries.flush()?;
        Ok(())
    }

    /// Summaries for `player`, oldest first.
    pub fn list_summaries(&self, player: &str) -> Result<Vec<SessionSummary>, EscapeError> {
        let mut out = Vec::new();
        for entry in self.summaries.scan_prefix(Self::summaries_prefix(player)) {
            let (_, bytes) = entry?;
            let summary: SessionSummary = Self::deserialize(bytes)?;
            if summary.schema_version != SUMMARY_SCHEMA_VERSION {
                return Err(EscapeError::SchemaMismatch {
                    entity: "summary",
                    expected: SUMMARY_SCHEMA_VERSION,
                    found: summary.schema_version,
                });
            }
            out.push(summary);
        }
        Ok(out)
    }

    /// Write `summary` as pretty JSON to `<dir>/<player>-<session>.json`.
    pub fn export_summary_json(dir: &Path, summary: &SessionSummary) -> Result<PathBuf, EscapeError> {
        let name = format!(
            "{}-{}.json",
            crate::validation::safe_filename(&summary.player),
            crate::validation::safe_filename(&summary.session_id)
        );
        let path = dir.join(name);
        let content = serde_json::to_string_pretty(summary)?;
        write_json_atomic(&path, &content)?;
        Ok(path)
    }
}

impl SessionSink for EscapeStore {
    fn session_finished(
        &self,
        summary: &SessionSummary,
        progress: &PlayerProgress,
    ) -> Result<(), EscapeError> {
        self.save_summary(summary)?;
        self.put_progress(progress)?;
        self.delete_snapshot(&summary.player)?;
        if let Some(dir) = &self.export_dir {
            let path = Self::export_summary_json(dir, summary)?;
            debug!("summary exported to {}", path.display());
        }
        Ok(())
    }

    fn checkpoint(
        &self,
        snapshot: &SessionSnapshot,
        progress: &PlayerProgress,
    ) -> Result<(), EscapeError> {
        self.put_snapshot(snapshot)?;
        self.put_progress(progress)
    }
}

fn write_json_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    lock_file.lock_exclusive()?;
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("summary.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let cand = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&cand) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.sync_all()?;
                break cand;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => return Err(e),
        }
    };
    std::fs::rename(&tmp_path, path)?;
    if let Ok(dirf) = File::open(dir) {
        let _ = dirf.sync_all();
    }
    drop(lock_file);
    Ok(())
}
