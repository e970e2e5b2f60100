//! Local state of managed cloud exports
//!
//! [`ExportState`] is the last-known flat tree of one managed export. The
//! [`StateStore`] persists them in `.cloudexport/state.json`, keyed by
//! resource address.

use crate::error::{CloudExportError, Result};
use crate::flat::FlatTree;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".cloudexport";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const STATE_STAGING: &str = "state.json.tmp";
const LOCK_FILE: &str = "lock.json";
const STALE_LOCK_HOURS: i64 = 1;

/// Last-known state of one managed export
///
/// The export is present exactly when `id` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportState {
    /// Server-assigned identifier, empty while absent
    pub id: String,

    /// Flat tree as last read from the server
    pub attributes: FlatTree,

    /// Last time the state was written by a reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExportState {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_present(&self) -> bool {
        !self.id.is_empty()
    }

    pub(crate) fn set_present(&mut self, id: String, attributes: FlatTree) {
        self.id = id;
        self.attributes = attributes;
        self.updated_at = Some(Utc::now());
    }

    pub(crate) fn clear(&mut self) {
        self.id.clear();
        self.attributes = FlatTree::new();
        self.updated_at = Some(Utc::now());
    }
}

/// Contents of the state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,

    pub updated_at: DateTime<Utc>,

    /// Exports indexed by resource address
    pub exports: BTreeMap<String, ExportState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            exports: BTreeMap::new(),
        }
    }
}

impl StateFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for `address`, absent if never recorded
    pub fn export(&self, address: &str) -> ExportState {
        self.exports.get(address).cloned().unwrap_or_default()
    }

    /// Record the state for `address`; absent exports are dropped from the file
    pub fn set_export(&mut self, address: impl Into<String>, state: ExportState) {
        let address = address.into();
        if state.is_present() {
            self.exports.insert(address, state);
        } else {
            self.exports.remove(&address);
        }
        self.updated_at = Utc::now();
    }
}

/// Reads and writes `.cloudexport/state.json` under a project root
///
/// Saves go through a staging file that is renamed over the state file, so a
/// crash mid-write never leaves a truncated state behind.
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    /// Path of the state file
    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Copy of the previous state file, refreshed on every save
    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(STATE_BACKUP)
    }

    /// Where the next state is written before it replaces the state file
    fn staging_path(&self) -> PathBuf {
        self.dir.join(STATE_STAGING)
    }

    /// Lock file held while a reconciliation runs
    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    /// Load the state file, or an empty state if there is none yet
    pub async fn load(&self) -> Result<StateFile> {
        let path = self.state_path();
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No state file at {}, starting empty", path.display());
                return Ok(StateFile::new());
            }
            Err(e) => return Err(e.into()),
        };

        let state: StateFile = serde_json::from_slice(&content).map_err(|e| {
            CloudExportError::StateError(format!("{} is not a valid state file: {}", path.display(), e))
        })?;
        if state.version > STATE_VERSION {
            return Err(CloudExportError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} exports", state.exports.len());
        Ok(state)
    }

    /// Replace the state file, keeping a copy of the previous one
    pub async fn save(&self, state: &StateFile) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let staging = self.staging_path();
        fs::write(&staging, serde_json::to_vec_pretty(state)?).await?;

        let path = self.state_path();
        match fs::copy(&path, self.backup_path()).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::rename(&staging, &path).await?;

        tracing::debug!(
            "Saved state with {} exports to {}",
            state.exports.len(),
            path.display()
        );
        Ok(())
    }

    /// Take the exclusive state lock
    ///
    /// The lock file is created atomically. A lock older than one hour is
    /// treated as abandoned and taken over.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.lock_path();
        let info = LockInfo {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_vec(&info)?;

        // second round only after removing a stale lock
        for _ in 0..2 {
            let created = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match created {
                Ok(mut file) => {
                    file.write_all(&content).await?;
                    file.flush().await?;
                    tracing::debug!("Acquired state lock {}", path.display());
                    return Ok(StateLock { path: Some(path) });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let holder = LockInfo::read(&path).await?;
                    if !holder.is_stale() {
                        return Err(CloudExportError::LockError(format!(
                            "State is locked by process {} since {}",
                            holder.pid, holder.acquired_at
                        )));
                    }
                    tracing::warn!(
                        "Taking over stale state lock of process {} (held since {})",
                        holder.pid,
                        holder.acquired_at
                    );
                    remove_if_present(&path).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CloudExportError::LockError(format!(
            "{} was re-created while taking over a stale lock",
            path.display()
        )))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    acquired_at: DateTime<Utc>,
}

impl LockInfo {
    /// Holder of an existing lock file
    ///
    /// A lock file that cannot be parsed (its writer may have died before
    /// writing it) is dated by its modification time.
    async fn read(path: &Path) -> Result<Self> {
        let content = fs::read(path).await?;
        if let Ok(info) = serde_json::from_slice(&content) {
            return Ok(info);
        }
        let modified = fs::metadata(path).await?.modified()?;
        Ok(Self {
            pid: 0,
            acquired_at: DateTime::<Utc>::from(modified),
        })
    }

    fn is_stale(&self) -> bool {
        Utc::now().signed_duration_since(self.acquired_at) >= Duration::hours(STALE_LOCK_HOURS)
    }
}

/// Remove a file, ignoring a missing one
async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Exclusive hold on the state; the lock file is removed on release or drop
pub struct StateLock {
    path: Option<PathBuf>,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if let Some(path) = self.path.take() {
            remove_if_present(&path).await?;
            tracing::debug!("Released state lock");
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
