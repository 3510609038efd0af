//! Raw API responses on disk.
//!
//! Each fetch writes into its own snapshot directory `{root}/{YYYYMMDD_HHMM}/`.
//! The parse stages pick the newest document of each kind across all
//! snapshots.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::domain::Instant;

use super::error::StoreError;

/// Kind of raw timetable document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Plan,
    Changes,
}

impl RawKind {
    /// File name prefix shared by every document of this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            RawKind::Plan => "timetable_plan_",
            RawKind::Changes => "timetable_changes_",
        }
    }

    /// File name for a document fetched for `eva` in snapshot `stamp`.
    pub fn file_name(self, eva: &str, stamp: &str) -> String {
        format!("{}{eva}_{stamp}.xml", self.prefix())
    }

    fn matches(self, name: &str) -> bool {
        name.starts_with(self.prefix()) && name.ends_with(".xml")
    }
}

impl fmt::Display for RawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RawKind::Plan => "plan",
            RawKind::Changes => "changes",
        })
    }
}

/// Snapshot directory name for a fetch started at `at`.
pub fn stamp(at: &Instant) -> String {
    at.format("%Y%m%d_%H%M").to_string()
}

/// Root directory holding raw snapshots.
#[derive(Debug, Clone)]
pub struct RawStore {
    root: PathBuf,
}

impl RawStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create (or reuse) the snapshot directory for a fetch started at `at`.
    pub fn create_snapshot(&self, at: &Instant) -> Result<Snapshot, StoreError> {
        let stamp = stamp(at);
        let dir = self.root.join(&stamp);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(Snapshot { dir, stamp })
    }

    /// Newest document of `kind` anywhere under the root.
    ///
    /// Newest means lexicographically last by full path, which orders
    /// snapshot directories by time.
    pub fn latest(&self, kind: RawKind) -> Result<PathBuf, StoreError> {
        let missing = || StoreError::MissingInput {
            path: self.root.join(format!("*/{}*.xml", kind.prefix())),
            step: "fetch",
        };

        if !self.root.is_dir() {
            return Err(missing());
        }

        let mut newest: Option<PathBuf> = None;
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|source| StoreError::Walk {
                path: self.root.clone(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if kind.matches(name) && newest.as_deref().is_none_or(|n| entry.path() > n) {
                newest = Some(entry.into_path());
            }
        }

        let path = newest.ok_or_else(missing)?;
        debug!(kind = %kind, path = %path.display(), "newest raw document");
        Ok(path)
    }

    /// Read the newest document of `kind`.
    pub fn read_latest(&self, kind: RawKind) -> Result<(PathBuf, String), StoreError> {
        let path = self.latest(kind)?;
        let text = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok((path, text))
    }
}

/// One snapshot directory.
#[derive(Debug, Clone)]
pub struct Snapshot {
    dir: PathBuf,
    stamp: String,
}

impl Snapshot {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// Write a text file into the snapshot, returning its path.
    pub fn save_text(&self, name: &str, contents: &str) -> Result<PathBuf, StoreError> {
        let path = self.dir.join(name);
        std::fs::write(&path, contents).map_err(|e| StoreError::io(&path, e))?;
        debug!(path = %path.display(), bytes = contents.len(), "saved raw file");
        Ok(path)
    }

    /// Write a value as pretty JSON into the snapshot.
    pub fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, StoreError> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        self.save_text(name, &json)
    }
}
