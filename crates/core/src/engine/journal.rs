//! Persistent record of completed tasks.

use std::{
    collections::BTreeMap,
    fs::{read_to_string, rename, write},
    io,
    path::{Path, PathBuf},
};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{graph::TaskKey, io::ensure_parent_dir};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub fingerprint: String,
    /// Every file the task produced on its last successful run.
    pub outputs: Vec<PathBuf>,
}

#[derive(Serialize, Deserialize)]
struct JournalRecord {
    key: TaskKey,
    #[serde(flatten)]
    entry: JournalEntry,
}

#[derive(Serialize, Deserialize, Default)]
struct JournalFile {
    tasks: Vec<JournalRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: BTreeMap<TaskKey, JournalEntry>,
}

impl Journal {
    /// Load the journal at `path`. A missing or unreadable journal starts empty.
    pub fn load(path: &Path) -> Self {
        let text = match read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("ignoring unreadable journal {}: {e}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<JournalFile>(&text) {
            Ok(file) => Self {
                entries: file.tasks.into_iter().map(|r| (r.key, r.entry)).collect(),
            },
            Err(e) => {
                warn!("ignoring corrupt journal {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let file = JournalFile {
            tasks: self
                .entries
                .iter()
                .map(|(key, entry)| JournalRecord { key: key.clone(), entry: entry.clone() })
                .collect(),
        };
        let text = serde_json::to_string_pretty(&file).map_err(io::Error::other)?;

        ensure_parent_dir(path).map_err(io::Error::other)?;
        let scratch = path.with_extension("json.tmp");
        write(&scratch, text)?;
        rename(&scratch, path)
    }

    /// Whether `key` last succeeded with `fingerprint` and its outputs still exist.
    pub fn is_fresh(&self, key: &TaskKey, fingerprint: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.fingerprint == fingerprint && e.outputs.iter().all(|p| p.exists()))
    }

    pub fn record(&mut self, key: TaskKey, entry: JournalEntry) {
        self.entries.insert(key, entry);
    }

    pub fn forget(&mut self, key: &TaskKey) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
