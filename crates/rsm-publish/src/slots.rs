//! Persisted slot table.
//!
//! The file holds exactly the current slot list as JSON:
//!
//! ```text
//! [{"region": "SEA", "channel_id": 1322097975324971068, "message_id": 1322...}, ...]
//! ```
//!
//! A missing or empty file is an empty table (first start). Writes go to a
//! temp file next to the target and are renamed over it, so a crash never
//! leaves a half-written table behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
    /// Region shown by the last successful update; `None` until then.
    #[serde(default)]
    pub region: Option<String>,
    pub channel_id: u64,
    pub message_id: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotTable {
    pub slots: Vec<SlotRecord>,
}

impl SlotTable {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Region currently bound to each slot, in slot order.
    pub fn bindings(&self) -> Vec<Option<String>> {
        self.slots.iter().map(|s| s.region.clone()).collect()
    }
}

#[derive(Clone, Debug)]
pub struct SlotStore {
    path: PathBuf,
}

impl SlotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<SlotTable> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SlotTable::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("read slot table failed: {}", self.path.display()))
            }
        };
        if raw.trim().is_empty() {
            return Ok(SlotTable::default());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("parse slot table failed: {}", self.path.display()))
    }

    pub fn save(&self, table: &SlotTable) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create_dir_all {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(table).context("serialize slot table failed")?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, format!("{json}\n"))
            .with_context(|| format!("write slot table failed: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace slot table failed: {}", self.path.display()))?;
        Ok(())
    }
}
