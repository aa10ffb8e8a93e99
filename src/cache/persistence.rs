//! Snapshot persistence for the response cache.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::exact::CacheEntry;
use crate::cache::semantic::SemanticCacheEntry;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk form of both cache tiers.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub exact: Vec<CacheEntry>,
    pub semantic: Vec<SemanticCacheEntry>,
}

/// Write the snapshot through a temp file so readers never see half a file.
pub fn write_snapshot(path: &Path, snapshot: &CacheSnapshot) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, snapshot)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a snapshot. A missing file is an empty snapshot.
pub fn read_snapshot(path: &Path) -> Result<CacheSnapshot, PersistenceError> {
    if !path.exists() {
        return Ok(CacheSnapshot::default());
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
