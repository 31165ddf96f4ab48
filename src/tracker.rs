//! Per-world record of when each region was last rendered.
//!
//! The in-memory table is the source of truth for staleness while the process
//! runs. It is persisted to a small SQLite file that is always rewritten in
//! full into a temporary file and renamed over the previous copy, so a crash
//! leaves either the old or the new state on disk and never a truncated one.

use log::{debug, warn};
use rusqlite::params;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use tempfile::NamedTempFile;

use crate::db::{self, with_tx, REGION_TABLE};
use crate::error::{IoContext, MapError, Result};
use crate::region::RegionCoord;

pub const STATE_FILE: &str = "region_modified.db";

#[derive(Debug)]
pub struct ModificationTracker {
    path: PathBuf,
    state: RwLock<HashMap<i64, i64>>,
    dirty: AtomicBool,
    /// Held across snapshot, write and rename so saves land in order.
    saving: Mutex<()>,
}

impl ModificationTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(HashMap::new()),
            dirty: AtomicBool::new(false),
            saving: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last successful render time for `coord`, or 0 if it was never rendered.
    pub fn get(&self, coord: RegionCoord) -> i64 {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.get(&coord.key()).copied().unwrap_or(0)
    }

    /// Only call once the region's artifacts are durably written.
    pub fn set(&self, coord: RegionCoord, modified: i64) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.insert(coord.key(), modified);
        self.dirty.store(true, Ordering::Release);
    }

    /// Forget everything, making every region dirty on the next scan.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.clear();
        self.dirty.store(true, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when there are changes not yet saved to disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Snapshot sorted by coordinate.
    pub fn entries(&self) -> Vec<(RegionCoord, i64)> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<_> = state.iter().map(|(k, v)| (RegionCoord::from_key(*k), *v)).collect();
        out.sort_unstable();
        out
    }

    /// Replaces in-memory state with the file's contents. A missing file is
    /// empty state; a file that cannot be interpreted is a `Config` error and
    /// leaves memory untouched.
    pub fn load_from_disk(&self) -> Result<usize> {
        if !self.path.exists() {
            debug!("no region state at {}, starting empty", self.path.display());
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.clear();
            self.dirty.store(false, Ordering::Release);
            return Ok(0);
        }
        let loaded = read_store(&self.path).map_err(|e| match e {
            MapError::Store(inner) => MapError::config(&self.path, inner.to_string()),
            other => other,
        })?;
        let n = loaded.len();
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = loaded;
        self.dirty.store(false, Ordering::Release);
        debug!("loaded {} region entries from {}", n, self.path.display());
        Ok(n)
    }

    /// Like `load_from_disk`, but unreadable state is treated as no prior
    /// state so every region gets re-rendered.
    pub fn load_or_reset(&self) -> usize {
        match self.load_from_disk() {
            Ok(n) => n,
            Err(e) => {
                warn!("discarding region state, all regions will re-render: {}", e);
                self.clear();
                0
            }
        }
    }

    pub fn save_to_disk(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).at(&dir)?;

        let _saving = self.saving.lock().unwrap_or_else(|e| e.into_inner());
        // Clear the flag first so a set() racing with the write marks it again.
        self.dirty.store(false, Ordering::Release);
        let rows = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            state.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>()
        };

        let result = write_store(&dir, &self.path, &rows);
        if result.is_err() {
            self.dirty.store(true, Ordering::Release);
        }
        result
    }
}

fn read_store(path: &Path) -> Result<HashMap<i64, i64>> {
    let conn = db::open_ro(path)?;
    if !db::table_exists(&conn, REGION_TABLE)? {
        return Err(MapError::config(path, format!("missing table {}", REGION_TABLE)));
    }
    let mut stmt = conn.prepare("SELECT region_key, modified FROM region_modified")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?;
    let mut out = HashMap::new();
    for r in rows {
        let (k, v) = r?;
        out.insert(k, v);
    }
    Ok(out)
}

fn write_store(dir: &Path, target: &Path, rows: &[(i64, i64)]) -> Result<()> {
    let tmp = NamedTempFile::new_in(dir).at(dir)?;
    {
        let mut conn = db::open_rw(tmp.path())?;
        db::create_tables(&conn)?;
        with_tx(&mut conn, |tx| {
            let mut insert = tx.prepare("INSERT INTO region_modified (region_key, modified) VALUES (?1, ?2)")?;
            for (k, v) in rows {
                insert.execute(params![k, v])?;
            }
            Ok(())
        })?;
        conn.close().map_err(|(_, e)| MapError::Store(e))?;
    }
    tmp.persist(target).map_err(|e| MapError::io(target, e.error))?;
    debug!("saved {} region entries to {}", rows.len(), target.display());
    Ok(())
}
