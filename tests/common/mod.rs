#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, UNIX_EPOCH};

use region_tiles::{RegionCoord, RenderedTile, World};

pub fn write_region(dir: &Path, x: i32, z: i32, mtime_ms: u64) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("r.{}.{}.mca", x, z));
    fs::write(&path, vec![7u8; 64]).unwrap();
    let f = File::options().write(true).open(&path).unwrap();
    f.set_modified(UNIX_EPOCH + Duration::from_millis(mtime_ms)).unwrap();
    path
}

/// Counts renders per region and can hold them at a gate or fail them.
pub struct FakeWorld {
    id: String,
    dir: PathBuf,
    calls: Mutex<HashMap<RegionCoord, usize>>,
    active: Mutex<HashMap<RegionCoord, usize>>,
    pub max_active_same_region: AtomicUsize,
    gate: Mutex<bool>,
    gate_cv: Condvar,
    fail: HashSet<RegionCoord>,
}

impl FakeWorld {
    pub fn new(id: &str, dir: &Path) -> Self {
        Self {
            id: id.to_string(),
            dir: dir.to_path_buf(),
            calls: Mutex::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
            max_active_same_region: AtomicUsize::new(0),
            gate: Mutex::new(true),
            gate_cv: Condvar::new(),
            fail: HashSet::new(),
        }
    }

    pub fn failing(mut self, coord: RegionCoord) -> Self {
        self.fail.insert(coord);
        self
    }

    pub fn close_gate(&self) {
        *self.gate.lock().unwrap() = false;
    }

    pub fn open_gate(&self) {
        *self.gate.lock().unwrap() = true;
        self.gate_cv.notify_all();
    }

    pub fn calls(&self, coord: RegionCoord) -> usize {
        self.calls.lock().unwrap().get(&coord).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn tile_bytes(coord: RegionCoord) -> Vec<u8> {
        format!("tile {} {}", coord.x, coord.z).into_bytes()
    }
}

impl World for FakeWorld {
    fn id(&self) -> &str {
        &self.id
    }

    fn region_dir(&self) -> &Path {
        &self.dir
    }

    fn render_region(&self, coord: RegionCoord) -> Result<Vec<RenderedTile>, String> {
        *self.calls.lock().unwrap().entry(coord).or_default() += 1;
        {
            let mut active = self.active.lock().unwrap();
            let n = active.entry(coord).or_default();
            *n += 1;
            self.max_active_same_region.fetch_max(*n, Ordering::SeqCst);
        }

        let mut open = self.gate.lock().unwrap();
        while !*open {
            open = self.gate_cv.wait(open).unwrap();
        }
        drop(open);

        *self.active.lock().unwrap().get_mut(&coord).unwrap() -= 1;
        if self.fail.contains(&coord) {
            return Err("rasterizer exploded".to_string());
        }
        Ok(vec![
            RenderedTile::new(0, Self::tile_bytes(coord)),
            RenderedTile::new(1, Self::tile_bytes(coord)),
        ])
    }
}
