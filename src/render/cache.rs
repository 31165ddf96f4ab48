//! Single-flight render scheduling.
//!
//! Every (world, region) pair has at most one job in flight. A job walks
//! `Queued -> Rendering -> Persisting` and leaves the table when it finishes;
//! the tracker is only updated after all of the region's tiles are synced to
//! disk, and before the slot is released.

use log::{debug, error, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

use super::job::{DispatchStats, RegionState, RenderJob, RenderKey};
use super::WorldEntry;
use crate::codec;
use crate::error::{MapError, Result};
use crate::region::{modified_millis, RegionCoord, RegionFile};
use crate::util;

#[derive(Default)]
struct Shared {
    states: Mutex<HashMap<RenderKey, RegionState>>,
    idle: Condvar,
    rendered: AtomicUsize,
    failed: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HashMap<RenderKey, RegionState>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, key: &RenderKey, to: RegionState) {
        if let Some(s) = self.lock().get_mut(key) {
            *s = to;
        }
    }
}

/// Releases a region's slot when its job ends, including by panic.
struct Slot<'a> {
    shared: &'a Shared,
    key: &'a RenderKey,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.shared.lock().remove(self.key);
        self.shared.idle.notify_all();
    }
}

pub struct RenderCache {
    pool: ThreadPool,
    tiles_root: Arc<PathBuf>,
    shared: Arc<Shared>,
}

impl RenderCache {
    /// `threads` of `None` lets rayon pick one worker per CPU.
    pub fn new(tiles_root: impl Into<PathBuf>, threads: Option<usize>) -> Result<Self> {
        let mut builder = ThreadPoolBuilder::new()
            .thread_name(|i| format!("render-{}", i))
            .panic_handler(|_| error!("render worker panicked; region left dirty for retry"));
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        Ok(Self {
            pool: builder.build()?,
            tiles_root: Arc::new(tiles_root.into()),
            shared: Arc::new(Shared::default()),
        })
    }

    pub fn tiles_root(&self) -> &Path {
        &self.tiles_root
    }

    /// Queues a job per region unless one is already in flight for it.
    pub fn submit<I>(&self, entry: &Arc<WorldEntry>, regions: I) -> DispatchStats
    where
        I: IntoIterator<Item = RegionFile>,
    {
        let mut stats = DispatchStats::default();
        let mut jobs = Vec::new();
        {
            let mut states = self.shared.lock();
            for region in regions {
                let key = RenderKey::new(entry.id(), region.coord);
                if let Some(state) = states.get(&key) {
                    debug!("{} already {:?}, coalescing", key, state);
                    stats.coalesced += 1;
                    continue;
                }
                // run_job commits before releasing its slot under this lock, so a
                // report older than the last commit is caught here.
                if entry.tracker.get(region.coord) >= region.modified {
                    debug!("{} rendered since scan, skipping", key);
                    stats.unchanged += 1;
                    continue;
                }
                states.insert(key.clone(), RegionState::Queued);
                jobs.push(RenderJob {
                    key,
                    submitted: Instant::now(),
                    source: region.path,
                    source_modified: region.modified,
                });
            }
        }

        stats.queued = jobs.len();
        for job in jobs {
            let shared = Arc::clone(&self.shared);
            let tiles_root = Arc::clone(&self.tiles_root);
            let entry = Arc::clone(entry);
            self.pool.spawn(move || run_job(&shared, &tiles_root, &entry, job));
        }
        stats
    }

    pub fn state(&self, world: &str, coord: RegionCoord) -> Option<RegionState> {
        self.shared.lock().get(&RenderKey::new(world, coord)).copied()
    }

    pub fn in_flight(&self) -> usize {
        self.shared.lock().len()
    }

    /// Blocks until no job is queued or running.
    pub fn wait_idle(&self) {
        let mut states = self.shared.lock();
        while !states.is_empty() {
            states = self.shared.idle.wait(states).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Blocks until no job for `world` is queued or running. Other worlds may
    /// keep submitting meanwhile.
    pub fn wait_idle_world(&self, world: &str) {
        let mut states = self.shared.lock();
        while states.keys().any(|k| k.world == world) {
            states = self.shared.idle.wait(states).unwrap_or_else(|e| e.into_inner());
        }
    }

    pub fn rendered(&self) -> usize {
        self.shared.rendered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.shared.failed.load(Ordering::Relaxed)
    }
}

fn run_job(shared: &Shared, tiles_root: &Path, entry: &WorldEntry, job: RenderJob) {
    let _slot = Slot { shared, key: &job.key };
    let coord = job.key.coord;
    shared.transition(&job.key, RegionState::Rendering);

    // Stamp with the mtime of the bytes we are about to read, so a write that
    // lands mid-render still looks newer on the next scan.
    let modified = fs::metadata(&job.source)
        .map(|m| modified_millis(&m))
        .unwrap_or(job.source_modified);

    match render_and_persist(shared, tiles_root, entry, &job) {
        Ok(tiles) => {
            entry.tracker.set(coord, modified);
            shared.rendered.fetch_add(1, Ordering::Relaxed);
            debug!(
                "rendered {} ({} tiles) in {:?}",
                job.key,
                tiles,
                job.submitted.elapsed()
            );
        }
        Err(e) => {
            shared.failed.fetch_add(1, Ordering::Relaxed);
            warn!("{} (source {})", e, job.source.display());
        }
    }
}

fn render_and_persist(shared: &Shared, tiles_root: &Path, entry: &WorldEntry, job: &RenderJob) -> Result<usize> {
    let coord = job.key.coord;
    let tiles = entry.world.render_region(coord).map_err(|reason| MapError::RenderFailure {
        world: entry.id().to_string(),
        coord,
        reason,
    })?;

    shared.transition(&job.key, RegionState::Persisting);
    for tile in &tiles {
        let path = util::tile_path(tiles_root, entry.id(), tile.zoom, coord);
        codec::write_gzip(&path, &tile.bytes)?;
    }
    Ok(tiles.len())
}
