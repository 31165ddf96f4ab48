//! Process-level wiring: one render cache and marker registry shared by all
//! registered worlds, driven by a periodic tick.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::Result;
use crate::markers::{FlushStats, Layer, MarkerRegistry};
use crate::render::{DispatchStats, RenderCache, World, WorldEntry};
use crate::scanner::RegionScanner;
use crate::tracker::ModificationTracker;
use crate::util;

pub struct MapService {
    config: Config,
    tiles_root: PathBuf,
    worlds: RwLock<HashMap<String, Arc<WorldEntry>>>,
    renders: RenderCache,
    markers: MarkerRegistry,
}

impl MapService {
    pub fn new(config: Config) -> Result<Self> {
        let tiles_root = util::tiles_root(&config.web_dir);
        let renders = RenderCache::new(tiles_root.clone(), config.threads)?;
        Ok(Self {
            config,
            tiles_root,
            worlds: RwLock::new(HashMap::new()),
            renders,
            markers: MarkerRegistry::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn renders(&self) -> &RenderCache {
        &self.renders
    }

    pub fn markers(&self) -> &MarkerRegistry {
        &self.markers
    }

    /// Registers a world and loads its render state. Unreadable state is
    /// discarded, which means a full re-render.
    pub fn register_world(&self, world: Arc<dyn World>) -> Arc<WorldEntry> {
        let id = world.id().to_string();
        let tracker = Arc::new(ModificationTracker::new(util::state_path(&self.config.state_dir, &id)));
        let loaded = tracker.load_or_reset();
        info!("registered world {} ({} regions tracked)", id, loaded);
        let entry = Arc::new(WorldEntry::new(world, tracker));
        self.worlds_mut().insert(id, Arc::clone(&entry));
        entry
    }

    /// Waits for in-flight renders, then saves the world's state.
    pub fn unregister_world(&self, world_id: &str) -> Result<()> {
        let Some(entry) = self.worlds_mut().remove(world_id) else { return Ok(()) };
        self.renders.wait_idle_world(world_id);
        self.markers.forget_world(world_id);
        entry.tracker.save_to_disk()
    }

    pub fn world(&self, world_id: &str) -> Option<Arc<WorldEntry>> {
        self.worlds.read().unwrap_or_else(|e| e.into_inner()).get(world_id).cloned()
    }

    fn worlds_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<WorldEntry>>> {
        self.worlds.write().unwrap_or_else(|e| e.into_inner())
    }

    fn all_worlds(&self) -> Vec<Arc<WorldEntry>> {
        self.worlds.read().unwrap_or_else(|e| e.into_inner()).values().cloned().collect()
    }

    /// Scans one world and dispatches a render for each dirty region.
    pub fn scan_world(&self, world_id: &str) -> Result<DispatchStats> {
        let Some(entry) = self.world(world_id) else { return Ok(DispatchStats::default()) };
        self.scan_entry(&entry)
    }

    /// The configured `region-dir` for a world wins over the one it reports.
    fn region_dir<'a>(&'a self, entry: &'a WorldEntry) -> &'a Path {
        match self.config.world(entry.id()) {
            Some(w) => &w.region_dir,
            None => entry.world.region_dir(),
        }
    }

    fn scan_entry(&self, entry: &Arc<WorldEntry>) -> Result<DispatchStats> {
        let report = RegionScanner::new(&entry.tracker)
            .with_extension(&self.config.region_extension)
            .scan(self.region_dir(entry))?;
        if report.is_empty() {
            debug!("{}: nothing to render ({} unchanged)", entry.id(), report.unchanged);
            return Ok(DispatchStats::default());
        }
        let stats = self.renders.submit(entry, report.dirty.into_values());
        info!(
            "{}: queued {} regions ({} already in flight, {} rendered since scan)",
            entry.id(),
            stats.queued,
            stats.coalesced,
            stats.unchanged
        );
        Ok(stats)
    }

    /// Forgets all render state for a world and rescans it, so every region
    /// with data gets rendered again.
    pub fn trigger_full_rescan(&self, world_id: &str) -> Result<DispatchStats> {
        let Some(entry) = self.world(world_id) else { return Ok(DispatchStats::default()) };
        info!("{}: full rescan requested", world_id);
        entry.tracker.clear();
        self.scan_entry(&entry)
    }

    pub fn get_marker_layer(&self, world_id: &str, layer_key: &str) -> Option<Layer> {
        self.markers.get_layer(world_id, layer_key)
    }

    /// One scan cycle over every enabled world, then saves trackers that
    /// changed. Failures are logged per world and never stop the loop. Marker
    /// layers are flushed separately by `flush_markers`.
    pub fn tick(&self) -> DispatchStats {
        let mut total = DispatchStats::default();
        for entry in self.all_worlds() {
            if !self.config.is_enabled(entry.id()) {
                debug!("{}: disabled in config, not scanning", entry.id());
                continue;
            }
            match self.scan_entry(&entry) {
                Ok(stats) => total.merge(stats),
                Err(e) => warn!("{}: scan failed: {}", entry.id(), e),
            }
        }
        self.save_dirty_trackers();
        total
    }

    pub fn flush_markers(&self, now: Instant) -> FlushStats {
        self.markers.flush_due(&self.tiles_root, now)
    }

    fn save_dirty_trackers(&self) {
        for entry in self.all_worlds() {
            if entry.tracker.is_dirty() {
                if let Err(e) = entry.tracker.save_to_disk() {
                    warn!("{}: could not save region state: {}", entry.id(), e);
                }
            }
        }
    }

    /// Runs scans and marker flushes on their own cadences until `stop` is set,
    /// then shuts down.
    pub fn run(&self, stop: &AtomicBool) {
        let render_every = self.config.render_interval();
        let markers_every = self.config.marker_interval();
        let mut next_render = Instant::now();
        let mut next_markers = Instant::now();

        while !stop.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= next_render {
                self.tick();
                next_render = now + render_every;
            }
            if now >= next_markers {
                self.flush_markers(now);
                next_markers = now + markers_every;
            }
            let wake = next_render.min(next_markers);
            let nap = wake.saturating_duration_since(Instant::now()).min(Duration::from_millis(250));
            thread::sleep(nap);
        }
        self.shutdown();
    }

    /// Lets in-flight renders finish, then persists all state.
    pub fn shutdown(&self) {
        self.renders.wait_idle();
        self.save_dirty_trackers();
        let stats = self.markers.flush_all(&self.tiles_root);
        info!(
            "shutdown: {} regions rendered, {} failed, {} marker layers written",
            self.renders.rendered(),
            self.renders.failed(),
            stats.written
        );
    }
}
