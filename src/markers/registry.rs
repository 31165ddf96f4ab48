//! Live marker layers for every world, and their publication to disk.
//!
//! Mutations happen in memory from any thread. `flush_due` serializes layers
//! whose update interval has elapsed and writes them only when the document
//! differs from the last one written.

use log::{debug, warn};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use super::layer::Layer;
use super::marker::Marker;
use super::ToJson;
use crate::codec;
use crate::error::MapError;
use crate::util;

struct LayerSlot {
    layer: Layer,
    last_hash: Option<u64>,
    last_flush: Option<Instant>,
}

#[derive(Default)]
struct WorldLayers {
    layers: HashMap<String, LayerSlot>,
    /// Unregistered layers whose files still need deleting.
    removed: Vec<String>,
    index_dirty: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FlushStats {
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct MarkerRegistry {
    worlds: RwLock<HashMap<String, WorldLayers>>,
}

struct Pending {
    world: String,
    layer: String,
    doc: String,
    hash: u64,
}

fn doc_hash(doc: &str) -> u64 {
    let mut h = DefaultHasher::new();
    doc.hash(&mut h);
    h.finish()
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, WorldLayers>> {
        self.worlds.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, WorldLayers>> {
        self.worlds.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers or replaces a layer, returning the one it replaced.
    pub fn register_layer(&self, world: &str, layer: Layer) -> Option<Layer> {
        let mut worlds = self.write();
        let w = worlds.entry(world.to_string()).or_default();
        let key = layer.key().to_string();
        w.removed.retain(|k| k != &key);
        w.index_dirty = true;
        let slot = LayerSlot { layer, last_hash: None, last_flush: None };
        w.layers.insert(key, slot).map(|s| s.layer)
    }

    pub fn unregister_layer(&self, world: &str, key: &str) -> Option<Layer> {
        let mut worlds = self.write();
        let w = worlds.get_mut(world)?;
        let slot = w.layers.remove(key)?;
        w.removed.push(key.to_string());
        w.index_dirty = true;
        Some(slot.layer)
    }

    /// Drops every layer of a world without touching files on disk.
    pub fn forget_world(&self, world: &str) {
        self.write().remove(world);
    }

    /// Adds or replaces a marker by key. Returns false if the layer is unknown.
    pub fn add_marker(&self, world: &str, layer: &str, marker: Marker) -> bool {
        self.with_layer_mut(world, layer, |l| {
            l.add_marker(marker);
        })
        .is_some()
    }

    pub fn remove_marker(&self, world: &str, layer: &str, key: &str) -> Option<Marker> {
        self.with_layer_mut(world, layer, |l| l.remove_marker(key)).flatten()
    }

    pub fn with_layer_mut<R>(&self, world: &str, layer: &str, f: impl FnOnce(&mut Layer) -> R) -> Option<R> {
        let mut worlds = self.write();
        let slot = worlds.get_mut(world)?.layers.get_mut(layer)?;
        Some(f(&mut slot.layer))
    }

    /// Markers of one layer in key order; empty if the layer is unknown.
    pub fn get_markers(&self, world: &str, layer: &str) -> Vec<Marker> {
        let worlds = self.read();
        worlds
            .get(world)
            .and_then(|w| w.layers.get(layer))
            .map(|s| s.layer.markers().into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_layer(&self, world: &str, layer: &str) -> Option<Layer> {
        let worlds = self.read();
        worlds.get(world)?.layers.get(layer).map(|s| s.layer.clone())
    }

    pub fn layer_keys(&self, world: &str) -> Vec<String> {
        let worlds = self.read();
        let mut keys: Vec<_> = worlds
            .get(world)
            .map(|w| w.layers.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    pub fn to_json(&self, world: &str, layer: &str) -> Option<Value> {
        let worlds = self.read();
        worlds.get(world)?.layers.get(layer).map(|s| s.layer.to_json())
    }

    /// Writes every layer whose update interval has elapsed at `now`.
    pub fn flush_due(&self, tiles_root: &Path, now: Instant) -> FlushStats {
        self.flush(tiles_root, Some(now))
    }

    /// Writes every changed layer regardless of interval.
    pub fn flush_all(&self, tiles_root: &Path) -> FlushStats {
        self.flush(tiles_root, None)
    }

    fn flush(&self, tiles_root: &Path, now: Option<Instant>) -> FlushStats {
        let mut stats = FlushStats::default();
        let mut pending = Vec::new();
        let mut indexes = Vec::new();
        let mut removals = Vec::new();

        {
            let mut worlds = self.write();
            for (world, w) in worlds.iter_mut() {
                for (key, slot) in w.layers.iter_mut() {
                    let due = match (now, slot.last_flush) {
                        (Some(now), Some(last)) => now.saturating_duration_since(last) >= slot.layer.update_interval(),
                        _ => true,
                    };
                    if !due {
                        continue;
                    }
                    slot.last_flush = Some(now.unwrap_or_else(Instant::now));
                    let doc = slot.layer.to_json().to_string();
                    let hash = doc_hash(&doc);
                    if slot.last_hash == Some(hash) {
                        stats.unchanged += 1;
                        continue;
                    }
                    pending.push(Pending { world: world.clone(), layer: key.clone(), doc, hash });
                }
                for key in w.removed.drain(..) {
                    removals.push(util::marker_path(tiles_root, world, &key));
                }
                if w.index_dirty {
                    w.index_dirty = false;
                    let mut layers: Vec<_> = w.layers.values().map(|s| &s.layer).collect();
                    layers.sort_unstable_by(|a, b| a.key().cmp(b.key()));
                    let doc = Value::Array(layers.iter().map(|l| l.settings_json()).collect());
                    indexes.push((world.clone(), doc.to_string()));
                }
            }
        }

        for path in removals {
            match fs::remove_file(&path) {
                Ok(()) => debug!("removed marker file {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("{}", MapError::io(&path, e)),
            }
        }

        for (world, doc) in indexes {
            let path = util::layers_index_path(tiles_root, &world);
            if let Err(e) = codec::write_gzip_str(&path, &doc) {
                warn!("failed to write layer index for {}: {}", world, e);
                stats.failed += 1;
                if let Some(w) = self.write().get_mut(&world) {
                    w.index_dirty = true;
                }
            }
        }

        let mut written = Vec::new();
        for p in pending {
            let path = util::marker_path(tiles_root, &p.world, &p.layer);
            match codec::write_gzip_str(&path, &p.doc) {
                Ok(()) => {
                    stats.written += 1;
                    written.push(p);
                }
                Err(e) => {
                    warn!("failed to write markers for {} layer {}: {}", p.world, p.layer, e);
                    stats.failed += 1;
                }
            }
        }

        if !written.is_empty() {
            let mut worlds = self.write();
            for p in written {
                if let Some(slot) = worlds.get_mut(&p.world).and_then(|w| w.layers.get_mut(&p.layer)) {
                    slot.last_hash = Some(p.hash);
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::marker::Point;
    use std::time::Duration;
    use tempfile::tempdir;

    const W: &str = "minecraft:overworld";

    fn layer(interval: u64) -> Layer {
        Layer::new("spawn", "Spawn").with_update_interval(Duration::from_secs(interval))
    }

    #[test]
    fn duplicate_key_replaces_in_registry() {
        let reg = MarkerRegistry::new();
        reg.register_layer(W, layer(5));
        assert!(reg.add_marker(W, "spawn", Marker::circle("home", Point::new(0.0, 0.0), 1.0)));
        assert!(reg.add_marker(W, "spawn", Marker::circle("home", Point::new(9.0, 9.0), 3.0)));
        let markers = reg.get_markers(W, "spawn");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0], Marker::circle("home", Point::new(9.0, 9.0), 3.0));
        assert!(!reg.add_marker(W, "missing", Marker::circle("x", Point::new(0.0, 0.0), 1.0)));
    }

    #[test]
    fn flush_writes_once_until_changed() {
        let dir = tempdir().unwrap();
        let reg = MarkerRegistry::new();
        reg.register_layer(W, layer(0));
        reg.add_marker(W, "spawn", Marker::circle("a", Point::new(0.0, 0.0), 1.0));

        let first = reg.flush_all(dir.path());
        assert_eq!(first.written, 1);
        let path = util::marker_path(dir.path(), W, "spawn");
        let doc: Value = serde_json::from_str(&codec::read_gzip_str(&path).unwrap()).unwrap();
        assert_eq!(doc, reg.to_json(W, "spawn").unwrap());
        assert!(util::layers_index_path(dir.path(), W).is_file());

        let second = reg.flush_all(dir.path());
        assert_eq!(second, FlushStats { written: 0, unchanged: 1, failed: 0 });

        reg.add_marker(W, "spawn", Marker::circle("b", Point::new(1.0, 1.0), 1.0));
        assert_eq!(reg.flush_all(dir.path()).written, 1);
    }

    #[test]
    fn interval_gates_flush() {
        let dir = tempdir().unwrap();
        let reg = MarkerRegistry::new();
        reg.register_layer(W, layer(60));
        let t0 = Instant::now();
        assert_eq!(reg.flush_due(dir.path(), t0).written, 1);

        reg.add_marker(W, "spawn", Marker::circle("a", Point::new(0.0, 0.0), 1.0));
        let soon = reg.flush_due(dir.path(), t0 + Duration::from_secs(1));
        assert_eq!(soon, FlushStats::default());
        assert_eq!(reg.flush_due(dir.path(), t0 + Duration::from_secs(61)).written, 1);
    }

    #[test]
    fn unregister_removes_marker_file() {
        let dir = tempdir().unwrap();
        let reg = MarkerRegistry::new();
        reg.register_layer(W, layer(0));
        reg.flush_all(dir.path());
        let path = util::marker_path(dir.path(), W, "spawn");
        assert!(path.is_file());

        assert!(reg.unregister_layer(W, "spawn").is_some());
        reg.flush_all(dir.path());
        assert!(!path.exists());
        assert!(reg.layer_keys(W).is_empty());
    }
}
