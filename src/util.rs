use std::path::{Path, PathBuf};

use crate::region::RegionCoord;
use crate::tracker::STATE_FILE;

pub const TILES_DIR: &str = "tiles";
pub const MARKERS_DIR: &str = "markers";
pub const LAYERS_INDEX: &str = "layers.json.gz";

/// World ids like `minecraft:overworld` become `minecraft-overworld`.
///
/// Distinct ids always get distinct names: `:` is the only character written
/// as `-`, anything else outside `[A-Za-z0-9_.]` is written as `%XX`, and a
/// name made only of dots (`.`, `..`) has its dots escaped so it can never
/// leave the parent directory.
pub fn world_dir_name(world: &str) -> String {
    if world.is_empty() {
        return "%".to_string();
    }
    let dots_only = world.bytes().all(|b| b == b'.');
    let mut out = String::with_capacity(world.len());
    for b in world.bytes() {
        match b {
            b':' => out.push('-'),
            b'.' if !dots_only => out.push('.'),
            b if b.is_ascii_alphanumeric() || b == b'_' => out.push(b as char),
            b => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

pub fn tiles_root(web_dir: &Path) -> PathBuf {
    web_dir.join(TILES_DIR)
}

/// `<tiles>/<world>/<zoom>/<rx>_<rz>.png.gz`
pub fn tile_path(tiles_root: &Path, world: &str, zoom: u8, coord: RegionCoord) -> PathBuf {
    tiles_root
        .join(world_dir_name(world))
        .join(zoom.to_string())
        .join(format!("{}_{}.png.gz", coord.x, coord.z))
}

/// `<tiles>/<world>/markers/<layer>.json.gz`
pub fn marker_path(tiles_root: &Path, world: &str, layer: &str) -> PathBuf {
    tiles_root
        .join(world_dir_name(world))
        .join(MARKERS_DIR)
        .join(format!("{}.json.gz", world_dir_name(layer)))
}

pub fn layers_index_path(tiles_root: &Path, world: &str) -> PathBuf {
    tiles_root.join(world_dir_name(world)).join(LAYERS_INDEX)
}

pub fn state_path(state_dir: &Path, world: &str) -> PathBuf {
    state_dir.join(world_dir_name(world)).join(STATE_FILE)
}
