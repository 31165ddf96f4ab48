mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use region_tiles::codec;
use region_tiles::render::{RegionState, RenderCache, WorldEntry};
use region_tiles::util;
use region_tiles::{ModificationTracker, RegionCoord, RegionScanner};
use tempfile::tempdir;

use common::{write_region, FakeWorld};

const WORLD: &str = "minecraft:overworld";

fn setup(world: FakeWorld, state: &std::path::Path) -> (Arc<FakeWorld>, Arc<WorldEntry>) {
    let world = Arc::new(world);
    let tracker = Arc::new(ModificationTracker::new(state.join("region_modified.db")));
    let entry = Arc::new(WorldEntry::new(world.clone(), tracker));
    (world, entry)
}

#[test]
fn dirty_region_renders_then_goes_clean() {
    let dir = tempdir().unwrap();
    let regions = dir.path().join("region");
    write_region(&regions, 3, -2, 150);
    let (world, entry) = setup(FakeWorld::new(WORLD, &regions), dir.path());
    entry.tracker.set(RegionCoord::new(3, -2), 100);

    let report = RegionScanner::new(&entry.tracker).scan(&regions).unwrap();
    assert_eq!(report.coords(), HashSet::from([RegionCoord::new(3, -2)]));

    let tiles = dir.path().join("web").join("tiles");
    let cache = RenderCache::new(&tiles, Some(2)).unwrap();
    let stats = cache.submit(&entry, report.dirty.into_values());
    assert_eq!(stats.queued, 1);
    cache.wait_idle();

    assert_eq!(world.calls(RegionCoord::new(3, -2)), 1);
    assert!(entry.tracker.get(RegionCoord::new(3, -2)) >= 150);
    assert_eq!(cache.rendered(), 1);
    for zoom in [0, 1] {
        let path = util::tile_path(&tiles, WORLD, zoom, RegionCoord::new(3, -2));
        assert_eq!(codec::read_gzip(&path).unwrap(), FakeWorld::tile_bytes(RegionCoord::new(3, -2)));
    }

    let again = RegionScanner::new(&entry.tracker).scan(&regions).unwrap();
    assert!(again.coords().is_empty());
}

#[test]
fn concurrent_scans_render_each_region_at_most_once() {
    let dir = tempdir().unwrap();
    let regions = dir.path().join("region");
    let coords: Vec<_> = (0..6).map(|i| RegionCoord::new(i, -i)).collect();
    for c in &coords {
        write_region(&regions, c.x, c.z, 1_000);
    }
    let (world, entry) = setup(FakeWorld::new(WORLD, &regions), dir.path());
    world.close_gate();

    let cache = Arc::new(RenderCache::new(dir.path().join("tiles"), Some(3)).unwrap());
    let scanners: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let entry = Arc::clone(&entry);
            let regions = regions.clone();
            thread::spawn(move || {
                let report = RegionScanner::new(&entry.tracker).scan(&regions).unwrap();
                cache.submit(&entry, report.dirty.into_values())
            })
        })
        .collect();
    let results: Vec<_> = scanners.into_iter().map(|h| h.join().unwrap()).collect();

    let queued: usize = results.iter().map(|s| s.queued).sum();
    let coalesced: usize = results.iter().map(|s| s.coalesced).sum();
    assert_eq!(queued, coords.len());
    assert_eq!(coalesced, coords.len() * 7);
    for c in &coords {
        assert!(world.calls(*c) <= 1);
        assert!(cache.state(WORLD, *c).is_some());
    }

    world.open_gate();
    cache.wait_idle();
    for c in &coords {
        assert_eq!(world.calls(*c), 1);
        assert_eq!(cache.state(WORLD, *c), None);
        assert_eq!(entry.tracker.get(*c), 1_000);
    }
    assert_eq!(world.max_active_same_region.load(Ordering::SeqCst), 1);

    // Nothing changed on disk, so another scan finds no work.
    let report = RegionScanner::new(&entry.tracker).scan(&regions).unwrap();
    assert!(report.is_empty());
}

#[test]
fn in_flight_region_reports_its_state() {
    let dir = tempdir().unwrap();
    let regions = dir.path().join("region");
    write_region(&regions, 0, 0, 500);
    let (world, entry) = setup(FakeWorld::new(WORLD, &regions), dir.path());
    world.close_gate();

    let cache = RenderCache::new(dir.path().join("tiles"), Some(1)).unwrap();
    let report = RegionScanner::new(&entry.tracker).scan(&regions).unwrap();
    cache.submit(&entry, report.dirty.into_values());

    let state = cache.state(WORLD, RegionCoord::new(0, 0));
    assert!(matches!(state, Some(RegionState::Queued) | Some(RegionState::Rendering)));
    assert_eq!(cache.in_flight(), 1);
    // Not committed while the render is still running.
    assert_eq!(entry.tracker.get(RegionCoord::new(0, 0)), 0);

    world.open_gate();
    cache.wait_idle();
    assert_eq!(cache.in_flight(), 0);
    assert_eq!(entry.tracker.get(RegionCoord::new(0, 0)), 500);
}

#[test]
fn failed_render_stays_dirty_without_blocking_siblings() {
    let dir = tempdir().unwrap();
    let regions = dir.path().join("region");
    write_region(&regions, 0, 0, 700);
    write_region(&regions, 1, 0, 700);
    let bad = RegionCoord::new(0, 0);
    let good = RegionCoord::new(1, 0);
    let (_world, entry) = setup(FakeWorld::new(WORLD, &regions).failing(bad), dir.path());

    let tiles = dir.path().join("tiles");
    let cache = RenderCache::new(&tiles, Some(2)).unwrap();
    let report = RegionScanner::new(&entry.tracker).scan(&regions).unwrap();
    cache.submit(&entry, report.dirty.into_values());
    cache.wait_idle();

    assert_eq!(entry.tracker.get(bad), 0);
    assert_eq!(entry.tracker.get(good), 700);
    assert_eq!(cache.failed(), 1);
    assert_eq!(cache.rendered(), 1);
    assert!(!util::tile_path(&tiles, WORLD, 0, bad).exists());

    let retry = RegionScanner::new(&entry.tracker).scan(&regions).unwrap();
    assert_eq!(retry.coords(), HashSet::from([bad]));
}

#[test]
fn persist_failure_leaves_region_dirty() {
    let dir = tempdir().unwrap();
    let regions = dir.path().join("region");
    write_region(&regions, 2, 2, 900);
    let (_world, entry) = setup(FakeWorld::new(WORLD, &regions), dir.path());

    // A plain file where the tiles directory should be makes every write fail.
    let tiles = dir.path().join("tiles");
    std::fs::write(&tiles, b"not a directory").unwrap();
    let cache = RenderCache::new(&tiles, Some(1)).unwrap();
    let report = RegionScanner::new(&entry.tracker).scan(&regions).unwrap();
    cache.submit(&entry, report.dirty.into_values());
    cache.wait_idle();

    assert_eq!(cache.failed(), 1);
    assert_eq!(entry.tracker.get(RegionCoord::new(2, 2)), 0);
}

#[test]
fn report_older_than_last_commit_is_not_rendered_again() {
    let dir = tempdir().unwrap();
    let regions = dir.path().join("region");
    write_region(&regions, 4, 4, 1_000);
    let (world, entry) = setup(FakeWorld::new(WORLD, &regions), dir.path());

    // Two overlapping cycles both see the region as dirty.
    let first = RegionScanner::new(&entry.tracker).scan(&regions).unwrap();
    let second = RegionScanner::new(&entry.tracker).scan(&regions).unwrap();

    let cache = RenderCache::new(dir.path().join("tiles"), Some(2)).unwrap();
    assert_eq!(cache.submit(&entry, first.dirty.into_values()).queued, 1);
    cache.wait_idle();
    assert_eq!(entry.tracker.get(RegionCoord::new(4, 4)), 1_000);

    let stats = cache.submit(&entry, second.dirty.into_values());
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.unchanged, 1);
    cache.wait_idle();
    assert_eq!(world.calls(RegionCoord::new(4, 4)), 1);
}
