use anyhow::{anyhow, Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::scanner::RegionScanner;
use crate::tracker::ModificationTracker;
use crate::util;

/// Lists the regions of a world that the next cycle would render.
pub fn cmd_scan(cfg: &Config, world: &str, region_dir: Option<&Path>) -> Result<()> {
    let region_dir = match region_dir {
        Some(dir) => dir,
        None => cfg
            .world(world)
            .map(|w| w.region_dir.as_path())
            .ok_or_else(|| anyhow!("no --region-dir given and {} is not in the config worlds", world))?,
    };
    let state = util::state_path(&cfg.state_dir, world);
    let tracker = ModificationTracker::new(&state);
    tracker
        .load_from_disk()
        .with_context(|| format!("load region state {}", state.display()))?;

    let report = RegionScanner::new(&tracker)
        .with_extension(&cfg.region_extension)
        .scan(region_dir)
        .with_context(|| format!("scan {}", region_dir.display()))?;

    let mut dirty: Vec<_> = report.dirty.values().collect();
    dirty.sort_unstable_by_key(|r| r.coord);
    for r in &dirty {
        println!(
            "{}\t{}\t{} bytes\tmodified {} (tracked {})",
            r.coord,
            r.path.display(),
            r.len,
            r.modified,
            tracker.get(r.coord)
        );
    }
    println!(
        "{}: {} dirty, {} unchanged, {} empty, {} malformed",
        world,
        dirty.len(),
        report.unchanged,
        report.empty,
        report.malformed
    );
    Ok(())
}
