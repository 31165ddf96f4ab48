use anyhow::{Context, Result};

use crate::config::Config;
use crate::tracker::ModificationTracker;
use crate::util;

pub fn cmd_status(cfg: &Config, world: &str, verbose: bool) -> Result<()> {
    let state = util::state_path(&cfg.state_dir, world);
    let tracker = ModificationTracker::new(&state);
    let n = tracker
        .load_from_disk()
        .with_context(|| format!("load region state {}", state.display()))?;

    println!("Using state file: {}", state.display());
    println!("{}: {} regions tracked", world, n);
    if verbose {
        for (coord, modified) in tracker.entries() {
            println!("{}\t{}", coord, modified);
        }
    }
    Ok(())
}
