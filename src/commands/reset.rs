use anyhow::{Context, Result};

use crate::config::Config;
use crate::tracker::ModificationTracker;
use crate::util;

/// Clears a world's render state so the next cycle re-renders every region.
/// Works on a corrupted state file too.
pub fn cmd_reset(cfg: &Config, world: &str) -> Result<()> {
    let state = util::state_path(&cfg.state_dir, world);
    let tracker = ModificationTracker::new(&state);
    tracker.clear();
    tracker
        .save_to_disk()
        .with_context(|| format!("write region state {}", state.display()))?;
    println!("{}: region state cleared ({})", world, state.display());
    Ok(())
}
