use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use crate::error::{MapError, Result};
use crate::region::{modified_millis, parse_region_file_name, RegionCoord, RegionFile};
use crate::tracker::ModificationTracker;

pub const DEFAULT_EXTENSION: &str = "mca";

#[derive(Clone, Debug, Default)]
pub struct ScanReport {
    pub dirty: HashMap<RegionCoord, RegionFile>,
    pub empty: usize,
    pub unchanged: usize,
    pub malformed: usize,
}

impl ScanReport {
    pub fn coords(&self) -> HashSet<RegionCoord> {
        self.dirty.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }
}

/// Finds region files modified since their last successful render.
pub struct RegionScanner<'a> {
    tracker: &'a ModificationTracker,
    extension: &'a str,
}

impl<'a> RegionScanner<'a> {
    pub fn new(tracker: &'a ModificationTracker) -> Self {
        Self { tracker, extension: DEFAULT_EXTENSION }
    }

    pub fn with_extension(mut self, extension: &'a str) -> Self {
        self.extension = extension;
        self
    }

    pub fn scan(&self, region_dir: &Path) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        let entries = match fs::read_dir(region_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("region dir {} does not exist yet", region_dir.display());
                return Ok(report);
            }
            Err(e) => return Err(MapError::io(region_dir, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| MapError::io(region_dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let coord = match parse_region_file_name(name, self.extension) {
                Ok(Some(c)) => c,
                Ok(None) => continue,
                Err(e) => {
                    warn!("skipping {} in {}: {}", name, region_dir.display(), e);
                    report.malformed += 1;
                    continue;
                }
            };

            // The file can vanish between listing and stat; the next cycle sorts it out.
            let meta = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    debug!("cannot stat {}: {}", name, e);
                    continue;
                }
            };
            if meta.len() == 0 {
                debug!("skipping zero length region {}", name);
                report.empty += 1;
                continue;
            }

            let modified = modified_millis(&meta);
            if modified > self.tracker.get(coord) {
                debug!("adding region {}", name);
                report.dirty.insert(
                    coord,
                    RegionFile { path: entry.path(), coord, modified, len: meta.len() },
                );
            } else {
                debug!("skipping unmodified region {}", name);
                report.unchanged += 1;
            }
        }
        Ok(report)
    }
}
