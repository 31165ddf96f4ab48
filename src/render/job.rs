use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use crate::region::RegionCoord;

/// Single-flight key: one world, one region.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RenderKey {
    pub world: String,
    pub coord: RegionCoord,
}

impl RenderKey {
    pub fn new(world: impl Into<String>, coord: RegionCoord) -> Self {
        Self { world: world.into(), coord }
    }
}

impl fmt::Display for RenderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.world, self.coord)
    }
}

/// Lifecycle of a region that has a job in flight. Absence from the table is idle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegionState {
    Queued,
    Rendering,
    Persisting,
}

#[derive(Clone, Debug)]
pub struct RenderJob {
    pub key: RenderKey,
    pub submitted: Instant,
    pub source: PathBuf,
    /// Region file mtime seen by the scan that queued this job.
    pub source_modified: i64,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DispatchStats {
    pub queued: usize,
    /// Regions skipped because a job for them was already in flight.
    pub coalesced: usize,
    /// Regions skipped because a render committed since they were scanned.
    pub unchanged: usize,
}

impl DispatchStats {
    pub fn merge(&mut self, other: DispatchStats) {
        self.queued += other.queued;
        self.coalesced += other.coalesced;
        self.unchanged += other.unchanged;
    }
}
