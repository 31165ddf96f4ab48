use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use crate::error::{MapError, Result};

/// A 32x32-chunk region of a world.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RegionCoord {
    pub x: i32,
    pub z: i32,
}

impl RegionCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Packs both components into one 64-bit key: x in the high half, z in the low half.
    pub fn key(self) -> i64 {
        ((self.x as i64) << 32) | (self.z as u32 as i64)
    }

    pub fn from_key(key: i64) -> Self {
        Self { x: (key >> 32) as i32, z: key as i32 }
    }
}

impl fmt::Display for RegionCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// A region file as observed by one scan.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegionFile {
    pub path: PathBuf,
    pub coord: RegionCoord,
    /// Last-modified time in milliseconds since the epoch.
    pub modified: i64,
    pub len: u64,
}

pub fn modified_millis(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Parses `r.<x>.<z>.<ext>`.
///
/// `Ok(None)` means the name is not a region file at all (different prefix or
/// extension); `Err` means it looks like one but the coordinates do not parse.
pub fn parse_region_file_name(name: &str, extension: &str) -> Result<Option<RegionCoord>> {
    let Some(rest) = name.strip_prefix("r.") else { return Ok(None) };
    let Some(rest) = rest.strip_suffix(extension).and_then(|r| r.strip_suffix('.')) else {
        return Ok(None);
    };
    let mut parts = rest.split('.');
    let (Some(x), Some(z), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(MapError::MalformedRegionName(name.to_string()));
    };
    match (x.parse::<i32>(), z.parse::<i32>()) {
        (Ok(x), Ok(z)) => Ok(Some(RegionCoord::new(x, z))),
        _ => Err(MapError::MalformedRegionName(name.to_string())),
    }
}
