use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::region::RegionCoord;

pub type Result<T> = std::result::Result<T, MapError>;

#[derive(Debug, Error)]
pub enum MapError {
    /// On-disk state or configuration that cannot be interpreted.
    #[error("malformed state in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("i/o failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed region file name: {0}")]
    MalformedRegionName(String),

    #[error("render failed for {world} region {coord}: {reason}")]
    RenderFailure {
        world: String,
        coord: RegionCoord,
        reason: String,
    },

    #[error("state store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("cannot start render workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl MapError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        MapError::Io { path: path.as_ref().to_path_buf(), source }
    }

    pub fn config(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        MapError::Config { path: path.as_ref().to_path_buf(), reason: reason.into() }
    }
}

/// Attach a path to a bare `io::Error`.
pub trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|e| MapError::io(path, e))
    }
}
