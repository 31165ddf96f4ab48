pub mod codec;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod markers;
pub mod region;
pub mod render;
pub mod scanner;
pub mod service;
pub mod tracker;
pub mod util;

pub use error::{MapError, Result};
pub use region::{RegionCoord, RegionFile};
pub use render::{RenderCache, RenderedTile, World, WorldEntry};
pub use scanner::{RegionScanner, ScanReport};
pub use service::MapService;
pub use tracker::ModificationTracker;
