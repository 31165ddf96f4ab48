use std::path::Path;

use crate::region::RegionCoord;

/// One rendered image for a region at a zoom level.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RenderedTile {
    pub zoom: u8,
    pub bytes: Vec<u8>,
}

impl RenderedTile {
    pub fn new(zoom: u8, bytes: Vec<u8>) -> Self {
        Self { zoom, bytes }
    }
}

/// The game world a map is drawn from. Both methods may be called
/// concurrently for distinct coordinates.
pub trait World: Send + Sync {
    /// Stable identifier, e.g. `minecraft:overworld`.
    fn id(&self) -> &str;

    /// Directory holding `r.<x>.<z>.<ext>` region files.
    fn region_dir(&self) -> &Path;

    /// Rasterizes a region from its current on-disk bytes.
    fn render_region(&self, coord: RegionCoord) -> Result<Vec<RenderedTile>, String>;
}
