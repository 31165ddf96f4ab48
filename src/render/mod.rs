use std::sync::Arc;

use crate::tracker::ModificationTracker;

pub mod cache;
pub mod job;
pub mod world;

pub use cache::RenderCache;
pub use job::{DispatchStats, RegionState, RenderJob, RenderKey};
pub use world::{RenderedTile, World};

/// A registered world together with its render state.
pub struct WorldEntry {
    pub world: Arc<dyn World>,
    pub tracker: Arc<ModificationTracker>,
}

impl WorldEntry {
    pub fn new(world: Arc<dyn World>, tracker: Arc<ModificationTracker>) -> Self {
        Self { world, tracker }
    }

    pub fn id(&self) -> &str {
        self.world.id()
    }
}
