use serde_json::Value;

pub mod layer;
pub mod marker;
pub mod options;
pub mod registry;

pub use layer::Layer;
pub use marker::{Geometry, Marker, Point, Vector};
pub use options::{Direction, Fill, FillType, Options, Popup, Stroke, Tooltip};
pub use registry::{FlushStats, MarkerRegistry};

/// Conversion to the JSON the web frontend reads.
pub trait ToJson {
    fn to_json(&self) -> Value;
}
