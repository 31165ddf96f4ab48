use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use super::marker::Marker;
use super::ToJson;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(5);

/// A named, toggleable set of markers belonging to one world.
#[derive(Clone, Debug)]
pub struct Layer {
    key: String,
    label: String,
    update_interval: Duration,
    show_controls: bool,
    default_hidden: bool,
    priority: i32,
    z_index: i32,
    markers: HashMap<String, Marker>,
}

impl Layer {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            show_controls: true,
            default_hidden: false,
            priority: 0,
            z_index: 0,
            markers: HashMap::new(),
        }
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn with_show_controls(mut self, show: bool) -> Self {
        self.show_controls = show;
        self
    }

    pub fn with_default_hidden(mut self, hidden: bool) -> Self {
        self.default_hidden = hidden;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Adds or replaces by key, returning the replaced marker.
    pub fn add_marker(&mut self, marker: Marker) -> Option<Marker> {
        self.markers.insert(marker.key().to_string(), marker)
    }

    pub fn remove_marker(&mut self, key: &str) -> Option<Marker> {
        self.markers.remove(key)
    }

    pub fn clear_markers(&mut self) {
        self.markers.clear();
    }

    pub fn marker(&self, key: &str) -> Option<&Marker> {
        self.markers.get(key)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Markers sorted by key.
    pub fn markers(&self) -> Vec<&Marker> {
        let mut out: Vec<_> = self.markers.values().collect();
        out.sort_unstable_by(|a, b| a.key().cmp(b.key()));
        out
    }

    /// Entry for the per-world layer index.
    pub fn settings_json(&self) -> Value {
        json!({
            "key": self.key,
            "label": self.label,
            "updateInterval": self.update_interval.as_secs(),
            "showControls": self.show_controls,
            "defaultHidden": self.default_hidden,
            "priority": self.priority,
            "zIndex": self.z_index,
        })
    }
}

impl ToJson for Layer {
    /// The marker document: an array of marker objects in key order.
    fn to_json(&self) -> Value {
        Value::Array(self.markers().into_iter().map(Marker::to_json).collect())
    }
}
