//! Marker styling. Every piece serializes as a fixed-order array so the
//! frontend can read slots by index.

use serde_json::{json, Value};

use super::ToJson;

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Options {
    stroke: Option<Stroke>,
    fill: Option<Fill>,
    popup: Option<Popup>,
    tooltip: Option<Tooltip>,
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    pub fn stroke(&self) -> Option<&Stroke> {
        self.stroke.as_ref()
    }

    pub fn fill(&self) -> Option<&Fill> {
        self.fill.as_ref()
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.stroke.is_none() && self.fill.is_none() && self.popup.is_none() && self.tooltip.is_none()
    }
}

fn slot<T: ToJson>(v: Option<&T>) -> Value {
    v.map(T::to_json).unwrap_or_else(|| json!([]))
}

impl ToJson for Options {
    /// `[stroke, fill, popup, tooltip]`, unset slots as `[]`.
    fn to_json(&self) -> Value {
        json!([
            slot(self.stroke()),
            slot(self.fill()),
            slot(self.popup()),
            slot(self.tooltip()),
        ])
    }
}

#[derive(Clone, Debug, Default)]
pub struct OptionsBuilder {
    inner: Options,
}

impl OptionsBuilder {
    pub fn stroke(mut self, stroke: Stroke) -> Self {
        self.inner.stroke = Some(stroke);
        self
    }

    pub fn fill(mut self, fill: Fill) -> Self {
        self.inner.fill = Some(fill);
        self
    }

    pub fn popup(mut self, popup: Popup) -> Self {
        self.inner.popup = Some(popup);
        self
    }

    pub fn tooltip(mut self, tooltip: Tooltip) -> Self {
        self.inner.tooltip = Some(tooltip);
        self
    }

    pub fn build(self) -> Options {
        self.inner
    }
}

/// Colors are packed ARGB.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Stroke {
    pub enabled: bool,
    pub weight: u32,
    pub color: u32,
}

impl Stroke {
    pub fn new(weight: u32, color: u32) -> Self {
        Self { enabled: true, weight, color }
    }
}

impl Default for Stroke {
    fn default() -> Self {
        Self { enabled: true, weight: 3, color: 0xFF3388FF }
    }
}

impl ToJson for Stroke {
    fn to_json(&self) -> Value {
        json!([self.enabled, self.weight, self.color])
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum FillType {
    #[default]
    Evenodd,
    Nonzero,
}

impl FillType {
    fn index(self) -> u8 {
        match self {
            FillType::Evenodd => 0,
            FillType::Nonzero => 1,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Fill {
    pub enabled: bool,
    pub fill_type: FillType,
    pub color: u32,
}

impl Fill {
    pub fn new(color: u32) -> Self {
        Self { enabled: true, fill_type: FillType::default(), color }
    }
}

impl ToJson for Fill {
    fn to_json(&self) -> Value {
        json!([self.enabled, self.fill_type.index(), self.color])
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Popup {
    pub content: String,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl Popup {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Self::default() }
    }
}

impl ToJson for Popup {
    fn to_json(&self) -> Value {
        json!([
            self.content,
            self.min_width.unwrap_or(0),
            self.max_width.unwrap_or(0),
            self.max_height.unwrap_or(0),
        ])
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Direction {
    #[default]
    Auto,
    Right,
    Left,
    Top,
    Bottom,
    Center,
}

impl Direction {
    fn index(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Tooltip {
    pub content: String,
    pub direction: Direction,
    pub permanent: bool,
    pub sticky: bool,
}

impl Tooltip {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Self::default() }
    }
}

impl ToJson for Tooltip {
    fn to_json(&self) -> Value {
        json!([self.content, self.direction.index(), self.permanent, self.sticky])
    }
}
