use serde_json::{json, Map, Value};
use std::hash::{Hash, Hasher};

use super::options::Options;
use super::ToJson;

/// A position on the map in block coordinates.
#[derive(Copy, Clone, Debug)]
pub struct Point {
    pub x: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

// Bitwise so that Eq and Hash agree.
impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x.to_bits() == other.x.to_bits() && self.z.to_bits() == other.z.to_bits()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.z.to_bits().hash(state);
    }
}

impl ToJson for Point {
    fn to_json(&self) -> Value {
        json!({ "x": self.x, "z": self.z })
    }
}

/// Two radii or a size.
pub type Vector = Point;

fn points_json(points: &[Point]) -> Value {
    Value::Array(points.iter().map(Point::to_json).collect())
}

fn rings_json(rings: &[Vec<Point>]) -> Value {
    Value::Array(rings.iter().map(|r| points_json(r)).collect())
}

#[derive(Clone, Debug)]
pub enum Geometry {
    Icon { point: Point, image: String, size: Option<Vector> },
    Polyline { points: Vec<Point> },
    MultiPolyline { lines: Vec<Vec<Point>> },
    /// Outer ring first, holes after.
    Polygon { rings: Vec<Vec<Point>> },
    MultiPolygon { polygons: Vec<Vec<Vec<Point>>> },
    Rectangle { point1: Point, point2: Point },
    Circle { center: Point, radius: f64 },
    Ellipse { center: Point, radius: Vector, tilt: Option<f64> },
}

impl PartialEq for Geometry {
    fn eq(&self, other: &Self) -> bool {
        use Geometry::*;
        match (self, other) {
            (Icon { point: a, image: ai, size: asz }, Icon { point: b, image: bi, size: bsz }) => {
                a == b && ai == bi && asz == bsz
            }
            (Polyline { points: a }, Polyline { points: b }) => a == b,
            (MultiPolyline { lines: a }, MultiPolyline { lines: b }) => a == b,
            (Polygon { rings: a }, Polygon { rings: b }) => a == b,
            (MultiPolygon { polygons: a }, MultiPolygon { polygons: b }) => a == b,
            (Rectangle { point1: a1, point2: a2 }, Rectangle { point1: b1, point2: b2 }) => a1 == b1 && a2 == b2,
            (Circle { center: a, radius: ar }, Circle { center: b, radius: br }) => {
                a == b && ar.to_bits() == br.to_bits()
            }
            (Ellipse { center: a, radius: ar, tilt: at }, Ellipse { center: b, radius: br, tilt: bt }) => {
                a == b && ar == br && at.map(f64::to_bits) == bt.map(f64::to_bits)
            }
            _ => false,
        }
    }
}

impl Eq for Geometry {}

impl Hash for Geometry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_tag().hash(state);
        match self {
            Geometry::Icon { point, image, size } => {
                point.hash(state);
                image.hash(state);
                size.hash(state);
            }
            Geometry::Polyline { points } => points.hash(state),
            Geometry::MultiPolyline { lines } => lines.hash(state),
            Geometry::Polygon { rings } => rings.hash(state),
            Geometry::MultiPolygon { polygons } => polygons.hash(state),
            Geometry::Rectangle { point1, point2 } => {
                point1.hash(state);
                point2.hash(state);
            }
            Geometry::Circle { center, radius } => {
                center.hash(state);
                radius.to_bits().hash(state);
            }
            Geometry::Ellipse { center, radius, tilt } => {
                center.hash(state);
                radius.hash(state);
                tilt.map(f64::to_bits).hash(state);
            }
        }
    }
}

impl Geometry {
    pub fn type_tag(&self) -> &'static str {
        match self {
            Geometry::Icon { .. } => "icon",
            Geometry::Polyline { .. } => "line",
            Geometry::MultiPolyline { .. } => "multiline",
            Geometry::Polygon { .. } => "poly",
            Geometry::MultiPolygon { .. } => "multipoly",
            Geometry::Rectangle { .. } => "rect",
            Geometry::Circle { .. } => "circ",
            Geometry::Ellipse { .. } => "elli",
        }
    }

    fn write_fields(&self, obj: &mut Map<String, Value>) {
        match self {
            Geometry::Icon { point, image, size } => {
                obj.insert("point".into(), point.to_json());
                obj.insert("image".into(), json!(image));
                if let Some(size) = size {
                    obj.insert("size".into(), size.to_json());
                }
            }
            Geometry::Polyline { points } => {
                obj.insert("points".into(), points_json(points));
            }
            Geometry::MultiPolyline { lines } => {
                obj.insert("lines".into(), rings_json(lines));
            }
            Geometry::Polygon { rings } => {
                obj.insert("rings".into(), rings_json(rings));
            }
            Geometry::MultiPolygon { polygons } => {
                let polys = polygons.iter().map(|p| rings_json(p)).collect();
                obj.insert("polygons".into(), Value::Array(polys));
            }
            Geometry::Rectangle { point1, point2 } => {
                obj.insert("point1".into(), point1.to_json());
                obj.insert("point2".into(), point2.to_json());
            }
            Geometry::Circle { center, radius } => {
                obj.insert("center".into(), center.to_json());
                obj.insert("radius".into(), json!(radius));
            }
            Geometry::Ellipse { center, radius, tilt } => {
                obj.insert("center".into(), center.to_json());
                obj.insert("radius".into(), radius.to_json());
                if let Some(tilt) = tilt {
                    obj.insert("tilt".into(), json!(tilt));
                }
            }
        }
    }
}

/// A keyed shape on a layer. Constructors take every required geometry field,
/// so a `Marker` is always complete.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Marker {
    key: String,
    geometry: Geometry,
    pane: Option<String>,
    options: Options,
}

impl Marker {
    pub fn new(key: impl Into<String>, geometry: Geometry) -> Self {
        Self { key: key.into(), geometry, pane: None, options: Options::default() }
    }

    pub fn icon(key: impl Into<String>, point: Point, image: impl Into<String>) -> Self {
        Self::new(key, Geometry::Icon { point, image: image.into(), size: None })
    }

    pub fn polyline(key: impl Into<String>, points: Vec<Point>) -> Self {
        Self::new(key, Geometry::Polyline { points })
    }

    pub fn multi_polyline(key: impl Into<String>, lines: Vec<Vec<Point>>) -> Self {
        Self::new(key, Geometry::MultiPolyline { lines })
    }

    pub fn polygon(key: impl Into<String>, rings: Vec<Vec<Point>>) -> Self {
        Self::new(key, Geometry::Polygon { rings })
    }

    pub fn multi_polygon(key: impl Into<String>, polygons: Vec<Vec<Vec<Point>>>) -> Self {
        Self::new(key, Geometry::MultiPolygon { polygons })
    }

    pub fn rectangle(key: impl Into<String>, point1: Point, point2: Point) -> Self {
        Self::new(key, Geometry::Rectangle { point1, point2 })
    }

    pub fn circle(key: impl Into<String>, center: Point, radius: f64) -> Self {
        Self::new(key, Geometry::Circle { center, radius })
    }

    pub fn ellipse(key: impl Into<String>, center: Point, radius: Vector) -> Self {
        Self::new(key, Geometry::Ellipse { center, radius, tilt: None })
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn with_pane(mut self, pane: impl Into<String>) -> Self {
        self.pane = Some(pane.into());
        self
    }

    /// Ignored unless the marker is an ellipse.
    pub fn with_tilt(mut self, value: f64) -> Self {
        if let Geometry::Ellipse { tilt, .. } = &mut self.geometry {
            *tilt = Some(value);
        }
        self
    }

    /// Ignored unless the marker is an icon.
    pub fn with_size(mut self, value: Vector) -> Self {
        if let Geometry::Icon { size, .. } = &mut self.geometry {
            *size = Some(value);
        }
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn pane(&self) -> Option<&str> {
        self.pane.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl ToJson for Marker {
    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".into(), json!(self.geometry.type_tag()));
        obj.insert("key".into(), json!(self.key));
        self.geometry.write_fields(&mut obj);
        if let Some(pane) = &self.pane {
            obj.insert("pane".into(), json!(pane));
        }
        obj.insert("options".into(), self.options.to_json());
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::options::{Fill, Popup};
    use std::collections::HashSet;

    #[test]
    fn optionless_marker_has_four_empty_slots_and_no_nulls() {
        let m = Marker::circle("c1", Point::new(1.0, 2.0), 5.0);
        let v = m.to_json();
        assert_eq!(v["type"], "circ");
        assert_eq!(v["key"], "c1");
        assert_eq!(v["center"], json!({ "x": 1.0, "z": 2.0 }));
        assert_eq!(v["options"], json!([[], [], [], []]));
        let obj = v.as_object().unwrap();
        assert!(obj.values().all(|x| !x.is_null()));
        assert!(!obj.contains_key("pane"));
    }

    #[test]
    fn ellipse_tilt_only_when_set() {
        let plain = Marker::ellipse("e", Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert!(plain.to_json().get("tilt").is_none());
        let tilted = plain.clone().with_tilt(0.5);
        assert_eq!(tilted.to_json()["tilt"], json!(0.5));
        assert_ne!(plain, tilted);
    }

    #[test]
    fn equal_markers_hash_equal() {
        let build = || {
            Marker::polygon("p", vec![vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)]])
                .with_options(Options::builder().fill(Fill::new(0x8000FF00)).popup(Popup::new("hi")).build())
        };
        let mut set = HashSet::new();
        set.insert(build());
        set.insert(build());
        assert_eq!(set.len(), 1);
        assert_eq!(build().to_json(), build().to_json());
    }

    #[test]
    fn every_variant_tags_itself() {
        let p = Point::new(0.0, 0.0);
        let tags: Vec<_> = [
            Marker::icon("a", p, "house").with_size(Point::new(16.0, 16.0)),
            Marker::polyline("b", vec![p, p]),
            Marker::multi_polyline("c", vec![vec![p, p]]),
            Marker::polygon("d", vec![vec![p, p, p]]),
            Marker::multi_polygon("e", vec![vec![vec![p, p, p]]]),
            Marker::rectangle("f", p, Point::new(2.0, 2.0)),
            Marker::circle("g", p, 1.0),
            Marker::ellipse("h", p, p),
        ]
        .iter()
        .map(|m| m.to_json()["type"].as_str().unwrap().to_string())
        .collect();
        assert_eq!(tags, ["icon", "line", "multiline", "poly", "multipoly", "rect", "circ", "elli"]);
    }
}
