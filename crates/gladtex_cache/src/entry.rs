//! Cache entry types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Positioning information of a rendered formula.
///
/// The renderer decides what goes in here; usually `height`, `width` and
/// `depth`. The cache only requires the record to be non-empty and passes all
/// fields through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(Map<String, Value>);

impl Position {
    /// Creates a position record from image geometry.
    pub fn new(height: f64, width: f64, depth: f64) -> Self {
        let mut fields = Map::new();
        fields.insert("height".to_string(), Value::from(height));
        fields.insert("width".to_string(), Value::from(width));
        fields.insert("depth".to_string(), Value::from(depth));
        Self(fields)
    }

    /// Creates a position record from arbitrary renderer fields.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Height of the image in pixels.
    pub fn height(&self) -> Option<f64> {
        self.number("height")
    }

    /// Width of the image in pixels.
    pub fn width(&self) -> Option<f64> {
        self.number("width")
    }

    /// Distance of the baseline from the image's bottom edge.
    pub fn depth(&self) -> Option<f64> {
        self.number("depth")
    }

    /// Returns a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns true if the record carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn number(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }
}

/// Metadata of one rendered formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Geometry needed to lay out the image.
    #[serde(rename = "pos")]
    pub position: Position,

    /// Relative, forward-slash separated path of the image file.
    #[serde(rename = "path")]
    pub image_path: String,

    /// Whether the formula was rendered as display math.
    #[serde(rename = "displaymath")]
    pub display_math: bool,
}

impl CacheEntry {
    /// Creates a new cache entry.
    pub fn new(position: Position, image_path: impl Into<String>, display_math: bool) -> Self {
        Self {
            position,
            image_path: image_path.into(),
            display_math,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_position_accessors() {
        let pos = Position::new(12.5, 30.0, 3.0);

        assert_eq!(pos.height(), Some(12.5));
        assert_eq!(pos.width(), Some(30.0));
        assert_eq!(pos.depth(), Some(3.0));
        assert!(!pos.is_empty());
    }

    #[test]
    fn test_position_default_is_empty() {
        let pos = Position::default();
        assert!(pos.is_empty());
        assert_eq!(pos.height(), None);
    }

    #[test]
    fn test_position_keeps_extra_fields() {
        let fields = json!({"height": 10, "width": 4, "depth": 1, "dpi": 115})
            .as_object()
            .cloned()
            .unwrap();
        let pos = Position::from_fields(fields);

        assert_eq!(pos.get("dpi"), Some(&json!(115)));
        assert_eq!(pos.height(), Some(10.0));
        assert_eq!(serde_json::to_value(&pos).unwrap()["dpi"], 115);
    }

    #[test]
    fn test_cache_entry_wire_names() {
        let entry = CacheEntry::new(Position::new(1.0, 2.0, 0.0), "img/eqn001.png", true);
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(
            value,
            json!({
                "pos": {"height": 1.0, "width": 2.0, "depth": 0.0},
                "path": "img/eqn001.png",
                "displaymath": true,
            })
        );
    }

    #[test]
    fn test_cache_entry_from_json() {
        let entry: CacheEntry = serde_json::from_value(json!({
            "pos": {"height": 7, "width": 9, "depth": 2},
            "path": "eqn002.svg",
            "displaymath": false,
        }))
        .unwrap();

        assert_eq!(entry.image_path, "eqn002.svg");
        assert!(!entry.display_math);
        assert_eq!(entry.position.width(), Some(9.0));
    }

    #[test]
    fn test_cache_entry_missing_field_is_rejected() {
        let result = serde_json::from_value::<CacheEntry>(json!({
            "pos": {"height": 7},
            "path": "eqn002.svg",
        }));
        assert!(result.is_err());
    }
}
