//! Coordinate table for in-canvas UI controls.
//!
//! The Godot export renders the main menu inside a canvas, so those
//! controls have no DOM identifiers. Clicks on them are computed as
//! canvas bounding-box origin plus a per-control pixel offset. The
//! offsets live in one versioned table loaded from configuration
//! instead of being copy-pasted per test; DOM-overlay controls should
//! use selectors and never appear here.

use crate::result::{EnsayoError, EnsayoResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pixel offset relative to the canvas top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UiPoint {
    /// X offset in pixels
    pub x: f64,
    /// Y offset in pixels
    pub y: f64,
}

impl UiPoint {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box of a rendering surface, as reported by the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge in page pixels
    pub x: f64,
    /// Top edge in page pixels
    pub y: f64,
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Translate a canvas-relative point to absolute page coordinates.
    #[must_use]
    pub fn to_absolute(&self, point: UiPoint) -> (f64, f64) {
        (self.x + point.x, self.y + point.y)
    }
}

/// Versioned map from logical control name to canvas-relative offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTable {
    /// Table schema/layout version; bump when the in-canvas layout moves.
    pub version: u32,
    /// Control name to offset
    pub elements: BTreeMap<String, UiPoint>,
}

impl CoordinateTable {
    /// Empty table.
    #[must_use]
    pub fn new(version: u32) -> Self {
        Self {
            version,
            elements: BTreeMap::new(),
        }
    }

    /// The main-menu layout of the current export (1280x720 viewport).
    #[must_use]
    pub fn skylock_menu() -> Self {
        let mut table = Self::new(1);
        let entries = [
            ("start_game_button", 645.0, 288.0),
            ("options_button", 629.0, 357.0),
            ("quit_button", 637.0, 430.0),
            ("difficulty_slider_0.5", 629.0, 324.0),
            ("difficulty_slider_1.3", 686.0, 324.0),
            ("difficulty_slider_2.0", 733.0, 324.0),
            ("back_button", 655.0, 450.0),
            ("confirm_dialog_cancel_button", 659.0, 429.0),
            ("confirm_dialog_ok_button", 550.0, 429.0),
            ("confirm_dialog_x_button", 659.0, 428.0),
            ("log_level_combo", 712.0, 389.0),
            ("main_menu_button", 652.0, 286.0),
            ("resume_button", 639.0, 429.0),
        ];
        for (name, x, y) in entries {
            table.insert(name, UiPoint::new(x, y));
        }
        table
    }

    /// Parse a table from YAML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::CoordinateTable`] on malformed input.
    pub fn from_yaml(yaml: &str) -> EnsayoResult<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| EnsayoError::CoordinateTable {
            message: e.to_string(),
        })
    }

    /// Serialize the table to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::CoordinateTable`] on serialization failure.
    pub fn to_yaml(&self) -> EnsayoResult<String> {
        serde_yaml_ng::to_string(self).map_err(|e| EnsayoError::CoordinateTable {
            message: e.to_string(),
        })
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, name: impl Into<String>, point: UiPoint) {
        self.elements.insert(name.into(), point);
    }

    /// Look up a control's offset.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::ElementNotFound`] for unknown names.
    pub fn get(&self, name: &str) -> EnsayoResult<UiPoint> {
        self.elements
            .get(name)
            .copied()
            .ok_or_else(|| EnsayoError::ElementNotFound {
                name: name.to_string(),
            })
    }

    /// Absolute page coordinates for a control, given the canvas box.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::ElementNotFound`] for unknown names.
    pub fn absolute(&self, canvas: &BoundingBox, name: &str) -> EnsayoResult<(f64, f64)> {
        Ok(canvas.to_absolute(self.get(name)?))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Default for CoordinateTable {
    fn default() -> Self {
        Self::skylock_menu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_the_menu_controls() {
        let table = CoordinateTable::default();
        assert_eq!(table.version, 1);
        assert!(table.get("options_button").is_ok());
        assert!(table.get("difficulty_slider_2.0").is_ok());
        assert!(table.get("back_button").is_ok());
        assert_eq!(table.len(), 13);
    }

    #[test]
    fn unknown_element_is_element_not_found() {
        let table = CoordinateTable::skylock_menu();
        match table.get("pause_button") {
            Err(EnsayoError::ElementNotFound { name }) => assert_eq!(name, "pause_button"),
            other => panic!("expected ElementNotFound, got {other:?}"),
        }
    }

    #[test]
    fn absolute_click_position_adds_canvas_origin() {
        let table = CoordinateTable::skylock_menu();
        let canvas = BoundingBox::new(10.0, 20.0, 1280.0, 720.0);
        let (x, y) = table
            .absolute(&canvas, "options_button")
            .expect("known element");
        assert_eq!((x, y), (639.0, 377.0));
    }

    #[test]
    fn yaml_round_trip_preserves_entries_and_version() {
        let table = CoordinateTable::skylock_menu();
        let yaml = table.to_yaml().expect("serialize");
        let parsed = CoordinateTable::from_yaml(&yaml).expect("parse");
        assert_eq!(parsed, table);
    }

    #[test]
    fn loads_hand_written_config() {
        let yaml = "version: 2\nelements:\n  fire_button:\n    x: 100.0\n    y: 200.5\n";
        let table = CoordinateTable::from_yaml(yaml).expect("parse");
        assert_eq!(table.version, 2);
        assert_eq!(table.get("fire_button").unwrap(), UiPoint::new(100.0, 200.5));
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(CoordinateTable::from_yaml("elements: [not, a, map]").is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn absolute_is_origin_plus_offset(
                ox in -2000.0f64..2000.0,
                oy in -2000.0f64..2000.0,
                px in 0.0f64..4000.0,
                py in 0.0f64..4000.0,
            ) {
                let canvas = BoundingBox::new(ox, oy, 1280.0, 720.0);
                let (ax, ay) = canvas.to_absolute(UiPoint::new(px, py));
                prop_assert_eq!(ax, ox + px);
                prop_assert_eq!(ay, oy + py);
            }

            #[test]
            fn yaml_round_trip_for_arbitrary_tables(
                name in "[a-z_]{1,24}",
                x in 0.0f64..4000.0,
                y in 0.0f64..4000.0,
                version in 1u32..100,
            ) {
                let mut table = CoordinateTable::new(version);
                table.insert(name.clone(), UiPoint::new(x, y));
                let parsed = CoordinateTable::from_yaml(&table.to_yaml().unwrap()).unwrap();
                prop_assert_eq!(parsed, table);
            }
        }
    }
}
