//! Interaction Bridge: raw map gestures to state updates.
//!
//! Each gesture maps to exactly one parameter write, so replaying the same
//! gesture is a no-op and the latest gesture of a kind wins.

use crate::state::{StateUpdate, ViewWindow};
use serde::{Deserialize, Serialize};
use shared::{GeoBounds, LonLat};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum Gesture {
    /// Click on the map, in data coordinates.
    Tap { x: f64, y: f64 },
    /// Drag-box with two arbitrary corners.
    BoxSelect { x0: f64, y0: f64, x1: f64, y1: f64 },
    SelectionReset,
    /// Pan or zoom; framing only.
    RangeXY {
        x_range: (f64, f64),
        y_range: (f64, f64),
    },
}

impl Gesture {
    pub fn translate(self) -> StateUpdate {
        match self {
            Gesture::Tap { x, y } => StateUpdate::Pointer(LonLat::new(x, y)),
            Gesture::BoxSelect { x0, y0, x1, y1 } => {
                let bounds = GeoBounds::from_corners(x0, y0, x1, y1);
                StateUpdate::Selection((!bounds.is_degenerate()).then_some(bounds))
            }
            Gesture::SelectionReset => StateUpdate::Selection(None),
            Gesture::RangeXY { x_range, y_range } => {
                let window = ViewWindow::new(x_range, y_range);
                StateUpdate::ViewWindow(window.is_valid().then_some(window))
            }
        }
    }
}
