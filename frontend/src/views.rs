//! View Composer
//!
//! Pure functions from derived values to an ordered scene graph. Layers are
//! listed bottom to top; a rendering backend draws them in order.

use crate::colormap::Colormap;
use crate::derived::{MapSlice, RegionSeries, SelectionSlice, SeriesSlice};
use crate::state::{ColorRange, ControlDescriptor, ViewWindow};
use crate::style::{MapStyle, SeriesStyle};
use chrono::NaiveDate;
use serde::Serialize;
use shared::{Field, LonLat, january_first};
use std::sync::Arc;

/// RGBA with straight alpha.
pub type Rgba = (u8, u8, u8, f32);

const COASTLINE_COLOR: Rgba = (40, 40, 40, 1.0);
const MARKER_RING_COLOR: Rgba = (0, 0, 0, 1.0);
const MARKER_FILL_COLOR: Rgba = (255, 0, 0, 1.0);
const BAND_COLOR: Rgba = (31, 119, 180, 0.3);
const MEAN_COLOR: Rgba = (31, 119, 180, 1.0);
const REGION_COLOR: Rgba = (255, 127, 14, 1.0);
const YEAR_MARKER_COLOR: Rgba = (90, 90, 90, 1.0);

const DIMMED_BASE_ALPHA: f32 = 0.2;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    Ring,
    Dot,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum MapLayer {
    Image {
        field: Arc<Field>,
        colormap: Colormap,
        lut: Arc<Vec<[u8; 3]>>,
        range: ColorRange,
        alpha: f32,
        colorbar: Option<String>,
    },
    SelectionOverlay {
        field: Arc<Field>,
        colormap: Colormap,
        lut: Arc<Vec<[u8; 3]>>,
        range: ColorRange,
        alpha: f32,
    },
    Coastline {
        color: Rgba,
        width: f32,
    },
    Marker {
        position: LonLat,
        shape: MarkerShape,
        size: f32,
        color: Rgba,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct MapScene {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Visible window; `None` shows the full extent.
    pub frame: Option<ViewWindow>,
    pub layers: Vec<MapLayer>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    Mean,
    RegionMean,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum SeriesLayer {
    Band {
        times: Vec<NaiveDate>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        color: Rgba,
    },
    Curve {
        kind: CurveKind,
        label: String,
        times: Vec<NaiveDate>,
        values: Vec<f64>,
        color: Rgba,
    },
    YearMarker {
        date: NaiveDate,
        dashed: bool,
        width: f32,
        color: Rgba,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct SeriesScene {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub y_range: Option<ColorRange>,
    pub show_legend: bool,
    pub layers: Vec<SeriesLayer>,
}

/// Everything a rendering backend needs for one frame.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct DashboardScene {
    pub revision: u64,
    pub map: MapScene,
    pub series: SeriesScene,
    pub controls: Vec<ControlDescriptor>,
}

impl MapScene {
    pub fn has_selection_overlay(&self) -> bool {
        self.layers
            .iter()
            .any(|layer| matches!(layer, MapLayer::SelectionOverlay { .. }))
    }
}

impl SeriesScene {
    pub fn curve(&self, kind: CurveKind) -> Option<&SeriesLayer> {
        self.layers
            .iter()
            .find(|layer| matches!(layer, SeriesLayer::Curve { kind: k, .. } if *k == kind))
    }
}

pub fn compose_map(
    map: &MapSlice,
    selection: Option<&SelectionSlice>,
    style: &MapStyle,
    pointer: LonLat,
    window: Option<ViewWindow>,
) -> MapScene {
    let overlay = selection.and_then(|selection| selection.field.clone());
    let mut layers = Vec::with_capacity(5);

    if let Some(field) = &map.field {
        layers.push(MapLayer::Image {
            field: Arc::clone(field),
            colormap: style.colormap,
            lut: Arc::clone(&style.lut),
            range: style.range,
            alpha: if overlay.is_some() { DIMMED_BASE_ALPHA } else { 1.0 },
            colorbar: style.show_colorbar.then(|| style.colorbar_label.clone()),
        });
    }

    if let Some(field) = overlay {
        layers.push(MapLayer::SelectionOverlay {
            field,
            colormap: style.colormap,
            lut: Arc::clone(&style.lut),
            range: style.range,
            alpha: 1.0,
        });
    }

    layers.push(MapLayer::Coastline {
        color: COASTLINE_COLOR,
        width: 1.0,
    });

    // Ring first so the fill stays visible on both light and dark cells
    layers.push(MapLayer::Marker {
        position: pointer,
        shape: MarkerShape::Ring,
        size: 14.0,
        color: MARKER_RING_COLOR,
    });
    layers.push(MapLayer::Marker {
        position: pointer,
        shape: MarkerShape::Dot,
        size: 7.0,
        color: MARKER_FILL_COLOR,
    });

    MapScene {
        title: style.title.clone(),
        x_label: "Longitude".to_string(),
        y_label: "Latitude".to_string(),
        frame: window,
        layers,
    }
}

pub fn compose_series(
    series: &SeriesSlice,
    region: Option<&RegionSeries>,
    style: &SeriesStyle,
    year: i32,
) -> SeriesScene {
    let mut layers = Vec::with_capacity(4);

    if let Some(band) = &series.band {
        layers.push(SeriesLayer::Band {
            times: band.times.clone(),
            lower: band.lower.clone(),
            upper: band.upper.clone(),
            color: BAND_COLOR,
        });
        layers.push(SeriesLayer::Curve {
            kind: CurveKind::Mean,
            label: series.scenario.clone(),
            times: band.times.clone(),
            values: band.mean.clone(),
            color: MEAN_COLOR,
        });
    }

    if let Some(regional) = region.and_then(|region| region.series.as_ref()) {
        layers.push(SeriesLayer::Curve {
            kind: CurveKind::RegionMean,
            label: "Selected region".to_string(),
            times: regional.times.clone(),
            values: regional.values.clone(),
            color: REGION_COLOR,
        });
    }

    if let Some(date) = january_first(year) {
        layers.push(SeriesLayer::YearMarker {
            date,
            dashed: true,
            width: 2.0,
            color: YEAR_MARKER_COLOR,
        });
    }

    SeriesScene {
        title: style.title.clone(),
        x_label: "Time".to_string(),
        y_label: style.y_label.clone(),
        y_range: style.y_range,
        show_legend: style.show_legend,
        layers,
    }
}
