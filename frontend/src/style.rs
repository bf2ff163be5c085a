//! Style-layer derived values: color scale, titles, labels.
//!
//! Nothing here touches the dataset; styles only read data-layer values
//! and parameters.

use crate::colormap::{Colormap, LUT_SIZE};
use crate::derived::{MapSlice, SeriesSlice};
use crate::state::ColorRange;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub range: ColorRange,
    pub locked: bool,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            range: ColorRange::default(),
            locked: false,
        }
    }
}

/// Extent of the map slice, used as the color range in auto mode.
pub fn auto_color_range(map: &MapSlice) -> Option<ColorRange> {
    let (min, max) = map.field.as_ref()?.min_max()?;
    Some(ColorRange::new(min, max))
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MapStyle {
    pub colormap: Colormap,
    pub lut: Arc<Vec<[u8; 3]>>,
    pub range: ColorRange,
    pub title: String,
    pub colorbar_label: String,
    pub show_colorbar: bool,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            colormap: Colormap::default(),
            lut: Arc::new(Colormap::default().lut(LUT_SIZE)),
            range: ColorRange::default(),
            title: String::new(),
            colorbar_label: String::new(),
            show_colorbar: true,
        }
    }
}

pub fn map_style(
    map: &MapSlice,
    scale: &ColorScale,
    colormap: Colormap,
    show_legend: bool,
) -> MapStyle {
    MapStyle {
        colormap,
        lut: Arc::new(colormap.lut(LUT_SIZE)),
        range: scale.range,
        title: format!("Average {} in {}", map.variable.long_name, map.year),
        colorbar_label: map.variable.label(),
        show_colorbar: show_legend,
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct SeriesStyle {
    pub title: String,
    pub y_label: String,
    /// Fixed y-range when the series follows the color range.
    pub y_range: Option<ColorRange>,
    pub show_legend: bool,
}

pub fn series_style(
    series: &SeriesSlice,
    scale: &ColorScale,
    follows_color_range: bool,
    show_legend: bool,
) -> SeriesStyle {
    SeriesStyle {
        title: format!("{} at {}", series.variable.name, series.pointer),
        y_label: series.variable.label(),
        y_range: follows_color_range.then_some(scale.range),
        show_legend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Field, LonLat, VariableMeta};

    fn temperature() -> VariableMeta {
        VariableMeta {
            name: "TS".to_string(),
            long_name: "Surface temperature".to_string(),
            units: Some("K".to_string()),
        }
    }

    fn map_slice(values: Vec<f64>) -> MapSlice {
        let lons = (0..values.len()).map(|i| i as f64).collect();
        MapSlice {
            variable: temperature(),
            scenario: "cmip6".to_string(),
            year: 2015,
            field: Some(Arc::new(Field::new(vec![0.0], lons, values).unwrap())),
        }
    }

    #[test]
    fn map_style_labels_follow_metadata() {
        let style = map_style(
            &map_slice(vec![1.0]),
            &ColorScale::default(),
            Colormap::Viridis,
            false,
        );
        assert_eq!(style.title, "Average Surface temperature in 2015");
        assert_eq!(style.colorbar_label, "Surface temperature (K)");
        assert_eq!(style.lut.len(), LUT_SIZE);
        assert!(!style.show_colorbar);
    }

    #[test]
    fn auto_range_skips_missing_values() {
        let range = auto_color_range(&map_slice(vec![3.0, f64::NAN, -2.0])).unwrap();
        assert_eq!(range, ColorRange::new(-2.0, 3.0));
        assert_eq!(auto_color_range(&MapSlice::default()), None);
    }

    #[test]
    fn series_title_uses_compass_directions() {
        let series = SeriesSlice {
            variable: temperature(),
            scenario: "cmip6".to_string(),
            pointer: LonLat::new(-35.5, -12.25),
            band: None,
        };
        let scale = ColorScale {
            range: ColorRange::new(250.0, 300.0),
            locked: true,
        };
        let style = series_style(&series, &scale, true, true);
        assert_eq!(style.title, "TS at 35.50°W, 12.25°S");
        assert_eq!(style.y_range, Some(ColorRange::new(250.0, 300.0)));
        assert_eq!(series_style(&series, &scale, false, true).y_range, None);
    }
}
