use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;

pub use config::{
    AppSection, DashboardConfig, DatasetSection, DefaultsSection, WorkersSection,
};

// ===== GEO TYPES =====

/// Longitude convention of a gridded dataset.
///
/// Climate model output usually stores longitudes as `0..360`, while map
/// widgets work in `-180..180`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongitudeConvention {
    #[serde(rename = "-180..180")]
    Signed,
    #[default]
    #[serde(rename = "0..360")]
    Positive,
}

/// Wrap a longitude into the given convention.
pub fn normalize_longitude(lon: f64, convention: LongitudeConvention) -> f64 {
    match convention {
        LongitudeConvention::Signed => (lon + 180.0).rem_euclid(360.0) - 180.0,
        LongitudeConvention::Positive => lon.rem_euclid(360.0),
    }
}

/// Shortest angular distance between two longitudes in degrees.
pub fn longitude_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// A single map coordinate in the UI convention (`-180..180`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const ORIGIN: LonLat = LonLat { lon: 0.0, lat: 0.0 };

    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", format_longitude(self.lon), format_latitude(self.lat))
    }
}

/// `10.00°E` / `35.50°W`
pub fn format_longitude(lon: f64) -> String {
    format_compass(lon, 'E', 'W')
}

/// `20.00°N` / `12.25°S`
pub fn format_latitude(lat: f64) -> String {
    format_compass(lat, 'N', 'S')
}

fn format_compass(value: f64, positive: char, negative: char) -> String {
    if value >= 0.0 {
        format!("{:.2}°{}", value, positive)
    } else {
        format!("{:.2}°{}", -value, negative)
    }
}

/// Rectangular lon/lat bounds with `west <= east` and `south <= north`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    /// Build bounds from two arbitrary corners of a drawn box.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            west: x0.min(x1),
            south: y0.min(y1),
            east: x0.max(x1),
            north: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Zero-area or non-finite bounds select nothing.
    pub fn is_degenerate(&self) -> bool {
        let finite = self.west.is_finite()
            && self.east.is_finite()
            && self.south.is_finite()
            && self.north.is_finite();
        !finite || self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.south && lat <= self.north
    }

    /// Shift the box by whole turns so `west` lies in `-180..180`. The width
    /// is kept, so a box drawn across the antimeridian ends past 180.
    pub fn wrapped(self) -> Self {
        if !self.west.is_finite() || !self.east.is_finite() {
            return self;
        }
        let west = normalize_longitude(self.west, LongitudeConvention::Signed);
        Self {
            west,
            east: self.east + (west - self.west),
            ..self
        }
    }

    /// Grid longitudes are wrapped into the signed convention and also tried
    /// one turn east, for boxes that cross the antimeridian.
    pub fn contains_lon(&self, lon: f64) -> bool {
        let lon = normalize_longitude(lon, LongitudeConvention::Signed);
        [lon, lon + 360.0]
            .into_iter()
            .any(|candidate| candidate >= self.west && candidate <= self.east)
    }
}

// ===== METADATA =====

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VariableMeta {
    pub name: String,
    pub long_name: String,
    #[serde(default)]
    pub units: Option<String>,
}

impl VariableMeta {
    pub fn unit_label(&self) -> &str {
        self.units.as_deref().unwrap_or("unitless")
    }

    /// Axis and colorbar label: `<long name> (<unit>)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.long_name, self.unit_label())
    }
}

/// Facts derived once when a dataset is loaded; immutable for the session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatasetMetadata {
    pub variables: Vec<VariableMeta>,
    pub scenarios: Vec<String>,
    pub min_year: i32,
    pub max_year: i32,
}

impl DatasetMetadata {
    pub fn variable(&self, name: &str) -> Option<&VariableMeta> {
        self.variables.iter().find(|variable| variable.name == name)
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|variable| variable.name.clone()).collect()
    }

    pub fn has_scenario(&self, scenario: &str) -> bool {
        self.scenarios.iter().any(|known| known == scenario)
    }
}

// ===== QUERY RESULTS =====

/// Which of the two ensemble statistics a query reads.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Mean,
    StdDev,
}

/// Scalar field over (lat, lon), row-major by latitude.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Field {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub values: Vec<f64>,
}

impl Field {
    pub fn new(lats: Vec<f64>, lons: Vec<f64>, values: Vec<f64>) -> Result<Self, QueryError> {
        if lats.len() * lons.len() != values.len() {
            return Err(QueryError::ShapeMismatch {
                expected: lats.len() * lons.len(),
                found: values.len(),
            });
        }
        Ok(Self { lats, lons, values })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, lat_index: usize, lon_index: usize) -> Option<f64> {
        if lat_index >= self.lats.len() || lon_index >= self.lons.len() {
            return None;
        }
        self.values.get(lat_index * self.lons.len() + lon_index).copied()
    }

    /// Minimum and maximum over finite values.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .fold(None, |acc, value| match acc {
                None => Some((value, value)),
                Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
            })
    }

    /// Cells whose coordinates fall inside `bounds` (edges inclusive).
    pub fn box_filter(&self, bounds: &GeoBounds) -> Field {
        let lat_indices: Vec<usize> = (0..self.lats.len())
            .filter(|&i| bounds.contains_lat(self.lats[i]))
            .collect();
        let lon_indices: Vec<usize> = (0..self.lons.len())
            .filter(|&j| bounds.contains_lon(self.lons[j]))
            .collect();

        if lat_indices.is_empty() || lon_indices.is_empty() {
            return Field::default();
        }

        let mut values = Vec::with_capacity(lat_indices.len() * lon_indices.len());
        for &i in &lat_indices {
            for &j in &lon_indices {
                values.push(self.values[i * self.lons.len() + j]);
            }
        }

        Field {
            lats: lat_indices.iter().map(|&i| self.lats[i]).collect(),
            lons: lon_indices.iter().map(|&j| self.lons[j]).collect(),
            values,
        }
    }
}

/// Ordered sequence over time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Series {
    pub times: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(times: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, QueryError> {
        if times.len() != values.len() {
            return Err(QueryError::ShapeMismatch {
                expected: times.len(),
                found: values.len(),
            });
        }
        Ok(Self { times, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }
}

pub fn january_first(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}

// ===== QUERY CONTRACT =====

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("{query} matched no data")]
    EmptyQueryResult { query: &'static str },
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),
    #[error("shape mismatch: expected {expected} values, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
}

/// Read-only query surface over the mean and standard-deviation ensembles.
///
/// Implementations are shared across threads; reads take no locks.
pub trait DatasetAccessor: Send + Sync {
    fn metadata(&self) -> &DatasetMetadata;

    /// Field over (lat, lon) at the time step nearest to `target` for an exact scenario.
    fn point_slice(
        &self,
        variable: &str,
        target: NaiveDate,
        scenario: &str,
    ) -> Result<Field, QueryError>;

    /// Series at the grid cell nearest to `point` (UI longitude convention).
    fn time_series(
        &self,
        statistic: Statistic,
        variable: &str,
        point: LonLat,
        scenario: &str,
    ) -> Result<Series, QueryError>;

    fn box_filter(&self, field: &Field, bounds: &GeoBounds) -> Result<Field, QueryError> {
        let filtered = field.box_filter(bounds);
        if filtered.is_empty() {
            return Err(QueryError::EmptyQueryResult { query: "box_filter" });
        }
        Ok(filtered)
    }

    /// Mean over lat, lon and every scenario inside `bounds`, per time step.
    fn region_mean(&self, variable: &str, bounds: &GeoBounds) -> Result<Series, QueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_field() -> Field {
        Field::new(
            vec![-10.0, 0.0, 10.0],
            vec![-20.0, 0.0, 20.0],
            vec![1.0, 2.0, 3.0, 4.0, f64::NAN, 6.0, 7.0, 8.0, 9.0],
        )
        .unwrap()
    }

    #[test]
    fn compass_formatting_flips_negative_values() {
        assert_eq!(LonLat::new(10.0, 20.0).to_string(), "10.00°E, 20.00°N");
        assert_eq!(LonLat::new(-35.5, -12.25).to_string(), "35.50°W, 12.25°S");
        assert_eq!(format_longitude(0.0), "0.00°E");
    }

    #[test]
    fn longitude_wraps_into_both_conventions() {
        assert_eq!(normalize_longitude(190.0, LongitudeConvention::Signed), -170.0);
        assert_eq!(normalize_longitude(-10.0, LongitudeConvention::Positive), 350.0);
        assert_eq!(normalize_longitude(180.0, LongitudeConvention::Signed), -180.0);
        assert_eq!(longitude_distance(179.0, -179.0), 2.0);
    }

    #[test]
    fn bounds_from_corners_are_ordered() {
        let bounds = GeoBounds::from_corners(20.0, 5.0, -10.0, -5.0);
        assert_eq!(bounds.west, -10.0);
        assert_eq!(bounds.north, 5.0);
        assert!(!bounds.is_degenerate());
        assert!(GeoBounds::from_corners(3.0, 0.0, 3.0, 20.0).is_degenerate());
        assert!(GeoBounds::from_corners(f64::NAN, 0.0, 3.0, 20.0).is_degenerate());
    }

    #[test]
    fn wrapped_bounds_keep_width_across_antimeridian() {
        let crossing = GeoBounds::from_corners(170.0, 0.0, 190.0, 20.0).wrapped();
        assert_eq!((crossing.west, crossing.east), (170.0, 190.0));
        assert!(crossing.contains_lon(-180.0));
        assert!(crossing.contains_lon(-170.0));
        assert!(crossing.contains_lon(175.0));
        assert!(!crossing.contains_lon(-160.0));

        let beyond = GeoBounds::from_corners(190.0, 0.0, 200.0, 20.0).wrapped();
        assert_eq!((beyond.west, beyond.east), (-170.0, -160.0));
        assert!(beyond.contains_lon(195.0));
    }

    #[test]
    fn box_filter_spans_the_antimeridian() {
        let field = Field::new(
            vec![0.0],
            vec![-180.0, -170.0, -160.0, 170.0],
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();
        let filtered = field.box_filter(&GeoBounds::from_corners(170.0, -5.0, 190.0, 5.0));
        assert_eq!(filtered.lons, vec![-180.0, -170.0, 170.0]);
        assert_eq!(filtered.values, vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn min_max_skips_missing_values() {
        assert_eq!(sample_field().min_max(), Some((1.0, 9.0)));
        assert_eq!(Field::default().min_max(), None);
    }

    #[test]
    fn box_filter_keeps_inclusive_cells() {
        let filtered = sample_field().box_filter(&GeoBounds::from_corners(0.0, 0.0, 20.0, 10.0));
        assert_eq!(filtered.lats, vec![0.0, 10.0]);
        assert_eq!(filtered.lons, vec![0.0, 20.0]);
        assert!(filtered.values[0].is_nan());
        assert_eq!(filtered.values[1..], [6.0, 8.0, 9.0]);
    }

    #[test]
    fn box_filter_outside_grid_is_empty() {
        let filtered = sample_field().box_filter(&GeoBounds::from_corners(50.0, 50.0, 60.0, 60.0));
        assert!(filtered.is_empty());
    }

    #[test]
    fn label_falls_back_to_unitless() {
        let meta = VariableMeta {
            name: "FSNO".to_string(),
            long_name: "Fraction of ground covered by snow".to_string(),
            units: None,
        };
        assert_eq!(meta.label(), "Fraction of ground covered by snow (unitless)");
    }

    #[test]
    fn field_rejects_wrong_value_count() {
        assert!(Field::new(vec![0.0], vec![0.0, 1.0], vec![1.0]).is_err());
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let metadata = DatasetMetadata {
            variables: vec![VariableMeta {
                name: "TS".to_string(),
                long_name: "Surface temperature".to_string(),
                units: Some("K".to_string()),
            }],
            scenarios: vec!["cmip6".to_string(), "smbb".to_string()],
            min_year: 1850,
            max_year: 2100,
        };
        let json = serde_json::to_string(&metadata).unwrap();
        let parsed: DatasetMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
        assert!(parsed.has_scenario("smbb"));
    }
}
