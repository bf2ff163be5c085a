//! Data-layer derived values
//!
//! Every function here is a pure read of the dataset. Query failures never
//! escape: they are logged, pushed onto the caller's `recovered` list, and
//! turn into an empty value the views render as blank.

use crate::error::DashboardError;
use chrono::NaiveDate;
use serde::Serialize;
use shared::{
    DatasetAccessor, Field, GeoBounds, LonLat, QueryError, Series, Statistic, VariableMeta,
    january_first,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MapSlice {
    pub variable: VariableMeta,
    pub scenario: String,
    pub year: i32,
    /// `None` when the query matched nothing.
    pub field: Option<Arc<Field>>,
}

impl MapSlice {
    pub fn is_empty(&self) -> bool {
        self.field.is_none()
    }
}

impl Default for MapSlice {
    fn default() -> Self {
        Self {
            variable: placeholder_meta(""),
            scenario: String::new(),
            year: 0,
            field: None,
        }
    }
}

/// Mean curve with a one-standard-deviation envelope, aligned by date.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct UncertaintyBand {
    pub times: Vec<NaiveDate>,
    pub mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl UncertaintyBand {
    /// Join the two series on their dates; mean steps without a matching
    /// standard deviation are dropped.
    pub fn from_series(mean: &Series, stddev: &Series) -> Self {
        let spread: HashMap<NaiveDate, f64> = stddev.points().collect();
        let mut band = Self::default();
        for (time, value) in mean.points() {
            let Some(&sigma) = spread.get(&time) else {
                continue;
            };
            band.times.push(time);
            band.mean.push(value);
            band.lower.push(value - sigma);
            band.upper.push(value + sigma);
        }
        band
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SeriesSlice {
    pub variable: VariableMeta,
    pub scenario: String,
    pub pointer: LonLat,
    pub band: Option<UncertaintyBand>,
}

impl Default for SeriesSlice {
    fn default() -> Self {
        Self {
            variable: placeholder_meta(""),
            scenario: String::new(),
            pointer: LonLat::ORIGIN,
            band: None,
        }
    }
}

/// The map slice cut down to the selection box.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SelectionSlice {
    pub bounds: GeoBounds,
    pub field: Option<Arc<Field>>,
}

/// Regional mean over the raw dataset for the selection box.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RegionSeries {
    pub bounds: GeoBounds,
    pub series: Option<Series>,
}

fn placeholder_meta(name: &str) -> VariableMeta {
    VariableMeta {
        name: name.to_string(),
        long_name: name.to_string(),
        units: None,
    }
}

fn variable_meta(dataset: &dyn DatasetAccessor, variable: &str) -> VariableMeta {
    dataset
        .metadata()
        .variable(variable)
        .cloned()
        .unwrap_or_else(|| placeholder_meta(variable))
}

fn recovered<T>(
    what: &str,
    result: Result<T, QueryError>,
    issues: &mut Vec<DashboardError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            let error = DashboardError::from(error);
            log::warn!("SYNC: {what} rendered empty: {error}");
            issues.push(error);
            None
        }
    }
}

/// Field at the time step nearest to January 1 of `year`.
pub fn fetch_map_slice(
    dataset: &dyn DatasetAccessor,
    variable: &str,
    scenario: &str,
    year: i32,
    issues: &mut Vec<DashboardError>,
) -> MapSlice {
    let query = january_first(year)
        .ok_or(QueryError::EmptyQueryResult {
            query: "point_slice",
        })
        .and_then(|target| dataset.point_slice(variable, target, scenario));
    let field = recovered("map slice", query, issues);

    MapSlice {
        variable: variable_meta(dataset, variable),
        scenario: scenario.to_string(),
        year,
        field: field.filter(|field| !field.is_empty()).map(Arc::new),
    }
}

/// Mean and standard deviation at the grid cell nearest to `pointer`,
/// looked up independently in each ensemble.
pub fn fetch_series_slice(
    dataset: &dyn DatasetAccessor,
    variable: &str,
    scenario: &str,
    pointer: LonLat,
    issues: &mut Vec<DashboardError>,
) -> SeriesSlice {
    let mean = recovered(
        "time series mean",
        dataset.time_series(Statistic::Mean, variable, pointer, scenario),
        issues,
    );
    let stddev = recovered(
        "time series spread",
        dataset.time_series(Statistic::StdDev, variable, pointer, scenario),
        issues,
    );

    let band = match (mean, stddev) {
        (Some(mean), Some(stddev)) => Some(UncertaintyBand::from_series(&mean, &stddev)),
        _ => None,
    };

    SeriesSlice {
        variable: variable_meta(dataset, variable),
        scenario: scenario.to_string(),
        pointer,
        band: band.filter(|band| !band.is_empty()),
    }
}

pub fn fetch_selection_slice(
    dataset: &dyn DatasetAccessor,
    map: &MapSlice,
    selection: Option<GeoBounds>,
    issues: &mut Vec<DashboardError>,
) -> Option<SelectionSlice> {
    let bounds = selection.filter(|bounds| !bounds.is_degenerate())?;
    let field = map.field.as_deref().and_then(|field| {
        recovered("selection overlay", dataset.box_filter(field, &bounds), issues).map(Arc::new)
    });
    Some(SelectionSlice { bounds, field })
}

pub fn fetch_region_series(
    dataset: &dyn DatasetAccessor,
    variable: &str,
    selection: Option<GeoBounds>,
    issues: &mut Vec<DashboardError>,
) -> Option<RegionSeries> {
    let bounds = selection.filter(|bounds| !bounds.is_degenerate())?;
    let series = recovered("region mean", dataset.region_mean(variable, &bounds), issues)
        .filter(|series| !series.is_empty());
    Some(RegionSeries { bounds, series })
}
