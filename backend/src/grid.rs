//! In-memory labeled grid answering the dashboard's dataset queries
//!
//! Each statistic (mean, standard deviation) is an [`Ensemble`] holding one
//! `(time, scenario, lat, lon)` array per variable. Longitudes are rolled into
//! the signed convention once at load, so queries only wrap the requested
//! longitude and never touch the arrays' layout again.

use crate::document::{DatasetDocument, EnsembleDocument, LoadError};
use chrono::{Datelike, NaiveDate};
use ndarray::{Array4, Axis, s};
use rayon::ThreadPool;
use rayon::prelude::*;
use shared::{
    DatasetAccessor, DatasetMetadata, Field, GeoBounds, LonLat, LongitudeConvention, QueryError,
    Series, Statistic, VariableMeta, longitude_distance, normalize_longitude,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Ensemble {
    times: Vec<NaiveDate>,
    scenarios: Vec<String>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    fields: HashMap<String, Array4<f64>>,
}

impl Ensemble {
    fn from_document(
        statistic: Statistic,
        document: EnsembleDocument,
        variables: &[VariableMeta],
        convention: LongitudeConvention,
    ) -> Result<Self, LoadError> {
        let (n_time, n_scenario, n_lat, n_lon) = document.shape();
        for (axis, len) in [
            ("time", n_time),
            ("scenario", n_scenario),
            ("lat", n_lat),
            ("lon", n_lon),
        ] {
            if len == 0 {
                return Err(LoadError::EmptyAxis { statistic, axis });
            }
        }

        let EnsembleDocument {
            times,
            scenarios,
            lats,
            lons,
            mut values,
        } = document;

        let (lons, order) = signed_longitude_order(&lons, convention);

        let mut fields = HashMap::with_capacity(variables.len());
        for variable in variables {
            let flat = values
                .remove(&variable.name)
                .ok_or_else(|| LoadError::MissingValues {
                    statistic,
                    variable: variable.name.clone(),
                })?;
            let expected = n_time * n_scenario * n_lat * n_lon;
            let found = flat.len();
            let array = Array4::from_shape_vec((n_time, n_scenario, n_lat, n_lon), flat).map_err(
                |_| LoadError::ShapeMismatch {
                    statistic,
                    variable: variable.name.clone(),
                    expected,
                    found,
                },
            )?;
            let array = match &order {
                Some(order) => array.select(Axis(3), order),
                None => array,
            };
            fields.insert(variable.name.clone(), array);
        }

        Ok(Self {
            times,
            scenarios,
            lats,
            lons,
            fields,
        })
    }

    pub fn times(&self) -> &[NaiveDate] {
        &self.times
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    fn variable(&self, name: &str) -> Result<&Array4<f64>, QueryError> {
        self.fields
            .get(name)
            .ok_or_else(|| QueryError::UnknownVariable(name.to_string()))
    }

    fn scenario_index(&self, scenario: &str) -> Result<usize, QueryError> {
        self.scenarios
            .iter()
            .position(|known| known == scenario)
            .ok_or_else(|| QueryError::UnknownScenario(scenario.to_string()))
    }

    fn nearest_time(&self, target: NaiveDate) -> Option<usize> {
        nearest_index(&self.times, |time| {
            (*time - target).num_days().unsigned_abs() as f64
        })
    }

    fn nearest_lat(&self, lat: f64) -> Option<usize> {
        nearest_index(&self.lats, |grid_lat| (grid_lat - lat).abs())
    }

    fn nearest_lon(&self, lon: f64) -> Option<usize> {
        let lon = normalize_longitude(lon, LongitudeConvention::Signed);
        nearest_index(&self.lons, |grid_lon| longitude_distance(*grid_lon, lon))
    }
}

/// Signed longitudes in ascending order plus the column permutation that
/// produces them.
///
/// For a regular `0..360` grid the permutation is a roll by half the grid
/// width. `None` means the columns are already in order.
fn signed_longitude_order(
    lons: &[f64],
    convention: LongitudeConvention,
) -> (Vec<f64>, Option<Vec<usize>>) {
    let signed: Vec<f64> = lons
        .iter()
        .map(|&lon| match convention {
            LongitudeConvention::Signed => lon,
            LongitudeConvention::Positive => normalize_longitude(lon, LongitudeConvention::Signed),
        })
        .collect();

    let mut order: Vec<usize> = (0..signed.len()).collect();
    order.sort_by(|&a, &b| signed[a].total_cmp(&signed[b]));

    if order.iter().enumerate().all(|(position, &index)| position == index) {
        return (signed, None);
    }
    let sorted = order.iter().map(|&index| signed[index]).collect();
    (sorted, Some(order))
}

/// Index of the closest item; ties resolve to the first one.
fn nearest_index<T>(items: &[T], distance: impl Fn(&T) -> f64) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| (index, distance(item)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

#[derive(Debug)]
pub struct GridDataset {
    metadata: DatasetMetadata,
    mean: Ensemble,
    stddev: Ensemble,
    pool: Arc<ThreadPool>,
}

impl GridDataset {
    pub fn from_document(
        document: DatasetDocument,
        default_convention: LongitudeConvention,
        pool: Arc<ThreadPool>,
    ) -> Result<Self, LoadError> {
        if document.variables.is_empty() {
            return Err(LoadError::NoVariables);
        }
        let convention = document.longitude_convention.unwrap_or(default_convention);

        // Display order matches the variable dropdown: sorted, descending
        let mut variables = document.variables;
        variables.sort_by(|a, b| b.name.cmp(&a.name));

        let mean = Ensemble::from_document(Statistic::Mean, document.mean, &variables, convention)?;
        let stddev =
            Ensemble::from_document(Statistic::StdDev, document.stddev, &variables, convention)?;

        let years = mean.times.iter().map(|time| time.year());
        let min_year = years.clone().min().unwrap_or_default();
        let max_year = years.max().unwrap_or_default();

        let metadata = DatasetMetadata {
            variables,
            scenarios: mean.scenarios.clone(),
            min_year,
            max_year,
        };

        log::info!(
            "DATASET: loaded {} variables, {} scenarios, years {}..={}, grid {}x{}",
            metadata.variables.len(),
            metadata.scenarios.len(),
            min_year,
            max_year,
            mean.lats.len(),
            mean.lons.len()
        );

        Ok(Self {
            metadata,
            mean,
            stddev,
            pool,
        })
    }

    pub fn ensemble(&self, statistic: Statistic) -> &Ensemble {
        match statistic {
            Statistic::Mean => &self.mean,
            Statistic::StdDev => &self.stddev,
        }
    }
}

impl DatasetAccessor for GridDataset {
    fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    fn point_slice(
        &self,
        variable: &str,
        target: NaiveDate,
        scenario: &str,
    ) -> Result<Field, QueryError> {
        let ensemble = &self.mean;
        let array = ensemble.variable(variable)?;
        let scenario = ensemble.scenario_index(scenario)?;
        let time = ensemble
            .nearest_time(target)
            .ok_or(QueryError::EmptyQueryResult { query: "point_slice" })?;

        let values = array.slice(s![time, scenario, .., ..]).iter().copied().collect();
        Field::new(ensemble.lats.clone(), ensemble.lons.clone(), values)
    }

    fn time_series(
        &self,
        statistic: Statistic,
        variable: &str,
        point: LonLat,
        scenario: &str,
    ) -> Result<Series, QueryError> {
        let ensemble = self.ensemble(statistic);
        let array = ensemble.variable(variable)?;
        let scenario = ensemble.scenario_index(scenario)?;
        let empty = QueryError::EmptyQueryResult { query: "time_series" };
        let lat = ensemble.nearest_lat(point.lat).ok_or(empty.clone())?;
        let lon = ensemble.nearest_lon(point.lon).ok_or(empty)?;

        let values = array.slice(s![.., scenario, lat, lon]).to_vec();
        Series::new(ensemble.times.clone(), values)
    }

    fn region_mean(&self, variable: &str, bounds: &GeoBounds) -> Result<Series, QueryError> {
        let ensemble = &self.mean;
        let array = ensemble.variable(variable)?;

        let lat_indices: Vec<usize> = (0..ensemble.lats.len())
            .filter(|&i| bounds.contains_lat(ensemble.lats[i]))
            .collect();
        let lon_indices: Vec<usize> = (0..ensemble.lons.len())
            .filter(|&j| bounds.contains_lon(ensemble.lons[j]))
            .collect();
        if lat_indices.is_empty() || lon_indices.is_empty() {
            return Err(QueryError::EmptyQueryResult { query: "region_mean" });
        }

        log::debug!(
            "DATASET: region mean of '{}' over {}x{} cells",
            variable,
            lat_indices.len(),
            lon_indices.len()
        );

        let (n_time, n_scenario, _, _) = array.dim();
        let values: Vec<f64> = self.pool.install(|| {
            (0..n_time)
                .into_par_iter()
                .map(|time| {
                    let mut sum = 0.0;
                    let mut count = 0usize;
                    for scenario in 0..n_scenario {
                        for &lat in &lat_indices {
                            for &lon in &lon_indices {
                                let value = array[[time, scenario, lat, lon]];
                                if value.is_finite() {
                                    sum += value;
                                    count += 1;
                                }
                            }
                        }
                    }
                    if count == 0 { f64::NAN } else { sum / count as f64 }
                })
                .collect()
        });

        Series::new(ensemble.times.clone(), values)
    }
}
