//! Synthetic ensemble with closed-form values
//!
//! Produces a [`DatasetDocument`] shaped like the annual LENS2 reduction so the
//! dashboard can run without the preprocessed files. Every cell is computable
//! from its coordinates, which lets callers check query results exactly.

use crate::document::{DatasetDocument, EnsembleDocument};
use chrono::NaiveDate;
use shared::{LongitudeConvention, VariableMeta, normalize_longitude};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct SyntheticEnsemble {
    pub variables: Vec<VariableMeta>,
    pub scenarios: Vec<String>,
    pub first_year: i32,
    pub last_year: i32,
    /// Degrees between grid cells on both axes.
    pub grid_step: f64,
    pub convention: LongitudeConvention,
}

impl Default for SyntheticEnsemble {
    fn default() -> Self {
        Self {
            variables: vec![
                VariableMeta {
                    name: "TS".to_string(),
                    long_name: "Surface temperature (radiative)".to_string(),
                    units: Some("K".to_string()),
                },
                VariableMeta {
                    name: "FSNO".to_string(),
                    long_name: "Fraction of ground covered by snow".to_string(),
                    units: None,
                },
            ],
            scenarios: vec!["cmip6".to_string(), "smbb".to_string()],
            first_year: 2000,
            last_year: 2030,
            grid_step: 10.0,
            convention: LongitudeConvention::Positive,
        }
    }
}

impl SyntheticEnsemble {
    pub fn year_count(&self) -> usize {
        (self.last_year - self.first_year + 1).max(0) as usize
    }

    /// Annual values are stamped mid-January.
    pub fn times(&self) -> Vec<NaiveDate> {
        (self.first_year..=self.last_year)
            .filter_map(|year| NaiveDate::from_ymd_opt(year, 1, 15))
            .collect()
    }

    pub fn lats(&self) -> Vec<f64> {
        let count = (180.0 / self.grid_step).floor() as usize + 1;
        (0..count).map(|i| -90.0 + i as f64 * self.grid_step).collect()
    }

    pub fn lons(&self) -> Vec<f64> {
        let count = (360.0 / self.grid_step).floor() as usize;
        let start = match self.convention {
            LongitudeConvention::Positive => 0.0,
            LongitudeConvention::Signed => -180.0,
        };
        (0..count).map(|i| start + i as f64 * self.grid_step).collect()
    }

    fn variable_index(&self, variable: &str) -> usize {
        self.variables
            .iter()
            .position(|meta| meta.name == variable)
            .unwrap_or_default()
    }

    pub fn mean_value(&self, variable: &str, year: i32, scenario: usize, lat: f64, lon: f64) -> f64 {
        let lon = normalize_longitude(lon, LongitudeConvention::Signed);
        let offset = 10.0 * self.variable_index(variable) as f64;
        let trend = 0.02 * (year - self.first_year) as f64 * (scenario + 1) as f64;
        250.0 + offset + 30.0 * lat.to_radians().cos() + 2.0 * lon.to_radians().sin() + trend
    }

    /// Spread grows toward the poles and with scenario index.
    pub fn stddev_value(&self, variable: &str, _year: i32, scenario: usize, lat: f64, _lon: f64) -> f64 {
        0.5 + 0.1 * self.variable_index(variable) as f64 + 0.01 * lat.abs() + 0.1 * scenario as f64
    }

    pub fn document(&self) -> DatasetDocument {
        DatasetDocument {
            variables: self.variables.clone(),
            longitude_convention: Some(self.convention),
            mean: self.ensemble(|variable, year, scenario, lat, lon| {
                self.mean_value(variable, year, scenario, lat, lon)
            }),
            stddev: self.ensemble(|variable, year, scenario, lat, lon| {
                self.stddev_value(variable, year, scenario, lat, lon)
            }),
        }
    }

    fn ensemble(&self, value: impl Fn(&str, i32, usize, f64, f64) -> f64) -> EnsembleDocument {
        let lats = self.lats();
        let lons = self.lons();
        let mut values = BTreeMap::new();

        for meta in &self.variables {
            let mut flat =
                Vec::with_capacity(self.year_count() * self.scenarios.len() * lats.len() * lons.len());
            for year in self.first_year..=self.last_year {
                for scenario in 0..self.scenarios.len() {
                    for &lat in &lats {
                        for &lon in &lons {
                            flat.push(value(&meta.name, year, scenario, lat, lon));
                        }
                    }
                }
            }
            values.insert(meta.name.clone(), flat);
        }

        EnsembleDocument {
            times: self.times(),
            scenarios: self.scenarios.clone(),
            lats,
            lons,
            values,
        }
    }
}
