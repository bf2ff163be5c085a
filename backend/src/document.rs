//! On-disk dataset document
//!
//! The preprocessing step that reduces the ensemble to annual member means and
//! standard deviations writes one JSON document with both statistics. Values
//! are flattened in `(time, scenario, lat, lon)` order per variable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::{LongitudeConvention, Statistic, VariableMeta};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DatasetDocument {
    pub variables: Vec<VariableMeta>,
    /// Falls back to the `[dataset]` config section when absent.
    #[serde(default)]
    pub longitude_convention: Option<LongitudeConvention>,
    pub mean: EnsembleDocument,
    pub stddev: EnsembleDocument,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EnsembleDocument {
    pub times: Vec<NaiveDate>,
    pub scenarios: Vec<String>,
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub values: BTreeMap<String, Vec<f64>>,
}

impl EnsembleDocument {
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        (
            self.times.len(),
            self.scenarios.len(),
            self.lats.len(),
            self.lons.len(),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("dataset declares no variables")]
    NoVariables,
    #[error("{statistic:?} ensemble has an empty {axis} axis")]
    EmptyAxis {
        statistic: Statistic,
        axis: &'static str,
    },
    #[error("{statistic:?} ensemble has no values for variable '{variable}'")]
    MissingValues {
        statistic: Statistic,
        variable: String,
    },
    #[error("{statistic:?} values for '{variable}': expected {expected}, found {found}")]
    ShapeMismatch {
        statistic: Statistic,
        variable: String,
        expected: usize,
        found: usize,
    },
}
