use crate::LongitudeConvention;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ===== CONFIG TYPES =====

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub app: AppSection,
    pub dataset: DatasetSection,
    pub defaults: DefaultsSection,
    pub workers: WorkersSection,
}

impl DashboardConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

// AppSection carries the config format version so older files can be detected
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppSection {
    pub version: String,
}

impl AppSection {
    pub const CURRENT_VERSION: &'static str = "1.0.0";

    pub fn is_supported_version(&self) -> bool {
        matches!(self.version.as_str(), "1.0.0")
    }

    pub fn needs_migration(&self) -> bool {
        self.version != Self::CURRENT_VERSION
    }
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DatasetSection {
    /// JSON dataset document produced by the preprocessing step.
    pub path: Option<PathBuf>,
    pub longitude_convention: LongitudeConvention,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DefaultsSection {
    /// First variable in display order when unset.
    pub variable: Option<String>,
    /// First scenario label when unset.
    pub scenario: Option<String>,
    pub year: i32,
    pub colormap: String,
    pub lock_color_range: bool,
    pub show_legend: bool,
    pub series_follows_color_range: bool,
    pub pointer_lon: f64,
    pub pointer_lat: f64,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            variable: None,
            scenario: None,
            year: 2015,
            colormap: "inferno".to_string(),
            lock_color_range: false,
            show_legend: true,
            series_follows_color_range: false,
            pointer_lon: 0.0,
            pointer_lat: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorkersSection {
    pub threads: usize,
}

impl Default for WorkersSection {
    fn default() -> Self {
        Self { threads: 4 }
    }
}
