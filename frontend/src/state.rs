//! Reactive State
//!
//! Owns every user-settable parameter together with its domain. Setting a
//! parameter validates it, and reports whether the value actually changed so
//! the sync engine only propagates genuine changes.

use crate::colormap::Colormap;
use crate::error::DashboardError;
use serde::{Deserialize, Serialize};
use shared::{
    DatasetMetadata, DefaultsSection, GeoBounds, LonLat, LongitudeConvention, normalize_longitude,
};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamName {
    Variable,
    Scenario,
    Year,
    Colormap,
    ColorRange,
    ColorLock,
    ShowLegend,
    SeriesFollowsColorRange,
    Pointer,
    Selection,
    ViewWindow,
}

impl ParamName {
    pub const ALL: [ParamName; 11] = [
        ParamName::Variable,
        ParamName::Scenario,
        ParamName::Year,
        ParamName::Colormap,
        ParamName::ColorRange,
        ParamName::ColorLock,
        ParamName::ShowLegend,
        ParamName::SeriesFollowsColorRange,
        ParamName::Pointer,
        ParamName::Selection,
        ParamName::ViewWindow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParamName::Variable => "variable",
            ParamName::Scenario => "scenario",
            ParamName::Year => "year",
            ParamName::Colormap => "colormap",
            ParamName::ColorRange => "color_range",
            ParamName::ColorLock => "lock_color_range",
            ParamName::ShowLegend => "show_legend",
            ParamName::SeriesFollowsColorRange => "series_follows_color_range",
            ParamName::Pointer => "pointer",
            ParamName::Selection => "selection",
            ParamName::ViewWindow => "view_window",
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===== DOMAINS =====

#[derive(Debug, Clone)]
pub enum Domain<T> {
    OneOf(Vec<T>),
    Within { min: T, max: T },
    /// Free-form rule for compound values (points, boxes, ranges).
    Satisfies {
        rule: &'static str,
        check: fn(&T) -> bool,
    },
    Any,
}

impl<T> Domain<T>
where
    T: PartialEq + PartialOrd + fmt::Debug,
{
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Domain::OneOf(options) => options.contains(value),
            Domain::Within { min, max } => value >= min && value <= max,
            Domain::Satisfies { check, .. } => check(value),
            Domain::Any => true,
        }
    }

    fn describe(&self) -> String {
        match self {
            Domain::OneOf(options) => format!("expected one of {options:?}"),
            Domain::Within { min, max } => format!("expected a value in {min:?}..={max:?}"),
            Domain::Satisfies { rule, .. } => format!("expected {rule}"),
            Domain::Any => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter<T> {
    name: ParamName,
    value: T,
    domain: Domain<T>,
}

impl<T> Parameter<T>
where
    T: Clone + PartialEq + PartialOrd + fmt::Debug,
{
    pub fn new(name: ParamName, value: T, domain: Domain<T>) -> Result<Self, DashboardError> {
        if !domain.admits(&value) {
            return Err(DashboardError::invalid(
                name,
                format!("{value:?}: {}", domain.describe()),
            ));
        }
        Ok(Self { name, value, domain })
    }

    pub fn name(&self) -> ParamName {
        self.name
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn domain(&self) -> &Domain<T> {
        &self.domain
    }

    /// Returns `Ok(false)` when the value is unchanged. A rejected value
    /// leaves the current one in place.
    pub fn set(&mut self, value: T) -> Result<bool, DashboardError> {
        if !self.domain.admits(&value) {
            return Err(DashboardError::invalid(
                self.name,
                format!("{value:?}: {}", self.domain.describe()),
            ));
        }
        if value == self.value {
            return Ok(false);
        }
        self.value = value;
        Ok(true)
    }
}

// ===== COMPOUND VALUES =====

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ColorRange {
    pub min: f64,
    pub max: f64,
}

impl ColorRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Position of `value` in `[0, 1]`; a flat range maps everything to 0.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self { min: 0.0, max: 100.0 }
    }
}

/// Visible pan/zoom window in map coordinates. Framing only.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ViewWindow {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl ViewWindow {
    pub fn new(x: (f64, f64), y: (f64, f64)) -> Self {
        Self { x, y }
    }

    pub fn is_valid(&self) -> bool {
        let (x0, x1) = self.x;
        let (y0, y1) = self.y;
        [x0, x1, y0, y1].iter().all(|v| v.is_finite()) && x0 < x1 && y0 < y1
    }
}

fn valid_color_range(range: &ColorRange) -> bool {
    range.is_valid()
}

fn valid_pointer(pointer: &LonLat) -> bool {
    pointer.is_finite() && (-90.0..=90.0).contains(&pointer.lat)
}

fn valid_selection(selection: &Option<GeoBounds>) -> bool {
    selection.is_none_or(|bounds| !bounds.is_degenerate())
}

fn valid_view_window(window: &Option<ViewWindow>) -> bool {
    window.is_none_or(|window| window.is_valid())
}

// ===== UPDATES =====

/// A single parameter write, as produced by controls or gestures.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Variable(String),
    Scenario(String),
    Year(i32),
    Colormap(Colormap),
    ColorRange(ColorRange),
    ColorLock(bool),
    ShowLegend(bool),
    SeriesFollowsColorRange(bool),
    Pointer(LonLat),
    Selection(Option<GeoBounds>),
    ViewWindow(Option<ViewWindow>),
}

impl StateUpdate {
    pub fn parameter(&self) -> ParamName {
        match self {
            StateUpdate::Variable(_) => ParamName::Variable,
            StateUpdate::Scenario(_) => ParamName::Scenario,
            StateUpdate::Year(_) => ParamName::Year,
            StateUpdate::Colormap(_) => ParamName::Colormap,
            StateUpdate::ColorRange(_) => ParamName::ColorRange,
            StateUpdate::ColorLock(_) => ParamName::ColorLock,
            StateUpdate::ShowLegend(_) => ParamName::ShowLegend,
            StateUpdate::SeriesFollowsColorRange(_) => ParamName::SeriesFollowsColorRange,
            StateUpdate::Pointer(_) => ParamName::Pointer,
            StateUpdate::Selection(_) => ParamName::Selection,
            StateUpdate::ViewWindow(_) => ParamName::ViewWindow,
        }
    }
}

// ===== CONTROL DESCRIPTORS =====

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlGroup {
    Dataset,
    Plot,
}

impl ControlGroup {
    pub fn title(self) -> &'static str {
        match self {
            ControlGroup::Dataset => "Dataset controls",
            ControlGroup::Plot => "Plot controls",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlKind {
    Dropdown { options: Vec<String>, selected: String },
    Slider { min: i32, max: i32, value: i32 },
    RangeInput { min: f64, max: f64 },
    Checkbox { checked: bool },
}

/// A widget bound one-to-one to a parameter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ControlDescriptor {
    pub parameter: ParamName,
    pub label: String,
    pub group: ControlGroup,
    pub kind: ControlKind,
}

// ===== STATE =====

#[derive(Debug, Clone)]
pub struct ReactiveState {
    variable: Parameter<String>,
    scenario: Parameter<String>,
    year: Parameter<i32>,
    colormap: Parameter<Colormap>,
    color_range: Parameter<ColorRange>,
    color_lock: Parameter<bool>,
    show_legend: Parameter<bool>,
    series_follows_color_range: Parameter<bool>,
    pointer: Parameter<LonLat>,
    selection: Parameter<Option<GeoBounds>>,
    view_window: Parameter<Option<ViewWindow>>,
}

impl ReactiveState {
    /// Build the initial state. Domains come from the dataset metadata; the
    /// default year is clamped into the available years.
    pub fn new(
        metadata: &DatasetMetadata,
        defaults: &DefaultsSection,
    ) -> Result<Self, DashboardError> {
        let variables = metadata.variable_names();
        let variable = defaults
            .variable
            .clone()
            .or_else(|| variables.first().cloned())
            .ok_or_else(|| DashboardError::invalid(ParamName::Variable, "dataset has no variables"))?;

        let scenario = defaults
            .scenario
            .clone()
            .or_else(|| metadata.scenarios.first().cloned())
            .ok_or_else(|| DashboardError::invalid(ParamName::Scenario, "dataset has no scenarios"))?;

        if metadata.min_year > metadata.max_year {
            return Err(DashboardError::invalid(
                ParamName::Year,
                format!("empty year range {}..={}", metadata.min_year, metadata.max_year),
            ));
        }
        let year = defaults.year.clamp(metadata.min_year, metadata.max_year);

        let colormap = Colormap::from_name(&defaults.colormap).ok_or_else(|| {
            DashboardError::invalid(
                ParamName::Colormap,
                format!("unknown colormap '{}'", defaults.colormap),
            )
        })?;

        let pointer = LonLat::new(
            normalize_longitude(defaults.pointer_lon, LongitudeConvention::Signed),
            defaults.pointer_lat,
        );

        Ok(Self {
            variable: Parameter::new(ParamName::Variable, variable, Domain::OneOf(variables))?,
            scenario: Parameter::new(
                ParamName::Scenario,
                scenario,
                Domain::OneOf(metadata.scenarios.clone()),
            )?,
            year: Parameter::new(
                ParamName::Year,
                year,
                Domain::Within {
                    min: metadata.min_year,
                    max: metadata.max_year,
                },
            )?,
            colormap: Parameter::new(
                ParamName::Colormap,
                colormap,
                Domain::OneOf(Colormap::ALL.to_vec()),
            )?,
            color_range: Parameter::new(
                ParamName::ColorRange,
                ColorRange::default(),
                Domain::Satisfies {
                    rule: "finite bounds with min <= max",
                    check: valid_color_range,
                },
            )?,
            color_lock: Parameter::new(ParamName::ColorLock, defaults.lock_color_range, Domain::Any)?,
            show_legend: Parameter::new(ParamName::ShowLegend, defaults.show_legend, Domain::Any)?,
            series_follows_color_range: Parameter::new(
                ParamName::SeriesFollowsColorRange,
                defaults.series_follows_color_range,
                Domain::Any,
            )?,
            pointer: Parameter::new(
                ParamName::Pointer,
                pointer,
                Domain::Satisfies {
                    rule: "finite coordinates with latitude in -90..=90",
                    check: valid_pointer,
                },
            )?,
            selection: Parameter::new(
                ParamName::Selection,
                None,
                Domain::Satisfies {
                    rule: "bounds with non-zero area",
                    check: valid_selection,
                },
            )?,
            view_window: Parameter::new(
                ParamName::ViewWindow,
                None,
                Domain::Satisfies {
                    rule: "finite, increasing x and y ranges",
                    check: valid_view_window,
                },
            )?,
        })
    }

    /// Apply one write. `Ok(Some(name))` means the value changed; `Ok(None)`
    /// means it was already current.
    pub fn apply(&mut self, update: StateUpdate) -> Result<Option<ParamName>, DashboardError> {
        let parameter = update.parameter();
        let changed = match update {
            StateUpdate::Variable(value) => self.variable.set(value),
            StateUpdate::Scenario(value) => self.scenario.set(value),
            StateUpdate::Year(value) => self.year.set(value),
            StateUpdate::Colormap(value) => self.colormap.set(value),
            StateUpdate::ColorRange(value) => self.color_range.set(value),
            StateUpdate::ColorLock(value) => self.color_lock.set(value),
            StateUpdate::ShowLegend(value) => self.show_legend.set(value),
            StateUpdate::SeriesFollowsColorRange(value) => {
                self.series_follows_color_range.set(value)
            }
            StateUpdate::Pointer(value) => self.pointer.set(LonLat::new(
                normalize_longitude(value.lon, LongitudeConvention::Signed),
                value.lat,
            )),
            StateUpdate::Selection(Some(bounds)) if bounds.is_degenerate() => {
                log::debug!("SYNC: zero-area selection cleared");
                self.selection.set(None)
            }
            StateUpdate::Selection(value) => self.selection.set(value.map(GeoBounds::wrapped)),
            StateUpdate::ViewWindow(value) => self.view_window.set(value),
        };

        match changed {
            Ok(true) => Ok(Some(parameter)),
            Ok(false) => Ok(None),
            Err(error) => {
                log::warn!("SYNC: rejected update: {error}");
                Err(error)
            }
        }
    }

    /// Auto-mode write-through of the map slice extent. Ignored when locked
    /// or when the extent is not a valid range.
    pub(crate) fn write_auto_color_range(&mut self, range: ColorRange) -> bool {
        if *self.color_lock.get() {
            return false;
        }
        self.color_range.set(range).unwrap_or(false)
    }

    pub fn variable(&self) -> &str {
        self.variable.get()
    }

    pub fn scenario(&self) -> &str {
        self.scenario.get()
    }

    pub fn year(&self) -> i32 {
        *self.year.get()
    }

    pub fn colormap(&self) -> Colormap {
        *self.colormap.get()
    }

    pub fn color_range(&self) -> ColorRange {
        *self.color_range.get()
    }

    pub fn color_locked(&self) -> bool {
        *self.color_lock.get()
    }

    pub fn show_legend(&self) -> bool {
        *self.show_legend.get()
    }

    pub fn series_follows_color_range(&self) -> bool {
        *self.series_follows_color_range.get()
    }

    pub fn pointer(&self) -> LonLat {
        *self.pointer.get()
    }

    pub fn selection(&self) -> Option<GeoBounds> {
        *self.selection.get()
    }

    pub fn view_window(&self) -> Option<ViewWindow> {
        *self.view_window.get()
    }

    /// Widget descriptors for the rendering backend, in panel order.
    pub fn controls(&self) -> Vec<ControlDescriptor> {
        let dropdown = |parameter: &Parameter<String>, label: &str| ControlDescriptor {
            parameter: parameter.name(),
            label: label.to_string(),
            group: ControlGroup::Dataset,
            kind: ControlKind::Dropdown {
                options: match parameter.domain() {
                    Domain::OneOf(options) => options.clone(),
                    _ => Vec::new(),
                },
                selected: parameter.get().clone(),
            },
        };
        let checkbox = |parameter: &Parameter<bool>, label: &str| ControlDescriptor {
            parameter: parameter.name(),
            label: label.to_string(),
            group: ControlGroup::Plot,
            kind: ControlKind::Checkbox {
                checked: *parameter.get(),
            },
        };

        let (min_year, max_year) = match self.year.domain() {
            Domain::Within { min, max } => (*min, *max),
            _ => (self.year(), self.year()),
        };
        let range = self.color_range();

        vec![
            dropdown(&self.variable, "Variable"),
            dropdown(&self.scenario, "Forcing type"),
            ControlDescriptor {
                parameter: ParamName::Year,
                label: "Year".to_string(),
                group: ControlGroup::Dataset,
                kind: ControlKind::Slider {
                    min: min_year,
                    max: max_year,
                    value: self.year(),
                },
            },
            ControlDescriptor {
                parameter: ParamName::Colormap,
                label: "Colormap".to_string(),
                group: ControlGroup::Plot,
                kind: ControlKind::Dropdown {
                    options: Colormap::ALL.iter().map(|c| c.name().to_string()).collect(),
                    selected: self.colormap().name().to_string(),
                },
            },
            ControlDescriptor {
                parameter: ParamName::ColorRange,
                label: "Color range".to_string(),
                group: ControlGroup::Plot,
                kind: ControlKind::RangeInput {
                    min: range.min,
                    max: range.max,
                },
            },
            checkbox(&self.color_lock, "Lock color range"),
            checkbox(&self.show_legend, "Show legend"),
            checkbox(
                &self.series_follows_color_range,
                "Apply color range to time series",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::VariableMeta;

    fn metadata() -> DatasetMetadata {
        DatasetMetadata {
            variables: vec![
                VariableMeta {
                    name: "TS".to_string(),
                    long_name: "Surface temperature".to_string(),
                    units: Some("K".to_string()),
                },
                VariableMeta {
                    name: "FSNO".to_string(),
                    long_name: "Fraction of ground covered by snow".to_string(),
                    units: None,
                },
            ],
            scenarios: vec!["cmip6".to_string(), "smbb".to_string()],
            min_year: 1850,
            max_year: 2100,
        }
    }

    fn state() -> ReactiveState {
        ReactiveState::new(&metadata(), &DefaultsSection::default()).unwrap()
    }

    #[test]
    fn defaults_come_from_metadata_and_config() {
        let state = state();
        assert_eq!(state.variable(), "TS");
        assert_eq!(state.scenario(), "cmip6");
        assert_eq!(state.year(), 2015);
        assert_eq!(state.colormap(), Colormap::Inferno);
        assert_eq!(state.pointer(), LonLat::ORIGIN);
        assert_eq!(state.selection(), None);
        assert!(!state.color_locked());
    }

    #[test]
    fn default_year_is_clamped_into_range() {
        let defaults = DefaultsSection {
            year: 1700,
            ..DefaultsSection::default()
        };
        let state = ReactiveState::new(&metadata(), &defaults).unwrap();
        assert_eq!(state.year(), 1850);
    }

    #[test]
    fn unknown_default_colormap_is_rejected() {
        let defaults = DefaultsSection {
            colormap: "jet".to_string(),
            ..DefaultsSection::default()
        };
        let error = ReactiveState::new(&metadata(), &defaults).unwrap_err();
        assert!(matches!(
            error,
            DashboardError::InvalidParameterValue {
                parameter: ParamName::Colormap,
                ..
            }
        ));
    }

    #[test]
    fn setting_the_same_value_is_a_no_op() {
        let mut state = state();
        assert_eq!(state.apply(StateUpdate::Year(2015)).unwrap(), None);
        assert_eq!(
            state.apply(StateUpdate::Scenario("cmip6".to_string())).unwrap(),
            None
        );
        assert_eq!(
            state.apply(StateUpdate::Year(2050)).unwrap(),
            Some(ParamName::Year)
        );
    }

    #[test]
    fn out_of_domain_values_keep_previous_value() {
        let mut state = state();
        assert!(state.apply(StateUpdate::Year(2200)).is_err());
        assert!(state.apply(StateUpdate::Variable("PRECT".to_string())).is_err());
        assert!(
            state
                .apply(StateUpdate::ColorRange(ColorRange::new(5.0, 1.0)))
                .is_err()
        );
        assert!(
            state
                .apply(StateUpdate::Pointer(LonLat::new(0.0, 95.0)))
                .is_err()
        );
        assert_eq!(state.year(), 2015);
        assert_eq!(state.variable(), "TS");
        assert_eq!(state.color_range(), ColorRange::default());
        assert_eq!(state.pointer(), LonLat::ORIGIN);
    }

    #[test]
    fn pointer_longitude_wraps_to_signed() {
        let mut state = state();
        state
            .apply(StateUpdate::Pointer(LonLat::new(350.0, 10.0)))
            .unwrap();
        assert_eq!(state.pointer(), LonLat::new(-10.0, 10.0));
    }

    #[test]
    fn selection_past_the_antimeridian_wraps_like_the_pointer() {
        let mut state = state();
        state
            .apply(StateUpdate::Selection(Some(GeoBounds::from_corners(
                190.0, 0.0, 200.0, 20.0,
            ))))
            .unwrap();
        assert_eq!(
            state.selection(),
            Some(GeoBounds::from_corners(-170.0, 0.0, -160.0, 20.0))
        );

        let crossing = GeoBounds::from_corners(170.0, 0.0, 190.0, 20.0);
        state.apply(StateUpdate::Selection(Some(crossing))).unwrap();
        assert_eq!(state.selection(), Some(crossing));
    }

    #[test]
    fn degenerate_selection_clears_region() {
        let mut state = state();
        let bounds = GeoBounds::from_corners(0.0, 0.0, 20.0, 20.0);
        assert_eq!(
            state.apply(StateUpdate::Selection(Some(bounds))).unwrap(),
            Some(ParamName::Selection)
        );
        let collapsed = GeoBounds::from_corners(5.0, 0.0, 5.0, 20.0);
        assert_eq!(
            state.apply(StateUpdate::Selection(Some(collapsed))).unwrap(),
            Some(ParamName::Selection)
        );
        assert_eq!(state.selection(), None);
        assert_eq!(
            state.apply(StateUpdate::Selection(Some(collapsed))).unwrap(),
            None
        );
    }

    #[test]
    fn auto_range_is_skipped_when_locked() {
        let mut state = state();
        assert!(state.write_auto_color_range(ColorRange::new(200.0, 300.0)));
        state.apply(StateUpdate::ColorLock(true)).unwrap();
        assert!(!state.write_auto_color_range(ColorRange::new(0.0, 1.0)));
        assert_eq!(state.color_range(), ColorRange::new(200.0, 300.0));
    }

    #[test]
    fn controls_cover_every_widget_parameter() {
        let controls = state().controls();
        assert_eq!(controls.len(), 8);
        assert_eq!(
            controls[2].kind,
            ControlKind::Slider {
                min: 1850,
                max: 2100,
                value: 2015
            }
        );
        assert!(matches!(
            &controls[0].kind,
            ControlKind::Dropdown { options, .. } if options == &["TS", "FSNO"]
        ));
        let plot = controls
            .iter()
            .filter(|control| control.group == ControlGroup::Plot)
            .count();
        assert_eq!(plot, 5);
        assert_eq!(ControlGroup::Dataset.title(), "Dataset controls");
    }

    #[test]
    fn color_range_normalizes_values() {
        let range = ColorRange::new(10.0, 20.0);
        assert_eq!(range.normalize(15.0), 0.5);
        assert_eq!(range.normalize(-5.0), 0.0);
        assert_eq!(ColorRange::new(3.0, 3.0).normalize(3.0), 0.0);
    }
}
