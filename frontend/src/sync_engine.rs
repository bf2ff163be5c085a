//! Synchronization Engine
//!
//! Holds the dashboard's dependency graph and the cached derived values.
//! A parameter change walks the graph from that parameter and recomputes
//! only its descendants, in topological order: data first, then style, then
//! the composed views. The walk is synchronous; callers wanting a
//! responsive event loop run it off the async executor (see `session`).

use crate::derived::{
    MapSlice, RegionSeries, SelectionSlice, SeriesSlice, fetch_map_slice, fetch_region_series,
    fetch_selection_slice, fetch_series_slice,
};
use crate::error::DashboardError;
use crate::graph::{DependencyGraph, GraphError};
use crate::interaction::Gesture;
use crate::state::{ParamName, ReactiveState, StateUpdate};
use crate::style::{
    ColorScale, MapStyle, SeriesStyle, auto_color_range, map_style, series_style,
};
use crate::views::{DashboardScene, MapScene, SeriesScene, compose_map, compose_series};
use indexmap::IndexMap;
use serde::Serialize;
use shared::{DashboardConfig, DatasetAccessor};
use std::sync::Arc;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    Param(ParamName),
    MapSlice,
    SeriesSlice,
    SelectionSlice,
    RegionSeries,
    ColorScale,
    MapStyle,
    SeriesStyle,
    MapView,
    SeriesView,
}

/// The dashboard's graph. Edges point from a node to what it reads.
pub fn dashboard_graph() -> Result<DependencyGraph<Node>, GraphError> {
    use Node as N;
    use ParamName as P;

    ParamName::ALL
        .into_iter()
        .fold(DependencyGraph::builder(), |builder, name| {
            builder.source(N::Param(name))
        })
        // data
        .node(
            N::MapSlice,
            &[N::Param(P::Variable), N::Param(P::Scenario), N::Param(P::Year)],
        )
        .node(
            N::SeriesSlice,
            &[N::Param(P::Variable), N::Param(P::Scenario), N::Param(P::Pointer)],
        )
        .node(N::SelectionSlice, &[N::MapSlice, N::Param(P::Selection)])
        .node(N::RegionSeries, &[N::Param(P::Variable), N::Param(P::Selection)])
        // style
        .node(
            N::ColorScale,
            &[N::MapSlice, N::Param(P::ColorRange), N::Param(P::ColorLock)],
        )
        .node(
            N::MapStyle,
            &[
                N::MapSlice,
                N::ColorScale,
                N::Param(P::Colormap),
                N::Param(P::ShowLegend),
            ],
        )
        .node(
            N::SeriesStyle,
            &[
                N::SeriesSlice,
                N::ColorScale,
                N::Param(P::SeriesFollowsColorRange),
                N::Param(P::ShowLegend),
            ],
        )
        // compose
        .node(
            N::MapView,
            &[
                N::MapSlice,
                N::MapStyle,
                N::SelectionSlice,
                N::Param(P::Pointer),
                N::Param(P::ViewWindow),
            ],
        )
        .node(
            N::SeriesView,
            &[
                N::SeriesSlice,
                N::SeriesStyle,
                N::RegionSeries,
                N::Param(P::Year),
            ],
        )
        .build()
}

/// Outcome of one applied update.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagation {
    /// `None` when the update left the state unchanged.
    pub changed: Option<ParamName>,
    pub recomputed: Vec<Node>,
    /// Errors absorbed while applying the update; the views they touched
    /// render empty.
    pub recovered: Vec<DashboardError>,
    pub revision: u64,
}

impl Propagation {
    pub fn is_noop(&self) -> bool {
        self.changed.is_none()
    }
}

#[derive(Debug, Clone, Default)]
struct DerivedCache {
    map_slice: MapSlice,
    series_slice: SeriesSlice,
    selection_slice: Option<SelectionSlice>,
    region_series: Option<RegionSeries>,
    color_scale: ColorScale,
    map_style: MapStyle,
    series_style: SeriesStyle,
    map_view: MapScene,
    series_view: SeriesScene,
}

pub struct SyncEngine {
    dataset: Arc<dyn DatasetAccessor>,
    graph: DependencyGraph<Node>,
    state: ReactiveState,
    cache: DerivedCache,
    recompute_counts: IndexMap<Node, u64>,
    revision: u64,
}

impl SyncEngine {
    /// Build the engine and compute every derived value once.
    pub fn new(
        dataset: Arc<dyn DatasetAccessor>,
        state: ReactiveState,
    ) -> Result<Self, DashboardError> {
        let graph = dashboard_graph()?;
        let mut engine = Self {
            dataset,
            graph,
            state,
            cache: DerivedCache::default(),
            recompute_counts: IndexMap::new(),
            revision: 0,
        };

        let sources: Vec<Node> = ParamName::ALL.into_iter().map(Node::Param).collect();
        engine.propagate(&sources, &mut Vec::new());
        Ok(engine)
    }

    pub fn from_config(
        dataset: Arc<dyn DatasetAccessor>,
        config: &DashboardConfig,
    ) -> Result<Self, DashboardError> {
        let state = ReactiveState::new(dataset.metadata(), &config.defaults)?;
        Self::new(dataset, state)
    }

    /// Apply one update and bring every dependent value up to date.
    ///
    /// Out-of-domain values are returned as `InvalidParameterValue`; the state
    /// and all derived values stay as they were.
    /// A zero-area selection box is applied as a reset and reported as
    /// `DegenerateSelection` in the propagation.
    pub fn apply(&mut self, update: StateUpdate) -> Result<Propagation, DashboardError> {
        let mut recovered = Vec::new();
        if matches!(&update, StateUpdate::Selection(Some(bounds)) if bounds.is_degenerate()) {
            recovered.push(DashboardError::DegenerateSelection);
        }

        let Some(changed) = self.state.apply(update)? else {
            return Ok(Propagation {
                changed: None,
                recomputed: Vec::new(),
                recovered,
                revision: self.revision,
            });
        };

        let recomputed = self.propagate(&[Node::Param(changed)], &mut recovered);
        Ok(Propagation {
            changed: Some(changed),
            recomputed,
            recovered,
            revision: self.revision,
        })
    }

    pub fn handle_gesture(&mut self, gesture: Gesture) -> Result<Propagation, DashboardError> {
        self.apply(gesture.translate())
    }

    fn propagate(&mut self, changed: &[Node], issues: &mut Vec<DashboardError>) -> Vec<Node> {
        let order = self.graph.invalidated(changed);
        let data_changed = order.contains(&Node::MapSlice);

        for &node in &order {
            self.recompute(node, data_changed, issues);
            *self.recompute_counts.entry(node).or_default() += 1;
        }

        self.revision += 1;
        log::debug!(
            "SYNC: revision {} recomputed {:?} after {:?}",
            self.revision,
            order,
            changed
        );
        order
    }

    fn recompute(&mut self, node: Node, data_changed: bool, issues: &mut Vec<DashboardError>) {
        // Auto mode writes the new extent back into the parameter
        if node == Node::ColorScale && data_changed {
            if let Some(range) = auto_color_range(&self.cache.map_slice) {
                if self.state.write_auto_color_range(range) {
                    log::debug!("SYNC: auto color range {}..{}", range.min, range.max);
                }
            }
        }

        let dataset = self.dataset.as_ref();
        let state = &self.state;
        let cache = &mut self.cache;

        match node {
            Node::Param(_) => {}
            Node::MapSlice => {
                cache.map_slice = fetch_map_slice(
                    dataset,
                    state.variable(),
                    state.scenario(),
                    state.year(),
                    issues,
                );
            }
            Node::SeriesSlice => {
                cache.series_slice = fetch_series_slice(
                    dataset,
                    state.variable(),
                    state.scenario(),
                    state.pointer(),
                    issues,
                );
            }
            Node::SelectionSlice => {
                cache.selection_slice =
                    fetch_selection_slice(dataset, &cache.map_slice, state.selection(), issues);
            }
            Node::RegionSeries => {
                cache.region_series =
                    fetch_region_series(dataset, state.variable(), state.selection(), issues);
            }
            Node::ColorScale => {
                cache.color_scale = ColorScale {
                    range: state.color_range(),
                    locked: state.color_locked(),
                };
            }
            Node::MapStyle => {
                cache.map_style = map_style(
                    &cache.map_slice,
                    &cache.color_scale,
                    state.colormap(),
                    state.show_legend(),
                );
            }
            Node::SeriesStyle => {
                cache.series_style = series_style(
                    &cache.series_slice,
                    &cache.color_scale,
                    state.series_follows_color_range(),
                    state.show_legend(),
                );
            }
            Node::MapView => {
                cache.map_view = compose_map(
                    &cache.map_slice,
                    cache.selection_slice.as_ref(),
                    &cache.map_style,
                    state.pointer(),
                    state.view_window(),
                );
            }
            Node::SeriesView => {
                cache.series_view = compose_series(
                    &cache.series_slice,
                    cache.region_series.as_ref(),
                    &cache.series_style,
                    state.year(),
                );
            }
        }
    }

    pub fn scene(&self) -> DashboardScene {
        DashboardScene {
            revision: self.revision,
            map: self.cache.map_view.clone(),
            series: self.cache.series_view.clone(),
            controls: self.state.controls(),
        }
    }

    pub fn state(&self) -> &ReactiveState {
        &self.state
    }

    pub fn graph(&self) -> &DependencyGraph<Node> {
        &self.graph
    }

    pub fn dataset(&self) -> &Arc<dyn DatasetAccessor> {
        &self.dataset
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn recompute_count(&self, node: Node) -> u64 {
        self.recompute_counts.get(&node).copied().unwrap_or_default()
    }

    pub fn map_slice(&self) -> &MapSlice {
        &self.cache.map_slice
    }

    pub fn series_slice(&self) -> &SeriesSlice {
        &self.cache.series_slice
    }

    pub fn selection_slice(&self) -> Option<&SelectionSlice> {
        self.cache.selection_slice.as_ref()
    }

    pub fn region_series(&self) -> Option<&RegionSeries> {
        self.cache.region_series.as_ref()
    }

    pub fn color_scale(&self) -> ColorScale {
        self.cache.color_scale
    }

    pub fn map_style(&self) -> &MapStyle {
        &self.cache.map_style
    }

    pub fn series_style(&self) -> &SeriesStyle {
        &self.cache.series_style
    }
}
