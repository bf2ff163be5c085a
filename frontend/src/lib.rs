//! Reactive core of the climate ensemble dashboard
//!
//! Parameters live in [`state::ReactiveState`]; [`sync_engine::SyncEngine`]
//! keeps the derived data, styles and composed views consistent with them by
//! walking an explicit dependency graph. [`session::DashboardSession`] wraps
//! the engine in an actor for use from an async UI loop.

pub mod colormap;
pub mod dataflow;
pub mod derived;
pub mod error;
pub mod graph;
pub mod interaction;
pub mod session;
pub mod state;
pub mod style;
pub mod sync_engine;
pub mod views;

pub use colormap::Colormap;
pub use error::DashboardError;
pub use interaction::Gesture;
pub use session::DashboardSession;
pub use state::{ColorRange, ParamName, ReactiveState, StateUpdate, ViewWindow};
pub use sync_engine::{Node, Propagation, SyncEngine};
pub use views::{DashboardScene, MapScene, SeriesScene};
