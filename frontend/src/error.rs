use crate::graph::GraphError;
use crate::state::ParamName;
use shared::QueryError;

/// Errors surfaced by the reactive core.
///
/// Only `InvalidParameterValue` is returned by `SyncEngine::apply`. Empty
/// queries and zero-area boxes are recovered from: the affected view renders
/// empty and the error is listed in `Propagation::recovered`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DashboardError {
    #[error("invalid value for '{parameter}': {reason}")]
    InvalidParameterValue { parameter: ParamName, reason: String },
    #[error("query returned no data: {0}")]
    EmptyQueryResult(#[from] QueryError),
    #[error("selection box has zero area")]
    DegenerateSelection,
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl DashboardError {
    pub fn invalid(parameter: ParamName, reason: impl Into<String>) -> Self {
        Self::InvalidParameterValue {
            parameter,
            reason: reason.into(),
        }
    }
}
