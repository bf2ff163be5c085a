//! Dataset side of the climate dashboard
//!
//! Loads the annual ensemble reduction into memory and answers the
//! [`shared::DatasetAccessor`] queries. Aggregations fan out over a rayon
//! pool; point and slice queries are plain indexed reads.

pub mod bootstrap;
pub mod document;
pub mod grid;
pub mod synthetic;

pub use bootstrap::{build_worker_pool, load_config, open_dataset, read_document};
pub use document::{DatasetDocument, EnsembleDocument, LoadError};
pub use grid::{Ensemble, GridDataset};
pub use synthetic::SyntheticEnsemble;
