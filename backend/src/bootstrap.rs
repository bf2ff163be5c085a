//! Startup wiring: config file, worker pool and dataset document
//!
//! Everything here runs once. Failures are fatal for the session and are
//! reported a single time by [`open_dataset`].

use crate::document::DatasetDocument;
use crate::grid::GridDataset;
use anyhow::{Context, Result};
use rayon::ThreadPool;
use shared::DashboardConfig;
use std::path::Path;
use std::sync::Arc;

pub fn load_config(path: &Path) -> Result<DashboardConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = DashboardConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    if !config.app.is_supported_version() {
        anyhow::bail!(
            "Unsupported config version '{}' in {} (expected {})",
            config.app.version,
            path.display(),
            shared::AppSection::CURRENT_VERSION
        );
    }

    Ok(config)
}

/// Pool used for aggregate queries. Zero threads lets rayon pick.
pub fn build_worker_pool(threads: usize) -> Result<Arc<ThreadPool>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|index| format!("dataset-worker-{index}"))
        .build()
        .context("Failed to start dataset worker pool")?;
    Ok(Arc::new(pool))
}

pub fn read_document(path: &Path) -> Result<DatasetDocument> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open dataset document: {}", path.display()))?;
    let document = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse dataset document: {}", path.display()))?;
    Ok(document)
}

pub fn open_dataset(config: &DashboardConfig) -> Result<Arc<GridDataset>> {
    let result = (|| -> Result<Arc<GridDataset>> {
        let path = config
            .dataset
            .path
            .as_deref()
            .context("No dataset path configured ([dataset] path)")?;
        let pool = build_worker_pool(config.workers.threads)?;
        let document = read_document(path)?;
        let dataset =
            GridDataset::from_document(document, config.dataset.longitude_convention, pool)
                .with_context(|| format!("Invalid dataset document: {}", path.display()))?;
        Ok(Arc::new(dataset))
    })();

    if let Err(error) = &result {
        log::error!("DATASET: startup failed: {error:#}");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticEnsemble;
    use shared::DatasetAccessor;
    use std::io::Write;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn opens_dataset_named_in_config() {
        init_logging();
        let dir = tempfile::tempdir().unwrap();
        let document_path = dir.path().join("lens2.json");
        let document = SyntheticEnsemble::default().document();
        std::fs::write(&document_path, serde_json::to_vec(&document).unwrap()).unwrap();

        let config_path = dir.path().join("dashboard.toml");
        let mut config_file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            config_file,
            "[dataset]\npath = {:?}\n\n[workers]\nthreads = 2\n\n[defaults]\nyear = 2010",
            document_path.display().to_string()
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.defaults.year, 2010);

        let dataset = open_dataset(&config).unwrap();
        assert_eq!(dataset.metadata().scenarios, vec!["cmip6", "smbb"]);
    }

    #[test]
    fn missing_dataset_path_is_fatal() {
        init_logging();
        let error = open_dataset(&DashboardConfig::default()).unwrap_err();
        assert!(error.to_string().contains("No dataset path"));
    }

    #[test]
    fn unsupported_config_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("dashboard.toml");
        std::fs::write(&config_path, "[app]\nversion = \"0.1.0\"\n").unwrap();
        assert!(load_config(&config_path).is_err());
    }

    #[test]
    fn worker_pool_names_its_threads() {
        let pool = build_worker_pool(2).unwrap();
        assert_eq!(pool.current_num_threads(), 2);
        let name = pool.install(|| std::thread::current().name().map(str::to_string));
        assert!(name.is_some_and(|name| name.starts_with("dataset-worker-")));
    }

    #[test]
    fn unreadable_document_reports_path() {
        let error = read_document(Path::new("/nonexistent/lens2.json")).unwrap_err();
        assert!(error.to_string().contains("/nonexistent/lens2.json"));
    }
}
