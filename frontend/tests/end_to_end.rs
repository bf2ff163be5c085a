//! Full path: config file and dataset document on disk, through the session
//! actor, to the published scene.

use backend::{SyntheticEnsemble, load_config, open_dataset};
use frontend::views::{CurveKind, MapLayer};
use frontend::{DashboardSession, Gesture, StateUpdate, SyncEngine};
use futures::StreamExt;
use futures_signals::signal::SignalExt;
use shared::DatasetAccessor;
use std::io::Write;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Writes the synthetic dataset and a config pointing at it.
fn write_fixture(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let dataset_path = dir.path().join("lens2_annual.json");
    let file = std::fs::File::create(&dataset_path).unwrap();
    serde_json::to_writer(file, &SyntheticEnsemble::default().document()).unwrap();

    let config_path = dir.path().join("dashboard.toml");
    let mut config = std::fs::File::create(&config_path).unwrap();
    write!(
        config,
        r#"
[app]
version = "1.0.0"

[dataset]
path = "{}"
longitude_convention = "0..360"

[defaults]
colormap = "viridis"

[workers]
threads = 2
"#,
        dataset_path.display()
    )
    .unwrap();
    config_path
}

fn start_session(dir: &tempfile::TempDir) -> (DashboardSession, String) {
    let config = load_config(&write_fixture(dir)).unwrap();
    let dataset = open_dataset(&config).unwrap();
    let first = dataset.metadata().variables[0].clone();
    let engine = SyncEngine::from_config(dataset as Arc<dyn DatasetAccessor>, &config).unwrap();
    (DashboardSession::start(engine), first.long_name)
}

#[tokio::test]
async fn titles_follow_parameters_and_gestures() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let (session, long_name) = start_session(&dir);

    session.set_parameter(StateUpdate::Variable("TS".to_string()));
    session.set_parameter(StateUpdate::Year(2015));
    session.set_parameter(StateUpdate::Scenario("cmip6".to_string()));
    session.set_parameter(StateUpdate::Year(2016));
    session.set_parameter(StateUpdate::Year(2015));

    let scene = session.wait_for_revision(3).await.unwrap();
    assert_eq!(scene.map.title, format!("Average {long_name} in 2015"));

    session.send_gesture(Gesture::Tap { x: 10.0, y: 20.0 });
    let scene = session.wait_for_revision(4).await.unwrap();
    assert_eq!(scene.series.title, "TS at 10.00°E, 20.00°N");
    assert_eq!(scene.series.y_label, "Surface temperature (radiative) (K)");
}

#[tokio::test]
async fn collapsed_box_removes_selection_and_region_curve() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let (session, _) = start_session(&dir);

    session.send_gesture(Gesture::BoxSelect {
        x0: 0.0,
        y0: 0.0,
        x1: 20.0,
        y1: 20.0,
    });
    let scene = session.wait_for_revision(2).await.unwrap();
    assert!(scene.map.has_selection_overlay());
    assert!(scene.series.curve(CurveKind::RegionMean).is_some());

    session.send_gesture(Gesture::BoxSelect {
        x0: 7.0,
        y0: 0.0,
        x1: 7.0,
        y1: 20.0,
    });
    let scene = session.wait_for_revision(3).await.unwrap();
    assert!(!scene.map.has_selection_overlay());
    assert!(scene.series.curve(CurveKind::RegionMean).is_none());
    assert!(matches!(
        scene.map.layers.first(),
        Some(MapLayer::Image { alpha, .. }) if *alpha == 1.0
    ));
}

#[tokio::test]
async fn scene_serializes_for_a_rendering_backend() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let (session, _) = start_session(&dir);

    let scene = session.scene_signal().to_stream().next().await.unwrap();
    let json = serde_json::to_value(&scene).unwrap();

    assert_eq!(json["map"]["layers"][0]["layer"], "image");
    assert_eq!(json["map"]["layers"][0]["colormap"], "viridis");
    assert_eq!(json["series"]["layers"][0]["layer"], "band");
    assert_eq!(json["controls"][0]["kind"]["kind"], "dropdown");
}
