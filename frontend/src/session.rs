//! Dashboard session actor
//!
//! Serializes every mutation: parameter writes and gestures arrive on two
//! relays, are merged into one stream, and are applied one at a time. Each
//! propagation runs on the blocking pool so the event loop keeps accepting
//! events while the dataset is queried. The latest scene is published
//! through the actor's signal.

use crate::dataflow::{Actor, Relay, relay};
use crate::error::DashboardError;
use crate::interaction::Gesture;
use crate::state::StateUpdate;
use crate::sync_engine::{Propagation, SyncEngine};
use crate::views::DashboardScene;
use futures::{StreamExt, future, stream};
use futures_signals::signal::{Mutable, Signal, SignalExt};

enum SessionEvent {
    Parameter(StateUpdate),
    Gesture(Gesture),
}

#[derive(Clone, Debug)]
pub struct DashboardSession {
    scene: Actor<DashboardScene>,
    last_rejection: Mutable<Option<DashboardError>>,
    parameter_changed_relay: Relay<StateUpdate>,
    gesture_received_relay: Relay<Gesture>,
}

impl DashboardSession {
    /// Take ownership of the engine and start processing events on the
    /// current tokio runtime.
    pub fn start(engine: SyncEngine) -> Self {
        let (parameter_changed_relay, parameter_changed_stream) =
            relay("parameter_changed_relay");
        let (gesture_received_relay, gesture_received_stream) = relay("gesture_received_relay");
        let last_rejection = Mutable::new(None);
        let rejection_sink = last_rejection.clone();

        let scene = Actor::new(engine.scene(), move |scene| async move {
            let mut events = stream::select(
                parameter_changed_stream.map(SessionEvent::Parameter),
                gesture_received_stream.map(SessionEvent::Gesture),
            );
            let mut engine = engine;

            while let Some(event) = events.next().await {
                let task = tokio::task::spawn_blocking(move || {
                    let outcome = match event {
                        SessionEvent::Parameter(update) => engine.apply(update),
                        SessionEvent::Gesture(gesture) => engine.handle_gesture(gesture),
                    };
                    let published = match &outcome {
                        Ok(propagation) if !propagation.is_noop() => Some(engine.scene()),
                        _ => None,
                    };
                    (engine, outcome, published)
                });

                let (returned, outcome, published) = match task.await {
                    Ok(finished) => finished,
                    Err(error) => {
                        log::error!("SESSION: propagation task failed: {error}");
                        break;
                    }
                };
                engine = returned;

                match outcome {
                    Ok(Propagation {
                        changed: Some(changed),
                        revision,
                        ..
                    }) => {
                        log::debug!("SESSION: {changed} changed, publishing revision {revision}");
                    }
                    Ok(_) => {}
                    Err(error) => rejection_sink.set(Some(error)),
                }
                if let Some(published) = published {
                    scene.set(published);
                }
            }

            log::debug!("SESSION: event streams closed");
        });

        Self {
            scene,
            last_rejection,
            parameter_changed_relay,
            gesture_received_relay,
        }
    }

    pub fn set_parameter(&self, update: StateUpdate) {
        self.parameter_changed_relay.send(update);
    }

    pub fn send_gesture(&self, gesture: Gesture) {
        self.gesture_received_relay.send(gesture);
    }

    pub fn scene_signal(&self) -> impl Signal<Item = DashboardScene> + use<> {
        self.scene.signal()
    }

    /// Most recent update the state refused, if any.
    pub fn rejection_signal(&self) -> impl Signal<Item = Option<DashboardError>> + use<> {
        self.last_rejection.signal_cloned()
    }

    /// Resolves with the first published scene at or past `revision`.
    pub async fn wait_for_revision(&self, revision: u64) -> Option<DashboardScene> {
        self.scene
            .signal()
            .to_stream()
            .filter(|scene| future::ready(scene.revision >= revision))
            .next()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::CurveKind;
    use backend::{GridDataset, SyntheticEnsemble, build_worker_pool};
    use shared::{DashboardConfig, LongitudeConvention};
    use std::sync::Arc;

    fn session() -> DashboardSession {
        let dataset = GridDataset::from_document(
            SyntheticEnsemble::default().document(),
            LongitudeConvention::Positive,
            build_worker_pool(2).unwrap(),
        )
        .unwrap();
        let engine = SyncEngine::from_config(Arc::new(dataset), &DashboardConfig::default()).unwrap();
        DashboardSession::start(engine)
    }

    #[tokio::test]
    async fn initial_scene_is_published_immediately() {
        let session = session();
        let scene = session.scene_signal().to_stream().next().await.unwrap();
        assert_eq!(scene.revision, 1);
        assert!(scene.map.title.ends_with("in 2015"));
    }

    #[tokio::test]
    async fn events_are_applied_in_order() {
        let session = session();
        session.set_parameter(StateUpdate::Year(2020));
        session.set_parameter(StateUpdate::Year(2025));

        let scene = session.wait_for_revision(3).await.unwrap();
        assert!(scene.map.title.ends_with("in 2025"));
    }

    #[tokio::test]
    async fn gestures_drive_the_series_view() {
        let session = session();
        session.send_gesture(Gesture::Tap { x: 10.0, y: 20.0 });
        session.send_gesture(Gesture::BoxSelect {
            x0: 0.0,
            y0: 0.0,
            x1: 20.0,
            y1: 20.0,
        });

        let scene = session.wait_for_revision(3).await.unwrap();
        assert_eq!(scene.series.title, "TS at 10.00°E, 20.00°N");
        assert!(scene.series.curve(CurveKind::RegionMean).is_some());
    }

    #[tokio::test]
    async fn rejected_update_is_reported_without_new_scene() {
        let session = session();
        session.set_parameter(StateUpdate::Year(1500));
        session.set_parameter(StateUpdate::Year(2016));

        let scene = session.wait_for_revision(2).await.unwrap();
        assert_eq!(scene.revision, 2);
        assert!(scene.map.title.ends_with("in 2016"));

        let rejection = session.rejection_signal().to_stream().next().await.unwrap();
        assert!(matches!(
            rejection,
            Some(DashboardError::InvalidParameterValue { .. })
        ));
    }
}
