//! Named event relay
//!
//! The sending half of an unbounded channel that feeds one actor. A relay is
//! named after its `{source}_{event}_relay` binding so a dropped event or a
//! second emitter can be traced back to it in the log.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
#[cfg(debug_assertions)]
use std::panic::Location;
#[cfg(debug_assertions)]
use std::sync::{Arc, OnceLock};

#[derive(Clone, Debug)]
pub struct Relay<T> {
    name: &'static str,
    sender: UnboundedSender<T>,
    /// Call site of the first `send`; debug builds allow no other.
    #[cfg(debug_assertions)]
    emitter: Arc<OnceLock<&'static Location<'static>>>,
}

/// Open a relay and the stream its actor consumes.
///
/// ```ignore
/// let (year_changed_relay, year_changed_stream) = relay("year_changed_relay");
/// year_changed_relay.send(2050);
/// ```
pub fn relay<T>(name: &'static str) -> (Relay<T>, UnboundedReceiver<T>) {
    let (sender, receiver) = unbounded();
    let relay = Relay {
        name,
        sender,
        #[cfg(debug_assertions)]
        emitter: Arc::new(OnceLock::new()),
    };
    (relay, receiver)
}

impl<T> Relay<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queue an event for the actor. Never blocks.
    ///
    /// Once the actor has stopped the event is logged and dropped. Debug
    /// builds panic when a relay is sent from two different call sites.
    #[track_caller]
    pub fn send(&self, event: T) {
        #[cfg(debug_assertions)]
        {
            let caller = Location::caller();
            let first = *self.emitter.get_or_init(|| caller);
            assert!(
                first == caller,
                "{} has two emitters: {first} and {caller}",
                self.name
            );
        }

        if self.sender.unbounded_send(event).is_err() {
            log::warn!("SESSION: {} dropped an event, its actor has stopped", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn emit_year(relay: &Relay<i32>, year: i32) {
        relay.send(year);
    }

    #[tokio::test]
    async fn test_relay_delivers_in_order() {
        let (year_changed_relay, mut year_changed_stream) = relay("year_changed_relay");

        for year in [1990, 2015, 2050] {
            emit_year(&year_changed_relay, year);
        }

        assert_eq!(year_changed_stream.next().await, Some(1990));
        assert_eq!(year_changed_stream.next().await, Some(2015));
        assert_eq!(year_changed_stream.next().await, Some(2050));
    }

    #[test]
    fn test_send_after_actor_stopped_is_dropped() {
        let (scenario_changed_relay, scenario_changed_stream) =
            relay::<String>("scenario_changed_relay");
        drop(scenario_changed_stream);

        scenario_changed_relay.send("cmip6".to_string());
        assert_eq!(scenario_changed_relay.name(), "scenario_changed_relay");
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "year_changed_relay has two emitters")]
    fn test_second_emitter_panics_in_debug() {
        let (year_changed_relay, _year_changed_stream) = relay("year_changed_relay");
        emit_year(&year_changed_relay, 2015);
        year_changed_relay.send(2050);
    }
}
