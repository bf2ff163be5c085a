//! Single-value Actor
//!
//! Actor owns a `Mutable<T>` and a tokio task that processes events from
//! Relays one at a time. Readers only see the state through signals.

use futures_signals::signal::{Mutable, Signal};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Aborts the processing task when the last Actor clone is dropped.
#[derive(Debug)]
struct TaskHandle(JoinHandle<()>);

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Reactive state container with a single point of mutation.
///
/// - **Single Point of Mutation**: only the processor task writes the state
/// - **Sequential Processing**: events are handled one at a time, in order
/// - **Reactive Signals**: views bind to `signal()`
///
/// # Examples
///
/// ```ignore
/// let (year_changed_relay, mut year_changed_stream) = relay("year_changed_relay");
///
/// let year = Actor::new(2015, |state| async move {
///     while let Some(year) = year_changed_stream.next().await {
///         state.set_neq(year);
///     }
/// });
///
/// year_changed_relay.send(2050);
/// ```
#[derive(Clone, Debug)]
pub struct Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    state: Mutable<T>,
    #[allow(dead_code)]
    task_handle: Arc<TaskHandle>,
    #[cfg(debug_assertions)]
    #[allow(dead_code)]
    creation_location: &'static std::panic::Location<'static>,
}

impl<T> Actor<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Spawn the processor on the current tokio runtime.
    ///
    /// Panics when called outside a runtime.
    #[track_caller]
    pub fn new<F, Fut>(initial_state: T, processor: F) -> Self
    where
        F: FnOnce(Mutable<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let state = Mutable::new(initial_state);
        let task_handle = Arc::new(TaskHandle(tokio::spawn(processor(state.clone()))));

        Self {
            state,
            task_handle,
            #[cfg(debug_assertions)]
            creation_location: std::panic::Location::caller(),
        }
    }

    pub fn signal(&self) -> impl Signal<Item = T> + use<T> {
        self.state.signal_cloned()
    }

    pub fn signal_ref<U>(&self, f: impl FnMut(&T) -> U + Send + Sync + 'static) -> impl Signal<Item = U>
    where
        U: Send + Sync + 'static,
    {
        self.state.signal_ref(f)
    }
}
