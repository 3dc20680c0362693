//! Event loop: deferred deletion and function-binding polls on tokio.
//!
//! Everything runs on the caller's task. [`EventLoop::run_until`] owns the
//! tree for as long as it runs; application code reaches it through signal
//! listeners, event handlers and bindings, all of which receive the tree.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::object::ObjectTree;

/// Shortest accepted poll interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

/// Configuration for the [`EventLoop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// How often function bindings are re-evaluated.
    pub poll_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl RuntimeConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the function-binding poll interval (builder). Values below one
    /// millisecond are raised to one millisecond.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }
}

// ---------------------------------------------------------------------------
// EventLoop
// ---------------------------------------------------------------------------

/// What one [`EventLoop::turn`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnStats {
    /// Deferred deletions executed (descendants not counted).
    pub deleted: usize,
    /// Function bindings re-evaluated.
    pub polled: usize,
}

/// Drives an [`ObjectTree`]: runs deferred deletions on the next turn and
/// re-evaluates function bindings on a fixed cadence.
#[derive(Debug, Clone, Default)]
pub struct EventLoop {
    config: RuntimeConfig,
}

impl EventLoop {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run one turn synchronously: pending deletions, then one poll pass.
    ///
    /// Useful where no async runtime is available, and in tests.
    pub fn turn(&self, tree: &mut ObjectTree) -> TurnStats {
        let deleted = tree.process_deferred_deletes();
        let polled = tree.poll_bindings();
        TurnStats { deleted, polled }
    }

    /// Drive `tree` until `shutdown` completes, returning its output.
    ///
    /// Deferred deletions run as soon as the loop yields once to the
    /// scheduler; function bindings re-evaluate every `poll_interval`
    /// (the first pass runs immediately). Shutdown takes priority over
    /// pending work.
    pub async fn run_until<F: Future>(&self, tree: &mut ObjectTree, shutdown: F) -> F::Output {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        tracing::debug!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "event loop started"
        );

        loop {
            tokio::select! {
                biased;
                output = &mut shutdown => {
                    tracing::debug!("event loop stopped");
                    return output;
                }
                _ = tokio::task::yield_now(), if tree.has_pending_deletes() => {
                    let deleted = tree.process_deferred_deletes();
                    tracing::trace!(deleted, "processed deferred deletes");
                }
                _ = interval.tick() => {
                    tree.poll_bindings();
                }
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::object::ObjectData;
    use crate::property::{Property, PropertyOptions};

    #[test]
    fn config_defaults_and_builder() {
        let config = RuntimeConfig::new();
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        let config = config.with_poll_interval(Duration::from_millis(5));
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        let config = config.with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);
    }

    #[test]
    fn turn_runs_deletes_then_polls() {
        let mut tree = ObjectTree::new();
        let doomed = tree.create(ObjectData::default());
        let keeper = tree.create(ObjectData::default());
        let prop = Property::new(&mut tree, keeper, "n", PropertyOptions::new(0));
        prop.bind_fn(&mut tree, || 1).unwrap();
        tree.delete_later(doomed);

        let event_loop = EventLoop::default();
        let stats = event_loop.turn(&mut tree);
        assert_eq!(stats, TurnStats { deleted: 1, polled: 1 });
        assert!(!tree.contains(doomed));
        assert_eq!(event_loop.turn(&mut tree), TurnStats { deleted: 0, polled: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn run_until_polls_on_interval() {
        let mut tree = ObjectTree::new();
        let owner = tree.create(ObjectData::default());
        let prop = Property::new(&mut tree, owner, "ticks", PropertyOptions::new(0));
        let calls = Rc::new(Cell::new(0));
        let calls_c = calls.clone();
        prop.bind_fn(&mut tree, move || {
            calls_c.set(calls_c.get() + 1);
            calls_c.get()
        })
        .unwrap();
        assert_eq!(calls.get(), 1);

        let event_loop = EventLoop::new(RuntimeConfig::new());
        event_loop
            .run_until(&mut tree, tokio::time::sleep(Duration::from_millis(175)))
            .await;
        // Ticks at 0, 50, 100 and 150 ms.
        assert_eq!(calls.get(), 5);
        assert_eq!(prop.get(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn run_until_processes_deferred_deletes() {
        let mut tree = ObjectTree::new();
        let id = tree.create(ObjectData::default());
        tree.delete_later(id);
        assert!(tree.contains(id));
        let event_loop = EventLoop::default();
        event_loop
            .run_until(&mut tree, tokio::time::sleep(Duration::from_millis(10)))
            .await;
        assert!(!tree.contains(id));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_output_is_returned() {
        let mut tree = ObjectTree::new();
        let event_loop = EventLoop::default();
        let value = event_loop.run_until(&mut tree, async { 42 }).await;
        assert_eq!(value, 42);
    }
}
