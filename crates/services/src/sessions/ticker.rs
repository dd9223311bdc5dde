use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use super::service::{SessionEngine, Tick};

/// Engine handle shared between the driver and the ticker.
pub type SharedEngine = Arc<Mutex<SessionEngine>>;

/// Periodically reconciles a running attempt against its deadline.
pub struct DeadlineTicker;

impl DeadlineTicker {
    /// Spawn a ticker that calls `reconcile` every `period`.
    ///
    /// The first reconcile happens immediately. The task ends on its own once
    /// the engine reports `Tick::Expired` or `Tick::Inactive`. Must be called
    /// from within a tokio runtime.
    #[must_use]
    pub fn spawn(engine: SharedEngine, period: Duration) -> TickerHandle {
        let (tx, updates) = watch::channel(None);

        let task = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticks.tick().await;
                let outcome = engine.lock().await.reconcile().await;
                match outcome {
                    Ok(tick) => {
                        tx.send_replace(Some(tick));
                        if !matches!(tick, Tick::Remaining(_)) {
                            debug!(?tick, "deadline ticker stopped");
                            return Some(tick);
                        }
                    }
                    // Deadline is absolute, so the next period retries the submit.
                    Err(err) => warn!(error = %err, "reconcile failed"),
                }
            }
        });

        TickerHandle {
            task: Some(task),
            updates,
        }
    }
}

/// Owns the ticker task. Dropping the handle aborts the task.
#[derive(Debug)]
pub struct TickerHandle {
    task: Option<JoinHandle<Option<Tick>>>,
    updates: watch::Receiver<Option<Tick>>,
}

impl TickerHandle {
    /// Subscribe to tick outcomes. `None` until the first reconcile.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Tick>> {
        self.updates.clone()
    }

    /// Most recent tick outcome.
    #[must_use]
    pub fn latest(&self) -> Option<Tick> {
        *self.updates.borrow()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Abort the task now.
    pub fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Wait for the ticker to stop by itself and return its final tick.
    ///
    /// Returns `None` if the task was aborted or panicked.
    pub async fn finished(mut self) -> Option<Tick> {
        let task = self.task.take()?;
        task.await.ok().flatten()
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbt_core::bank::load_bank;
    use cbt_core::model::TestConfigDraft;
    use cbt_core::time::fixed_clock;
    use storage::repository::SessionStore;

    use crate::sessions::SessionState;

    const BANK: &str = "q,a,b,c,d,ans\nQ1,1,2,3,4,a\nQ2,1,2,3,4,b\n";

    async fn shared_running_engine() -> SharedEngine {
        let config = TestConfigDraft {
            duration_minutes: Some(1),
            ..TestConfigDraft::default()
        }
        .normalize();
        let mut engine = SessionEngine::create(config, SessionStore::in_memory(), fixed_clock())
            .await
            .unwrap();
        engine.apply_bank(load_bank(BANK)).await.unwrap();
        engine.start().await.unwrap();
        Arc::new(Mutex::new(engine))
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_submits_and_stops_at_deadline() {
        let engine = shared_running_engine().await;
        let handle = DeadlineTicker::spawn(engine.clone(), Duration::from_secs(1));

        let mut updates = handle.subscribe();
        updates.changed().await.unwrap();
        assert_eq!(*updates.borrow(), Some(Tick::Remaining(60)));

        engine
            .lock()
            .await
            .advance_clock(chrono::Duration::seconds(61));

        assert_eq!(handle.finished().await, Some(Tick::Expired));
        assert!(matches!(
            engine.lock().await.state(),
            SessionState::Completed(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_stops_when_engine_leaves_running() {
        let engine = shared_running_engine().await;
        let handle = DeadlineTicker::spawn(engine.clone(), Duration::from_secs(1));

        engine.lock().await.exit().await.unwrap();

        assert_eq!(handle.finished().await, Some(Tick::Inactive));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_aborts_task() {
        let engine = shared_running_engine().await;
        let handle = DeadlineTicker::spawn(engine.clone(), Duration::from_secs(1));
        let mut updates = handle.subscribe();
        drop(handle);

        // The sender lives inside the aborted task.
        while updates.changed().await.is_ok() {}
        assert!(matches!(
            engine.lock().await.state(),
            SessionState::Running(_)
        ));
    }
}
