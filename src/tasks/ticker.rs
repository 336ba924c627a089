//! Periodic Ticker
//!
//! Background task that runs a unit of work at a fixed interval until aborted.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::duration_ms;

/// Spawns a background task that invokes `tick` once per `interval`.
///
/// The task sleeps first, so the first tick happens one full interval after
/// spawning. It runs until the returned handle is aborted; components keep the
/// handle and abort it from their `destroy`.
///
/// # Example
/// ```ignore
/// let handle = spawn_ticker("cache-sweep", Duration::from_secs(60), move || {
///     let store = store.clone();
///     async move { store.write().await.sweep(); }
/// });
/// // Later, during teardown:
/// handle.abort();
/// ```
pub fn spawn_ticker<F, Fut>(
    label: impl Into<String>,
    interval: Duration,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let label = label.into();

    tokio::spawn(async move {
        info!(
            task = %label,
            interval_ms = duration_ms(interval),
            "Starting background task"
        );

        loop {
            tokio::time::sleep(interval).await;
            tick().await;
        }
    })
}
