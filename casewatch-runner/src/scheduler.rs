//! Background refresh scheduler.
//!
//! One named thread runs a cycle immediately, then one per interval, until
//! stopped. Failures are logged and the next tick tries again. The stop
//! signal is an `mpsc` channel so a sleeping scheduler wakes up at once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use crate::coordinator::{RefreshCoordinator, RefreshReport};

/// Handle on a running scheduler thread.
///
/// Dropping the handle stops the scheduler and waits for the current cycle
/// to finish.
pub struct SchedulerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl SchedulerHandle {
    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Signal the thread to stop and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Wait for the thread to exit on its own (tick limit reached).
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the scheduler. `max_ticks` of `None` runs until stopped.
pub fn spawn_scheduler(
    coordinator: Arc<RefreshCoordinator>,
    interval: Duration,
    max_ticks: Option<u64>,
) -> std::io::Result<SchedulerHandle> {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let ticks = Arc::new(AtomicU64::new(0));
    let thread_ticks = Arc::clone(&ticks);

    let thread = thread::Builder::new()
        .name("casewatch-scheduler".into())
        .spawn(move || {
            info!(interval_secs = interval.as_secs(), "scheduler started");
            loop {
                run_tick(&coordinator);
                let done = thread_ticks.fetch_add(1, Ordering::SeqCst) + 1;
                if max_ticks.is_some_and(|max| done >= max) {
                    break;
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!(ticks = thread_ticks.load(Ordering::SeqCst), "scheduler stopped");
        })?;

    Ok(SchedulerHandle {
        stop: Some(stop_tx),
        thread: Some(thread),
        ticks,
    })
}

fn run_tick(coordinator: &RefreshCoordinator) {
    match coordinator.refresh() {
        Ok(RefreshReport::Published {
            generation,
            attempts,
        }) => info!(generation, attempts, "scheduled refresh published"),
        Ok(RefreshReport::Coalesced) => info!("scheduled refresh coalesced"),
        Err(e) => error!(error = %e, "scheduled refresh failed, will retry next tick"),
    }
}
