//! Cancellable periodic auto-save task.
//!
//! # Invariants
//! - A stopped task never runs its tick again.
//! - Stopping joins the timer thread, so no tick is in flight afterwards.
//! - Every running task is listed in an `AutoSaveRegistry` so a storage-root
//!   switch can suspend all of them at once.

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Registry of live auto-save tasks bound to the current store generation.
#[derive(Clone, Default)]
pub struct AutoSaveRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    cancels: Mutex<HashMap<u64, Sender<()>>>,
    next_id: AtomicU64,
}

impl AutoSaveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels every registered task and returns how many were signalled.
    ///
    /// Tasks exit at their next wake-up; their owners still join on stop.
    pub fn suspend_all(&self) -> usize {
        let drained = self.inner.cancels.lock().drain().collect::<Vec<_>>();
        for (_, cancel) in &drained {
            let _ = cancel.send(());
        }
        if !drained.is_empty() {
            info!(
                "event=autosave_suspend module=session status=ok tasks={}",
                drained.len()
            );
        }
        drained.len()
    }

    pub fn active_count(&self) -> usize {
        self.inner.cancels.lock().len()
    }

    fn register(&self, cancel: Sender<()>) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.cancels.lock().insert(id, cancel);
        id
    }

    fn unregister(&self, id: u64) {
        self.inner.cancels.lock().remove(&id);
    }
}

/// Handle to one running timer thread.
pub struct AutoSaveTask {
    id: u64,
    cancel: Sender<()>,
    registry: AutoSaveRegistry,
    handle: Option<JoinHandle<()>>,
}

impl AutoSaveTask {
    /// Starts calling `tick` every `interval` until stopped.
    ///
    /// A zero interval falls back to the 30 second default.
    pub fn start(
        registry: &AutoSaveRegistry,
        interval: Duration,
        mut tick: impl FnMut() + Send + 'static,
    ) -> std::io::Result<Self> {
        let interval = if interval.is_zero() {
            DEFAULT_AUTO_SAVE_INTERVAL
        } else {
            interval
        };
        let (cancel, cancelled) = mpsc::channel::<()>();
        let id = registry.register(cancel.clone());

        let spawned = thread::Builder::new()
            .name(format!("stickynotes-autosave-{id}"))
            .spawn(move || loop {
                match cancelled.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                registry.unregister(id);
                return Err(err);
            }
        };

        debug!(
            "event=autosave_start module=session status=ok task={} interval_ms={}",
            id,
            interval.as_millis()
        );
        Ok(Self {
            id,
            cancel,
            registry: registry.clone(),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Cancels the timer and waits for the thread to exit.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.registry.unregister(self.id);
        let _ = self.cancel.send(());
        if handle.join().is_err() {
            warn!(
                "event=autosave_stop module=session status=error task={} error_code=tick_panicked",
                self.id
            );
            return;
        }
        debug!("event=autosave_stop module=session status=ok task={}", self.id);
    }
}

impl Drop for AutoSaveTask {
    fn drop(&mut self) {
        self.stop();
    }
}
