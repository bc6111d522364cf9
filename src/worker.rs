//! Background cleanup worker
//!
//! One dedicated thread runs trim and journal rebuild jobs so they never
//! overlap each other. Requests coalesce: while a job is queued, further
//! requests are dropped.

use std::io;
use std::sync::Weak;
use std::thread;

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::error::Result;

/// Work the cleanup thread performs on its owner
pub(crate) trait Cleanup: Send + Sync + 'static {
    fn cleanup(&self) -> Result<()>;
}

/// Handle used to request a cleanup run
pub(crate) struct CleanupWorker {
    tx: Sender<()>,
}

impl CleanupWorker {
    /// Create the request channel. Start the thread with `spawn`.
    pub fn channel() -> (Self, Receiver<()>) {
        let (tx, rx) = bounded(1);
        (Self { tx }, rx)
    }

    /// Start the worker thread.
    ///
    /// The thread holds only a weak reference and exits once the owner is
    /// dropped.
    pub fn spawn<T: Cleanup>(rx: Receiver<()>, owner: Weak<T>) -> io::Result<()> {
        thread::Builder::new()
            .name("disklru-cleanup".to_string())
            .spawn(move || Self::worker_loop(rx, owner))?;
        Ok(())
    }

    /// Ask for a cleanup run; a no-op if one is already queued
    pub fn schedule(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                debug!("cleanup worker is gone, dropping request");
            }
        }
    }

    fn worker_loop<T: Cleanup>(rx: Receiver<()>, owner: Weak<T>) {
        while rx.recv().is_ok() {
            let Some(owner) = owner.upgrade() else {
                break;
            };
            if let Err(e) = owner.cleanup() {
                warn!(error = %e, "background cleanup failed");
            }
        }
        debug!("cleanup worker stopped");
    }
}
