// Download handles.
// Caller-facing view of an in-flight fetch: status, completion observers, and async waiting.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::error::{DownloadError, TransportError};

/// Final result of a download, shared by every holder of the handle.
pub type Outcome<T> = Arc<Result<T, DownloadError>>;

type SuccessObserver<T> = Box<dyn FnOnce(&T) + Send>;
type FailureObserver = Box<dyn FnOnce(&DownloadError) + Send>;

/// Lifecycle of a download.
///
/// Metadata and image fetches go straight from `Pending` to a terminal state; binary
/// downloads pass through `Fetching` and `Committing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Pending,
    Fetching {
        temp_path: PathBuf,
        bytes_received: u64,
        total_bytes: Option<u64>,
    },
    Committing,
    Succeeded,
    Failed,
}

impl DownloadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Succeeded | DownloadStatus::Failed)
    }
}

struct Observers<T> {
    on_success: Vec<SuccessObserver<T>>,
    on_failure: Vec<FailureObserver>,
    outcome: Option<Outcome<T>>,
}

struct Shared<T> {
    observers: Mutex<Observers<T>>,
    /// Held while observers run, so no two observers of a handle overlap.
    dispatch: Mutex<()>,
    status: watch::Sender<DownloadStatus>,
}

impl<T> Shared<T> {
    // A panicking observer must not wedge the handle for everyone else.
    fn observers(&self) -> MutexGuard<'_, Observers<T>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self) -> MutexGuard<'_, ()> {
        self.dispatch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to an in-flight download.
///
/// Every observer runs exactly once: when the download completes, or immediately if it
/// already has. Observers run on whichever thread completes the download (or, for late
/// registrations, the registering thread); callers needing a particular thread must
/// marshal the result themselves. Observers of one handle never run concurrently with
/// each other. An observer may query the handle it belongs to but must not register
/// further observers on it.
///
/// There is no cancellation: once issued, a download runs to success or failure.
pub struct DownloadHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for DownloadHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for DownloadHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("status", &*self.shared.status.borrow())
            .finish()
    }
}

impl<T> DownloadHandle<T> {
    /// Create a pending handle together with the completion side that resolves it.
    pub(crate) fn pending() -> (Self, Completion<T>) {
        let (status, _) = watch::channel(DownloadStatus::Pending);
        let shared = Arc::new(Shared {
            observers: Mutex::new(Observers {
                on_success: Vec::new(),
                on_failure: Vec::new(),
                outcome: None,
            }),
            dispatch: Mutex::new(()),
            status,
        });
        let completion = Completion {
            shared: Arc::clone(&shared),
            completed: false,
        };
        (Self { shared }, completion)
    }

    /// Register an observer for success.
    pub fn on_success(&self, observer: impl FnOnce(&T) + Send + 'static) -> &Self {
        let outcome = {
            let mut observers = self.shared.observers();
            match observers.outcome.clone() {
                None => {
                    observers.on_success.push(Box::new(observer));
                    return self;
                }
                Some(outcome) => outcome,
            }
        };
        let _dispatch = self.shared.dispatch();
        if let Ok(value) = outcome.as_ref() {
            observer(value);
        }
        self
    }

    /// Register an observer for failure.
    pub fn on_failure(&self, observer: impl FnOnce(&DownloadError) + Send + 'static) -> &Self {
        let outcome = {
            let mut observers = self.shared.observers();
            match observers.outcome.clone() {
                None => {
                    observers.on_failure.push(Box::new(observer));
                    return self;
                }
                Some(outcome) => outcome,
            }
        };
        let _dispatch = self.shared.dispatch();
        if let Err(error) = outcome.as_ref() {
            observer(error);
        }
        self
    }

    /// Current status.
    pub fn status(&self) -> DownloadStatus {
        self.shared.status.borrow().clone()
    }

    /// Receiver that observes every status change.
    pub fn watch_status(&self) -> watch::Receiver<DownloadStatus> {
        self.shared.status.subscribe()
    }

    pub fn is_done(&self) -> bool {
        self.shared.observers().outcome.is_some()
    }

    /// Final result, if the download has finished.
    pub fn outcome(&self) -> Option<Outcome<T>> {
        self.shared.observers().outcome.clone()
    }

    /// Wait for the download to finish.
    pub async fn wait(&self) -> Outcome<T> {
        let mut status = self.shared.status.subscribe();
        loop {
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            // The sender lives in `shared`, which this handle keeps alive, so this
            // only returns once a terminal status has been published.
            let _ = status.wait_for(DownloadStatus::is_terminal).await;
        }
    }
}

/// Resolving side of a [`DownloadHandle`], owned by the task doing the work.
///
/// Dropping it without calling [`complete`](Self::complete) fails the download, so
/// observers are notified even if the task dies early.
pub(crate) struct Completion<T> {
    shared: Arc<Shared<T>>,
    completed: bool,
}

impl<T> Completion<T> {
    pub(crate) fn set_status(&self, status: DownloadStatus) {
        self.shared.status.send_replace(status);
    }

    /// Update the byte count of a `Fetching` status in place.
    pub(crate) fn record_progress(&self, bytes_received: u64) {
        self.shared.status.send_modify(|status| {
            if let DownloadStatus::Fetching {
                bytes_received: received,
                ..
            } = status
            {
                *received = bytes_received;
            }
        });
    }

    /// Resolve the handle and run its observers.
    pub(crate) fn complete(mut self, result: Result<T, DownloadError>) {
        self.resolve(result);
    }

    fn resolve(&mut self, result: Result<T, DownloadError>) {
        if self.completed {
            return;
        }
        self.completed = true;

        let _dispatch = self.shared.dispatch();
        let outcome = Arc::new(result);
        let (on_success, on_failure) = {
            let mut observers = self.shared.observers();
            if observers.outcome.is_some() {
                return;
            }
            observers.outcome = Some(Arc::clone(&outcome));
            (
                std::mem::take(&mut observers.on_success),
                std::mem::take(&mut observers.on_failure),
            )
        };

        let terminal = if outcome.is_ok() {
            DownloadStatus::Succeeded
        } else {
            DownloadStatus::Failed
        };
        self.shared.status.send_replace(terminal);

        match outcome.as_ref() {
            Ok(value) => on_success.into_iter().for_each(|observer| observer(value)),
            Err(error) => on_failure.into_iter().for_each(|observer| observer(error)),
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if !self.completed {
            self.resolve(Err(DownloadError::Transport(TransportError::new(
                None,
                "download task ended without a result",
            ))));
        }
    }
}
