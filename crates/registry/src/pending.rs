//! Deferred-resolution work queue
//!
//! Definitions that fail only because a referenced entity is not registered
//! yet are wrapped in a [`Deferred`] entry and queued here. After all
//! interfaces have had their first pass, a sweep retries each entry exactly
//! once: successes are removed, still-incomplete entries stay pending for a
//! later sweep, and the remainder is reported rather than silently dropped.
//!
//! Multiple mapping interfaces may be registered concurrently by
//! independent initializers, so the queue is mutex-guarded; the lock is
//! held for the duration of one sweep.
//!
//! Uses parking_lot::Mutex instead of std::sync::Mutex to avoid cascading
//! panics from mutex poisoning.

use parking_lot::Mutex;
use tracing::{debug, warn};

use rowbind_core::Result;

/// A retry-capable unit of deferred work
pub trait Deferred: Send {
    /// Names the deferred definition for the pending report
    fn describe(&self) -> String;

    /// Retry the definition; an `Incomplete` error keeps the entry pending,
    /// any other error is fatal
    fn resolve(&self) -> Result<()>;
}

/// Mutex-guarded pending set of deferred entries
#[derive(Default)]
pub struct PendingQueue {
    entries: Mutex<Vec<Box<dyn Deferred>>>,
}

impl PendingQueue {
    /// Empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a deferred entry for the next sweep
    pub fn push(&self, entry: Box<dyn Deferred>) {
        debug!(entry = %entry.describe(), "deferring unresolved definition");
        self.entries.lock().push(entry);
    }

    /// Number of entries still pending
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Retry every pending entry exactly once
    ///
    /// Still-incomplete entries remain queued. A fatal error aborts the
    /// sweep and propagates; the failing entry and all untried entries stay
    /// in the queue.
    pub fn retry_all(&self) -> Result<()> {
        let mut entries = self.entries.lock();
        let queued = std::mem::take(&mut *entries);
        let total = queued.len();
        let mut still_pending = Vec::new();
        let mut queued = queued.into_iter();
        for entry in queued.by_ref() {
            match entry.resolve() {
                Ok(()) => {}
                Err(err) if err.is_incomplete() => {
                    warn!(entry = %entry.describe(), %err, "definition still unresolved after sweep");
                    still_pending.push(entry);
                }
                Err(err) => {
                    still_pending.push(entry);
                    still_pending.extend(queued);
                    *entries = still_pending;
                    return Err(err);
                }
            }
        }
        debug!(
            retried = total,
            pending = still_pending.len(),
            "deferred-resolution sweep finished"
        );
        *entries = still_pending;
        Ok(())
    }

    /// Descriptions of the entries still pending, for caller-side reporting
    pub fn report(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.describe()).collect()
    }
}

impl std::fmt::Debug for PendingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingQueue")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowbind_core::{BuildError, Incomplete};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingEntry {
        name: String,
        attempts: Arc<AtomicUsize>,
        succeed_on: usize,
    }

    impl Deferred for CountingEntry {
        fn describe(&self) -> String {
            self.name.clone()
        }

        fn resolve(&self) -> Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt >= self.succeed_on {
                Ok(())
            } else {
                Err(Incomplete::ResultMap {
                    id: self.name.clone(),
                    referenced_from: "test".to_string(),
                }
                .into())
            }
        }
    }

    #[test]
    fn test_success_removes_entry() {
        let queue = PendingQueue::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        queue.push(Box::new(CountingEntry {
            name: "a".to_string(),
            attempts: attempts.clone(),
            succeed_on: 1,
        }));
        queue.retry_all().unwrap();
        assert!(queue.is_empty());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_each_entry_retried_once_per_sweep() {
        let queue = PendingQueue::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        queue.push(Box::new(CountingEntry {
            name: "b".to_string(),
            attempts: attempts.clone(),
            succeed_on: 3,
        }));

        queue.retry_all().unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(queue.report(), vec!["b".to_string()]);

        queue.retry_all().unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(queue.len(), 1);

        // third sweep succeeds and drains the queue
        queue.retry_all().unwrap();
        assert!(queue.is_empty());
    }

    struct FatalEntry;

    impl Deferred for FatalEntry {
        fn describe(&self) -> String {
            "fatal".to_string()
        }

        fn resolve(&self) -> Result<()> {
            Err(BuildError::UnresolvedCacheRef)
        }
    }

    #[test]
    fn test_fatal_error_aborts_sweep_and_keeps_entries() {
        let queue = PendingQueue::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        queue.push(Box::new(FatalEntry));
        queue.push(Box::new(CountingEntry {
            name: "untouched".to_string(),
            attempts: attempts.clone(),
            succeed_on: 1,
        }));

        let err = queue.retry_all().unwrap_err();
        assert!(!err.is_incomplete());
        // both the failing entry and the untried one survive
        assert_eq!(queue.len(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }
}
