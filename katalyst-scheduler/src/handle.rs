use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// A live scheduled task, returned by [`crate::Scheduler::schedule_cron`] and
/// [`crate::Scheduler::schedule_fixed_delay`]. Dropping a `Handle`
/// does not cancel the underlying task — the schedule keeps running until
/// [`Handle::cancel`] is called or the task terminates itself by returning
/// `false` from its error callback.
#[derive(Clone)]
pub struct Handle {
    name: Arc<str>,
    tags: Arc<BTreeSet<String>>,
    token: CancellationToken,
    terminated: Arc<AtomicBool>,
}

impl Handle {
    pub(crate) fn new(name: Arc<str>, tags: Arc<BTreeSet<String>>, token: CancellationToken, terminated: Arc<AtomicBool>) -> Self {
        Self { name, tags, token, terminated }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Requests cancellation. The running task, if any, finishes its current
    /// execution; no further fire is scheduled afterwards.
    pub fn cancel(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.token.cancel();
    }

    /// Whether this handle is still scheduled to fire again. `false` once
    /// `cancel` has been called or the task terminated itself from its error
    /// callback.
    pub fn is_active(&self) -> bool {
        !self.terminated.load(Ordering::SeqCst) && !self.token.is_cancelled()
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub(crate) fn terminated_flag(&self) -> Arc<AtomicBool> {
        self.terminated.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_handle_is_active() {
        let handle = Handle::new(
            Arc::from("job"),
            Arc::new(BTreeSet::new()),
            CancellationToken::new(),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(handle.is_active());
    }

    #[test]
    fn cancel_marks_handle_inactive() {
        let handle = Handle::new(
            Arc::from("job"),
            Arc::new(BTreeSet::new()),
            CancellationToken::new(),
            Arc::new(AtomicBool::new(false)),
        );
        handle.cancel();
        assert!(!handle.is_active());
        assert!(handle.cancellation_token().is_cancelled());
    }
}
