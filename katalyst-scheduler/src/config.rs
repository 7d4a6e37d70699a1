use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;

pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Why a scheduled run didn't end in success, passed to the error callback
/// ("error callback receives the task name, the failure cause and
/// the current consecutive-failure count"). Keeping this as a concrete enum
/// rather than a generic `dyn Error` plus a side-channel boolean lets a
/// caller distinguish "my task returned an error" from "a run was skipped
/// because the previous one was still active" with an ordinary `match`
/// instead of downcasting.
#[derive(Debug)]
pub enum TaskFailure {
    /// The previous run of this task was still active when the next fire
    /// instant arrived; this run was skipped entirely and the task closure
    /// was never invoked. The consecutive-failure counter does not advance
    /// for an overlap.
    Overlap,
    /// The run was still in progress when `max_execution_time` elapsed.
    Timeout,
    /// The task closure returned this error.
    Application(TaskError),
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskFailure::Overlap => write!(f, "previous run still active, this fire was skipped"),
            TaskFailure::Timeout => write!(f, "run exceeded its max execution time"),
            TaskFailure::Application(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for TaskFailure {}

pub type SuccessCallback = Arc<dyn Fn(&str, Duration) + Send + Sync>;
/// Returns `false` to have the handle cancel itself instead of scheduling
/// another run ("a scheduled task may terminate its own handle
/// from within the error callback").
pub type ErrorCallback = Arc<dyn Fn(&str, &TaskFailure, u32) -> bool + Send + Sync>;

/// Per-handle settings `name` must be unique within a
/// [`crate::Scheduler`]; `tags` are free-form labels surfaced through
/// [`crate::Scheduler::jobs`] for introspection and bulk cancellation.
#[derive(Clone)]
pub struct ScheduleConfig {
    pub name: String,
    pub tags: BTreeSet<String>,
    /// Delay before the schedule is evaluated for the first time. Only
    /// consulted by `schedule_cron`; `schedule_fixed_delay` takes its
    /// initial delay as an explicit argument instead.
    pub initial_delay: Duration,
    pub max_execution_time: Option<Duration>,
    pub on_success: Option<SuccessCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl ScheduleConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeSet::new(),
            initial_delay: Duration::ZERO,
            max_execution_time: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_execution_time(mut self, budget: Duration) -> Self {
        self.max_execution_time = Some(budget);
        self
    }

    pub fn with_on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn with_on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &TaskFailure, u32) -> bool + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

/// The civil-time zone a cron schedule's calendar arithmetic (month lengths,
/// leap days, weekday boundaries) is evaluated in Represented
/// as a fixed UTC offset rather than an IANA zone name: the workspace has no
/// tz-database crate, and a fixed offset is enough to give a schedule a
/// stable, known local civil time without fabricating a dependency the
/// teacher stack never carries (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleZone(pub FixedOffset);

impl Default for ScheduleZone {
    fn default() -> Self {
        Self(FixedOffset::east_opt(0).expect("UTC offset is always valid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_set_expected_fields() {
        let cfg = ScheduleConfig::new("nightly-report")
            .with_tag("reporting")
            .with_tag("nightly")
            .with_initial_delay(Duration::from_secs(5))
            .with_max_execution_time(Duration::from_secs(60));

        assert_eq!(cfg.name, "nightly-report");
        assert!(cfg.tags.contains("reporting"));
        assert!(cfg.tags.contains("nightly"));
        assert_eq!(cfg.initial_delay, Duration::from_secs(5));
        assert_eq!(cfg.max_execution_time, Some(Duration::from_secs(60)));
    }

    #[test]
    fn default_zone_is_utc() {
        assert_eq!(ScheduleZone::default().0.local_minus_utc(), 0);
    }
}
