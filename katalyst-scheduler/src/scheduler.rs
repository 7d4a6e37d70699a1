use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant as TokioInstant;
use tokio_util::sync::CancellationToken;

use crate::config::{ScheduleConfig, ScheduleZone, TaskError, TaskFailure};
use crate::cron::{CronError, CronSchedule};
use crate::handle::Handle;

#[derive(Debug)]
pub enum SchedulerError {
    /// Task names are unique within a scheduler.
    DuplicateTaskName(String),
    InvalidCron(CronError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::DuplicateTaskName(name) => write!(f, "task name already scheduled: {name}"),
            SchedulerError::InvalidCron(err) => write!(f, "invalid cron expression: {err}"),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<CronError> for SchedulerError {
    fn from(err: CronError) -> Self {
        SchedulerError::InvalidCron(err)
    }
}

/// A snapshot of a registered task, for introspection.
#[derive(Debug, Clone)]
pub struct JobInfo {
    pub name: String,
    pub tags: BTreeSet<String>,
    pub trigger: String,
    pub active: bool,
    pub consecutive_failures: u32,
}

enum Trigger {
    Cron(CronSchedule),
    FixedDelay(Duration),
}

impl Trigger {
    fn describe(&self) -> String {
        match self {
            Trigger::Cron(schedule) => format!("cron({})", schedule.source()),
            Trigger::FixedDelay(delay) => format!("fixed-delay({delay:?})"),
        }
    }
}

struct JobRecord {
    tags: BTreeSet<String>,
    trigger_desc: String,
    handle: Handle,
    consecutive_failures: Arc<AtomicU32>,
}

/// Dispatches cron and fixed-delay tasks on the Tokio runtime. Each
/// registered handle runs its own fire-and-sleep loop as a spawned task
/// (one `tokio::spawn` loop per schedule) rather than a single shared
/// priority-queue loop: the two are observationally equivalent here because
/// every handle's next-fire computation, overlap tracking and failure
/// counter are already independent per handle, and a shared loop would still
/// need that same per-handle state. A task never overlaps with itself
/// (skip-and-record); distinct handles always run concurrently.
pub struct Scheduler {
    zone: ScheduleZone,
    jobs: Arc<Mutex<HashMap<String, JobRecord>>>,
    root_token: CancellationToken,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_zone(ScheduleZone::default())
    }

    pub fn with_zone(zone: ScheduleZone) -> Self {
        Self {
            zone,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            root_token: CancellationToken::new(),
        }
    }

    pub fn schedule_cron<F, Fut>(&self, cfg: ScheduleConfig, cron_expr: &str, task: F) -> Result<Handle, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let schedule = CronSchedule::parse(cron_expr)?;
        let initial_delay = cfg.initial_delay;
        let zone = self.zone;
        self.register(cfg, Trigger::Cron(schedule.clone()), initial_delay, task, move |after| {
            schedule.next_after(&after.with_timezone(&zone.0), &zone.0).map(|dt| dt.with_timezone(&Utc))
        })
    }

    /// Two-step registration (`schedule_fixed_delay(cfg, ...).run(task)`):
    /// the name-uniqueness check only happens once `task` is supplied, in
    /// [`SchedulerFixedDelayBuilder::run`], matching `schedule_cron`'s
    /// single-call shape without requiring `task`'s type to be named here.
    pub fn schedule_fixed_delay<F, Fut>(
        &self,
        cfg: ScheduleConfig,
        initial_delay: Duration,
        delay: Duration,
    ) -> SchedulerFixedDelayBuilder<F, Fut>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        SchedulerFixedDelayBuilder {
            scheduler: self.clone_handles(),
            cfg,
            initial_delay,
            delay,
            _marker: std::marker::PhantomData,
        }
    }

    /// Snapshot of every currently-registered task, most recently registered
    /// last.
    pub fn jobs(&self) -> Vec<JobInfo> {
        let jobs = self.jobs.lock().unwrap();
        jobs.values()
            .map(|record| JobInfo {
                name: record.handle.name().to_string(),
                tags: record.tags.clone(),
                trigger: record.trigger_desc.clone(),
                active: record.handle.is_active(),
                consecutive_failures: record.consecutive_failures.load(Ordering::SeqCst),
            })
            .collect()
    }

    /// Cancels every registered handle. The scheduler itself keeps working
    /// afterwards — new tasks may still be registered.
    pub fn shutdown(&self) {
        let jobs = self.jobs.lock().unwrap();
        for record in jobs.values() {
            record.handle.cancel();
        }
    }

    fn clone_handles(&self) -> SchedulerHandles {
        SchedulerHandles {
            zone: self.zone,
            jobs: self.jobs.clone(),
            root_token: self.root_token.clone(),
        }
    }

    fn register<F, Fut>(
        &self,
        cfg: ScheduleConfig,
        trigger: Trigger,
        initial_delay: Duration,
        task: F,
        next_fire: impl Fn(chrono::DateTime<Utc>) -> Result<chrono::DateTime<Utc>, CronError> + Send + Sync + 'static,
    ) -> Result<Handle, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&cfg.name) {
            return Err(SchedulerError::DuplicateTaskName(cfg.name));
        }

        let name: Arc<str> = Arc::from(cfg.name.as_str());
        let tags = Arc::new(cfg.tags.clone());
        let token = self.root_token.child_token();
        let terminated = Arc::new(AtomicBool::new(false));
        let handle = Handle::new(name.clone(), tags.clone(), token.clone(), terminated.clone());
        let consecutive_failures = Arc::new(AtomicU32::new(0));

        jobs.insert(
            cfg.name.clone(),
            JobRecord {
                tags: cfg.tags.clone(),
                trigger_desc: trigger.describe(),
                handle: handle.clone(),
                consecutive_failures: consecutive_failures.clone(),
            },
        );
        drop(jobs);

        spawn_fire_loop(RunnerArgs {
            name,
            max_execution_time: cfg.max_execution_time,
            on_success: cfg.on_success,
            on_error: cfg.on_error,
            token,
            terminated,
            consecutive_failures,
            initial_delay,
            task,
            next_fire,
        });

        Ok(handle)
    }
}

impl Clone for Scheduler {
    fn clone(&self) -> Self {
        self.clone_handles().into_scheduler()
    }
}

struct SchedulerHandles {
    zone: ScheduleZone,
    jobs: Arc<Mutex<HashMap<String, JobRecord>>>,
    root_token: CancellationToken,
}

impl SchedulerHandles {
    fn into_scheduler(self) -> Scheduler {
        Scheduler { zone: self.zone, jobs: self.jobs, root_token: self.root_token }
    }
}

/// Deferred registration for `schedule_fixed_delay`, so the name-uniqueness
/// check and spawn both happen from [`Scheduler::register`] the same way
/// `schedule_cron` does.
pub struct SchedulerFixedDelayBuilder<F, Fut> {
    scheduler: SchedulerHandles,
    cfg: ScheduleConfig,
    initial_delay: Duration,
    delay: Duration,
    _marker: std::marker::PhantomData<(F, Fut)>,
}

impl<F, Fut> SchedulerFixedDelayBuilder<F, Fut>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    pub fn run(self, task: F) -> Result<Handle, SchedulerError> {
        let scheduler = self.scheduler.into_scheduler();
        let delay = self.delay;
        scheduler.register(self.cfg, Trigger::FixedDelay(delay), self.initial_delay, task, move |after| {
            Ok(after + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero()))
        })
    }
}

struct RunnerArgs<F, NF> {
    name: Arc<str>,
    max_execution_time: Option<Duration>,
    on_success: Option<crate::config::SuccessCallback>,
    on_error: Option<crate::config::ErrorCallback>,
    token: CancellationToken,
    terminated: Arc<AtomicBool>,
    consecutive_failures: Arc<AtomicU32>,
    initial_delay: Duration,
    task: F,
    next_fire: NF,
}

fn spawn_fire_loop<F, Fut, NF>(args: RunnerArgs<F, NF>)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    NF: Fn(chrono::DateTime<Utc>) -> Result<chrono::DateTime<Utc>, CronError> + Send + Sync + 'static,
{
    let RunnerArgs {
        name,
        max_execution_time,
        on_success,
        on_error,
        token,
        terminated,
        consecutive_failures,
        initial_delay,
        task,
        next_fire,
    } = args;

    let running = Arc::new(AtomicBool::new(false));

    tokio::spawn(async move {
        if !initial_delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(initial_delay) => {}
                _ = token.cancelled() => return,
            }
        }

        loop {
            if terminated.load(Ordering::SeqCst) {
                return;
            }

            let now = Utc::now();
            let fire_at = match next_fire(now) {
                Ok(instant) => instant,
                Err(err) => {
                    tracing::error!(task = %name, %err, "scheduler could not compute next fire instant, stopping");
                    terminated.store(true, Ordering::SeqCst);
                    return;
                }
            };

            let sleep_for = (fire_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                _ = tokio::time::sleep_until(TokioInstant::now() + sleep_for) => {}
                _ = token.cancelled() => return,
            }

            if terminated.load(Ordering::SeqCst) {
                return;
            }

            if running.swap(true, Ordering::SeqCst) {
                if let Some(cb) = &on_error {
                    let keep_going = cb(&name, &TaskFailure::Overlap, consecutive_failures.load(Ordering::SeqCst));
                    if !keep_going {
                        terminated.store(true, Ordering::SeqCst);
                        return;
                    }
                } else {
                    tracing::warn!(task = %name, "skipped fire: previous run still active");
                }
                continue;
            }

            let task_fut = task();
            let name2 = name.clone();
            let running2 = running.clone();
            let consecutive2 = consecutive_failures.clone();
            let terminated2 = terminated.clone();
            let on_success2 = on_success.clone();
            let on_error2 = on_error.clone();

            tokio::spawn(async move {
                let start = TokioInstant::now();
                let result = match max_execution_time {
                    Some(budget) => match tokio::time::timeout(budget, task_fut).await {
                        Ok(inner) => inner.map_err(TaskFailure::Application),
                        Err(_) => Err(TaskFailure::Timeout),
                    },
                    None => task_fut.await.map_err(TaskFailure::Application),
                };
                running2.store(false, Ordering::SeqCst);

                match result {
                    Ok(()) => {
                        consecutive2.store(0, Ordering::SeqCst);
                        if let Some(cb) = &on_success2 {
                            cb(&name2, start.elapsed());
                        }
                    }
                    Err(failure) => {
                        let count = consecutive2.fetch_add(1, Ordering::SeqCst) + 1;
                        let keep_going = match &on_error2 {
                            Some(cb) => cb(&name2, &failure, count),
                            None => {
                                tracing::error!(task = %name2, %failure, consecutive_failures = count, "scheduled task failed");
                                true
                            }
                        };
                        if !keep_going {
                            terminated2.store(true, Ordering::SeqCst);
                        }
                    }
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;

    fn boxed_err(msg: &str) -> TaskError {
        msg.into()
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_task_runs_repeatedly() {
        let scheduler = Scheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let runs2 = runs.clone();

        let _handle = scheduler
            .schedule_fixed_delay(ScheduleConfig::new("ticker"), Duration::ZERO, Duration::from_millis(10))
            .run(move || {
                let runs = runs2.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        tokio::time::advance(Duration::from_millis(35)).await;
        tokio::task::yield_now().await;
        assert!(runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_handle_stops_firing() {
        let scheduler = Scheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let runs2 = runs.clone();

        let handle = scheduler
            .schedule_fixed_delay(ScheduleConfig::new("cancel-me"), Duration::ZERO, Duration::from_millis(10))
            .run(move || {
                let runs = runs2.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        tokio::time::advance(Duration::from_millis(15)).await;
        tokio::task::yield_now().await;
        handle.cancel();
        let seen_before_cancel = runs.load(Ordering::SeqCst);

        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), seen_before_cancel);
        assert!(!handle.is_active());
    }

    #[tokio::test]
    async fn duplicate_task_name_is_rejected() {
        let scheduler = Scheduler::new();
        scheduler
            .schedule_fixed_delay(ScheduleConfig::new("only-one"), Duration::ZERO, Duration::from_secs(60))
            .run(|| async { Ok(()) })
            .unwrap();

        let err = scheduler
            .schedule_fixed_delay(ScheduleConfig::new("only-one"), Duration::ZERO, Duration::from_secs(60))
            .run(|| async { Ok(()) })
            .unwrap_err();

        assert!(matches!(err, SchedulerError::DuplicateTaskName(name) if name == "only-one"));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_fire_is_skipped_and_does_not_advance_failure_counter() {
        let scheduler = Scheduler::new();
        let overlaps = Arc::new(AtomicUsize::new(0));
        let overlaps2 = overlaps.clone();

        let cfg = ScheduleConfig::new("slow-task").with_on_error(move |_name, failure, count| {
            if matches!(failure, TaskFailure::Overlap) {
                overlaps2.fetch_add(1, Ordering::SeqCst);
                assert_eq!(count, 0, "overlap must not advance the failure counter");
            }
            true
        });

        let _handle = scheduler
            .schedule_fixed_delay(cfg, Duration::ZERO, Duration::from_millis(10))
            .run(|| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            })
            .unwrap();

        tokio::time::advance(Duration::from_millis(25)).await;
        tokio::task::yield_now().await;
        assert!(overlaps.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_surfaces_as_timeout_failure() {
        let scheduler = Scheduler::new();
        let saw_timeout = Arc::new(AtomicBool::new(false));
        let saw_timeout2 = saw_timeout.clone();

        let cfg = ScheduleConfig::new("too-slow")
            .with_max_execution_time(Duration::from_millis(5))
            .with_on_error(move |_name, failure, _count| {
                if matches!(failure, TaskFailure::Timeout) {
                    saw_timeout2.store(true, Ordering::SeqCst);
                }
                false
            });

        let _handle = scheduler
            .schedule_fixed_delay(cfg, Duration::ZERO, Duration::from_millis(10))
            .run(|| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(())
            })
            .unwrap();

        tokio::time::advance(Duration::from_millis(20)).await;
        tokio::task::yield_now().await;
        assert!(saw_timeout.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn application_error_increments_consecutive_failure_count() {
        let scheduler = Scheduler::new();
        let last_count = Arc::new(AtomicUsize::new(0));
        let last_count2 = last_count.clone();

        let cfg = ScheduleConfig::new("flaky").with_on_error(move |_name, _failure, count| {
            last_count2.store(count as usize, Ordering::SeqCst);
            count < 2
        });

        let handle = scheduler
            .schedule_fixed_delay(cfg, Duration::ZERO, Duration::from_millis(5))
            .run(move || async { Err(boxed_err("boom")) })
            .unwrap();

        for _ in 0..50 {
            if !handle.is_active() {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
        assert_eq!(last_count.load(Ordering::SeqCst), 2);
        assert!(!handle.is_active());
    }

    #[tokio::test]
    async fn jobs_reports_registered_tasks() {
        let scheduler = Scheduler::new();
        scheduler
            .schedule_fixed_delay(ScheduleConfig::new("reported").with_tag("demo"), Duration::ZERO, Duration::from_secs(60))
            .run(|| async { Ok(()) })
            .unwrap();

        let jobs = scheduler.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "reported");
        assert!(jobs[0].tags.contains("demo"));
        assert!(jobs[0].active);
    }
}
