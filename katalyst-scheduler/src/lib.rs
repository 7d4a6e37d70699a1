//! Cron and fixed-delay task scheduler for the Katalyst runtime.
//!
//! [`Scheduler::schedule_cron`] and [`Scheduler::schedule_fixed_delay`]
//! return a [`Handle`] that cancels cooperatively via
//! [`tokio_util::sync::CancellationToken`]. Each handle runs its own
//! fire-and-sleep loop; a fire is skipped rather than overlapped with a
//! still-running previous execution, and the skip is reported through the
//! configured error callback as [`TaskFailure::Overlap`].

mod config;
mod cron;
mod handle;
mod scheduler;

pub use config::{ErrorCallback, ScheduleConfig, ScheduleZone, SuccessCallback, TaskError, TaskFailure};
pub use cron::{CronError, CronSchedule};
pub use handle::Handle;
pub use scheduler::{JobInfo, Scheduler, SchedulerError, SchedulerFixedDelayBuilder};
