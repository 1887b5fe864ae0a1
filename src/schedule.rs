//! Weekly refresh trigger.
//!
//! The job runs once immediately, then at a fixed weekday and local time,
//! indefinitely. Due-checks poll on a fixed interval; only one run is ever
//! active because the loop itself blocks on the job.

use std::thread;
use std::time::Duration;

use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime, Weekday};
use tracing::info;

/// Fixed weekday/time trigger with a polling interval.
#[derive(Clone, Debug)]
pub struct WeeklySchedule {
    /// Weekday the job fires on.
    pub weekday: Weekday,
    /// Local wall-clock time the job fires at.
    pub at: NaiveTime,
    /// Sleep between due-checks.
    pub poll_interval: Duration,
}

impl WeeklySchedule {
    /// Create a schedule with the default 60 s poll interval.
    pub fn new(weekday: Weekday, at: NaiveTime) -> Self {
        Self {
            weekday,
            at,
            poll_interval: Duration::from_secs(60),
        }
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Next occurrence of `weekday` at `at` strictly after `now`.
pub fn next_run_after(now: NaiveDateTime, weekday: Weekday, at: NaiveTime) -> NaiveDateTime {
    let days_ahead = (weekday.num_days_from_monday() as i64
        - now.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    let mut candidate = now.date().and_time(at) + ChronoDuration::days(days_ahead);
    if candidate <= now {
        candidate += ChronoDuration::days(7);
    }
    candidate
}

/// Run `job` once now, then on every scheduled occurrence, forever.
pub fn run_weekly(schedule: &WeeklySchedule, mut job: impl FnMut()) {
    job();
    let mut next = next_run_after(Local::now().naive_local(), schedule.weekday, schedule.at);
    info!("[petdata:schedule] next refresh at {next}");
    loop {
        thread::sleep(schedule.poll_interval);
        let now = Local::now().naive_local();
        if now >= next {
            job();
            next = next_run_after(now, schedule.weekday, schedule.at);
            info!("[petdata:schedule] next refresh at {next}");
        }
    }
}
