// ── Cron scheduling ──
//
// Turns the two configured cron expressions into recurring jobs that call
// the enforcer. Expressions are standard 5-field crontab syntax; 6- and
// 7-field forms (leading seconds, trailing year) pass through untouched.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::enforcer::LimitEnforcer;
use crate::error::CoreError;
use crate::limit::Transition;

pub const RESTRICT_JOB_ID: &str = "speed-limit-restrict";
pub const RELEASE_JOB_ID: &str = "speed-limit-release";

/// crontab numbers Sunday as both 0 and 7.
const WEEKDAYS: [&str; 8] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// One recurring job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    /// Stable identifier; scheduling an id again replaces the old job.
    pub id: String,
    pub name: String,
    pub cron: String,
}

pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Something that fires callbacks on a cron schedule.
pub trait TriggerClock: Send + Sync {
    /// Register `job`, replacing any job with the same id.
    fn schedule(&self, job: JobSpec, callback: JobCallback) -> Result<(), CoreError>;

    /// Remove a job. Returns whether one was registered.
    fn unschedule(&self, id: &str) -> bool;
}

// ── Expression handling ──────────────────────────────────────────

/// Rewrite a crontab expression into the seconds-first form the `cron`
/// crate parses.
pub fn normalize_cron(expression: &str) -> Result<String, CoreError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    match fields.as_slice() {
        [minute, hour, dom, month, dow] => Ok(format!(
            "0 {minute} {hour} {dom} {month} {}",
            weekday_names(dow)
        )),
        [_, _, _, _, _, _] | [_, _, _, _, _, _, _] => Ok(fields.join(" ")),
        _ => Err(CoreError::InvalidSchedule {
            expression: expression.to_owned(),
            reason: format!("expected 5 fields, found {}", fields.len()),
        }),
    }
}

/// crontab counts weekdays from Sunday = 0 (or 7); the `cron` crate from
/// Sunday = 1. Names are unambiguous in both, so numeric days become names.
/// Numeric ranges expand to lists, since `Fri-Sun` is a backwards range in
/// the `cron` crate.
fn weekday_names(field: &str) -> String {
    field.split(',').map(weekday_part).collect::<Vec<_>>().join(",")
}

fn weekday_part(part: &str) -> String {
    let (range, step) = match part.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (part, None),
    };
    let step_by = match step.map(str::parse::<usize>) {
        None => Some(1),
        Some(Ok(n)) if n > 0 => Some(n),
        Some(_) => None,
    };
    let bounds = match range.split_once('-') {
        Some((lo, hi)) => lo.parse::<usize>().ok().zip(hi.parse::<usize>().ok()).map(|(lo, hi)| {
            // `5-0` reads as Friday through Sunday.
            (lo, if hi == 0 && lo > 0 { 7 } else { hi })
        }),
        // `5/2` means `5-7/2`.
        None if step.is_some() => range.parse::<usize>().ok().map(|lo| (lo, 7)),
        None => range.parse::<usize>().ok().map(|n| (n, n)),
    };

    match (bounds, step_by) {
        (Some((lo, hi)), Some(step_by)) if lo <= hi && hi <= 7 => {
            let mut days: Vec<&str> = Vec::new();
            for n in (lo..=hi).step_by(step_by) {
                let name = WEEKDAYS[n % 7];
                if !days.contains(&name) {
                    days.push(name);
                }
            }
            days.join(",")
        }
        _ => part.to_owned(),
    }
}

/// Parse a configured expression into a schedule.
pub fn parse_schedule(expression: &str) -> Result<Schedule, CoreError> {
    let normalized = normalize_cron(expression)?;
    Schedule::from_str(&normalized).map_err(|e| CoreError::InvalidSchedule {
        expression: expression.to_owned(),
        reason: e.to_string(),
    })
}

/// The next `count` fire times of `expression`, in local time.
pub fn next_fire_times(expression: &str, count: usize) -> Result<Vec<DateTime<Local>>, CoreError> {
    let schedule = parse_schedule(expression)?;
    Ok(fire_times_after(&schedule, &Local::now(), count))
}

fn fire_times_after<Tz: TimeZone>(
    schedule: &Schedule,
    after: &DateTime<Tz>,
    count: usize,
) -> Vec<DateTime<Tz>> {
    schedule.after(after).take(count).collect()
}

// ── CronClock ────────────────────────────────────────────────────

/// Tokio-backed `TriggerClock` firing in local time.
///
/// Each job runs on its own task. A fire missed because the previous run
/// overran is skipped, not replayed.
pub struct CronClock {
    cancel: CancellationToken,
    jobs: DashMap<String, CancellationToken>,
}

impl CronClock {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            jobs: DashMap::new(),
        }
    }

    /// Stop every job. Runs already in progress finish first.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.jobs.clear();
    }

    pub fn job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.jobs.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl Default for CronClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CronClock {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl TriggerClock for CronClock {
    fn schedule(&self, job: JobSpec, callback: JobCallback) -> Result<(), CoreError> {
        let schedule = parse_schedule(&job.cron)?;
        let token = self.cancel.child_token();
        if let Some(old) = self.jobs.insert(job.id.clone(), token.clone()) {
            old.cancel();
        }
        info!(job = %job.id, cron = %job.cron, "job scheduled");
        tokio::spawn(run_job(job, schedule, callback, token));
        Ok(())
    }

    fn unschedule(&self, id: &str) -> bool {
        match self.jobs.remove(id) {
            Some((_, token)) => {
                token.cancel();
                info!(job = id, "job removed");
                true
            }
            None => false,
        }
    }
}

async fn run_job(job: JobSpec, schedule: Schedule, callback: JobCallback, cancel: CancellationToken) {
    let mut after = Local::now();
    loop {
        let Some(next) = schedule.after(&after).next() else {
            info!(job = %job.id, "schedule has no further fire times");
            return;
        };
        let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
        debug!(job = %job.id, next = %next, "waiting for next fire");

        tokio::select! {
            () = cancel.cancelled() => {
                debug!(job = %job.id, "job cancelled");
                return;
            }
            () = tokio::time::sleep(wait) => {}
        }

        debug!(job = %job.id, name = %job.name, "job fired");
        callback().await;
        after = next.max(Local::now());
    }
}

// ── Job registration ─────────────────────────────────────────────

/// Register (or clear) the restrict/release jobs from the enforcer's
/// current settings. Returns how many jobs are active afterwards.
///
/// Jobs exist only when limiting is enabled and both expressions are
/// present. Both expressions are validated before anything is touched.
pub fn register_jobs(clock: &dyn TriggerClock, enforcer: &Arc<LimitEnforcer>) -> Result<usize, CoreError> {
    let settings = enforcer.snapshot();

    let crons = (
        settings.schedule_for(Transition::Restricted),
        settings.schedule_for(Transition::Normal),
    );
    let (true, (Some(restrict), Some(release))) = (settings.enabled, crons) else {
        clock.unschedule(RESTRICT_JOB_ID);
        clock.unschedule(RELEASE_JOB_ID);
        if settings.enabled {
            warn!("limiting is enabled but a schedule is missing; no jobs registered");
        } else {
            info!("limiting disabled; no jobs registered");
        }
        return Ok(0);
    };

    parse_schedule(restrict)?;
    parse_schedule(release)?;

    clock.schedule(
        JobSpec {
            id: RESTRICT_JOB_ID.into(),
            name: "Start speed limiting".into(),
            cron: restrict.to_owned(),
        },
        enforcement_callback(enforcer, Transition::Restricted),
    )?;
    clock.schedule(
        JobSpec {
            id: RELEASE_JOB_ID.into(),
            name: "Stop speed limiting".into(),
            cron: release.to_owned(),
        },
        enforcement_callback(enforcer, Transition::Normal),
    )?;
    Ok(2)
}

fn enforcement_callback(enforcer: &Arc<LimitEnforcer>, transition: Transition) -> JobCallback {
    let enforcer = Arc::clone(enforcer);
    Arc::new(move || {
        let enforcer = Arc::clone(&enforcer);
        Box::pin(async move {
            match enforcer.enforce(transition).await {
                Ok(result) if result.success => {
                    info!(%transition, services = result.outcomes.len(), "scheduled run complete");
                }
                Ok(result) => {
                    let failed: Vec<&str> = result.failures().map(|o| o.service.as_str()).collect();
                    warn!(%transition, ?failed, "scheduled run finished with failures");
                }
                Err(e) => error!(%transition, error = %e, "scheduled run failed"),
            }
        })
    })
}
