//! Scheduled speed-limit enforcement between `speedwindow-api` and the host.
//!
//! This crate owns the business logic of speedwindow:
//!
//! - **[`LimitEnforcer`]**: Computes a [`LimitPlan`] per eligible service for
//!   one [`Transition`] and applies it across all of them, collecting one
//!   [`ServiceOutcome`] per service into an [`EnforcementResult`]. Reads a
//!   settings snapshot once per cycle, so configuration reloads never race an
//!   in-flight cycle.
//!
//! - **Ports** ([`ServiceDirectory`], [`LimitPort`], [`Notifier`],
//!   [`TriggerClock`]): the seams to the outside world. The engine only
//!   talks to these traits; tests drive it with in-memory fakes.
//!
//! - **[`ClientDirectory`]**: The production directory: one
//!   [`QbitLimitPort`] per configured qBittorrent WebUI, probed every cycle to
//!   decide whether it is active.
//!
//! - **[`CronClock`]** and [`register_jobs`]: cron-driven firing of the two
//!   named jobs that move services into and out of the restricted window.

pub mod config;
pub mod directory;
pub mod enforcer;
pub mod error;
pub mod limit;
pub mod notify;
pub mod port;
pub mod schedule;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DownloaderConfig, ServiceKind, TlsVerification};
pub use directory::{ClientDirectory, QbitLimitPort, ServiceStatus};
pub use enforcer::{
    EnforcementResult, FailureReason, LimitEnforcer, ServiceOutcome, resolve_plan,
};
pub use error::CoreError;
pub use limit::{
    Direction, DirectionLimitConfig, EnforcementSettings, LimitPlan, LimitValue, SpeedLimits,
    Transition,
};
pub use notify::{LogNotifier, WebhookNotifier};
pub use port::{LimitPort, ManagedService, Notifier, ServiceDirectory};
pub use schedule::{
    CronClock, JobCallback, JobSpec, RELEASE_JOB_ID, RESTRICT_JOB_ID, TriggerClock, next_fire_times,
    normalize_cron, parse_schedule, register_jobs,
};
