// ── Limit enforcement ──
//
// One enforcement cycle: snapshot the settings, resolve eligible
// downloaders, then read → resolve → set on every one of them
// concurrently. Per-service failures are captured as outcomes; only a
// directory failure aborts the cycle.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::limit::{Direction, EnforcementSettings, LimitPlan, SpeedLimits, Transition};
use crate::port::{ManagedService, Notifier, ServiceDirectory};

const NOTIFY_TITLE: &str = "speedwindow: speed limits not applied";

// ── Result types ─────────────────────────────────────────────────

/// Why a single downloader did not end up with its plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum FailureReason {
    /// The live limits could not be read; nothing was sent.
    ReadFailed { message: String },
    /// A configured target is not a number; nothing was sent.
    InvalidLimitValue { direction: Direction, value: String },
    /// The downloader refused the new limits.
    RejectedByService,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadFailed { .. } => "read-failed",
            Self::InvalidLimitValue { .. } => "invalid-limit-value",
            Self::RejectedByService => "rejected-by-service",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one downloader during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceOutcome {
    pub service: String,
    pub applied: bool,
    pub failure: Option<FailureReason>,
    /// The plan that was sent, if the cycle got that far.
    pub plan: Option<LimitPlan>,
}

impl ServiceOutcome {
    fn applied(service: &str, plan: LimitPlan) -> Self {
        Self {
            service: service.to_owned(),
            applied: true,
            failure: None,
            plan: Some(plan),
        }
    }

    fn failed(service: &str, failure: FailureReason, plan: Option<LimitPlan>) -> Self {
        Self {
            service: service.to_owned(),
            applied: false,
            failure: Some(failure),
            plan,
        }
    }
}

/// Aggregated outcome of one enforcement cycle.
///
/// `success` is the logical AND of every outcome; a cycle with no eligible
/// downloaders is vacuously successful.
#[derive(Debug, Clone, Serialize)]
pub struct EnforcementResult {
    pub transition: Transition,
    pub success: bool,
    pub outcomes: Vec<ServiceOutcome>,
    /// Whether an operator notification was sent for this cycle.
    pub notified: bool,
}

impl EnforcementResult {
    fn from_outcomes(transition: Transition, outcomes: Vec<ServiceOutcome>, notified: bool) -> Self {
        Self {
            transition,
            success: outcomes.iter().all(|o| o.applied),
            outcomes,
            notified,
        }
    }

    /// Look up the outcome for a named downloader.
    pub fn outcome(&self, service: &str) -> Option<&ServiceOutcome> {
        self.outcomes.iter().find(|o| o.service == service)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ServiceOutcome> {
        self.outcomes.iter().filter(|o| !o.applied)
    }
}

// ── Plan computation ─────────────────────────────────────────────

/// Compute the limits to send to one downloader.
///
/// An enabled direction takes the transition's configured target; a
/// disabled one keeps the downloader's live value, so out-of-band changes
/// survive. Zero and negative targets are forwarded untouched.
pub fn resolve_plan(
    transition: Transition,
    settings: &EnforcementSettings,
    live: SpeedLimits,
) -> Result<LimitPlan, CoreError> {
    let download = settings
        .download
        .resolve(transition, Direction::Download, live.download)?;
    let upload = settings
        .upload
        .resolve(transition, Direction::Upload, live.upload)?;
    Ok(LimitPlan { download, upload })
}

// ── LimitEnforcer ────────────────────────────────────────────────

/// Applies transitions across every eligible downloader.
///
/// Cheap to share behind an `Arc`; concurrent `enforce` calls each work
/// from their own settings snapshot and build their own result.
pub struct LimitEnforcer {
    settings: ArcSwap<EnforcementSettings>,
    directory: Arc<dyn ServiceDirectory>,
    notifier: Arc<dyn Notifier>,
}

impl LimitEnforcer {
    pub fn new(
        settings: EnforcementSettings,
        directory: Arc<dyn ServiceDirectory>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings: ArcSwap::from_pointee(settings),
            directory,
            notifier,
        }
    }

    /// The settings the next cycle will use.
    pub fn snapshot(&self) -> Arc<EnforcementSettings> {
        self.settings.load_full()
    }

    /// Swap in new settings. Cycles already running keep their snapshot.
    pub fn reload(&self, settings: EnforcementSettings) {
        info!(services = settings.services.len(), "limiter settings reloaded");
        self.settings.store(Arc::new(settings));
    }

    /// Run one enforcement cycle for `transition`.
    ///
    /// Returns `Err` only when the directory itself fails; every
    /// per-downloader problem is reported inside the result.
    pub async fn enforce(&self, transition: Transition) -> Result<EnforcementResult, CoreError> {
        let settings = self.snapshot();

        if !settings.any_direction_enabled() {
            debug!(%transition, "upload and download limiting both disabled; nothing to do");
            return Ok(EnforcementResult::from_outcomes(transition, Vec::new(), false));
        }

        let services = self
            .directory
            .resolve_eligible(&settings.services)
            .await
            .map_err(|e| match e {
                CoreError::DirectoryResolution { .. } => e,
                other => CoreError::DirectoryResolution {
                    reason: other.to_string(),
                },
            })?;

        info!(%transition, eligible = services.len(), "applying speed limits");

        let futs = services
            .iter()
            .map(|service| apply_to_service(transition, &settings, service));
        let attempts = futures_util::future::join_all(futs).await;

        let mut invalid: Option<CoreError> = None;
        let mut invalid_services = Vec::new();
        let mut outcomes = Vec::with_capacity(attempts.len());
        for (outcome, parse_error) in attempts {
            if let Some(err) = parse_error {
                invalid_services.push(outcome.service.clone());
                invalid.get_or_insert(err);
            }
            outcomes.push(outcome);
        }

        let notified = match invalid {
            Some(err) if settings.notify => {
                self.notify_invalid(&err, &invalid_services).await;
                true
            }
            _ => false,
        };

        let result = EnforcementResult::from_outcomes(transition, outcomes, notified);
        if result.success {
            info!(%transition, applied = result.outcomes.len(), "speed limits applied");
        } else {
            warn!(
                %transition,
                failed = result.failures().count(),
                total = result.outcomes.len(),
                "speed limits applied with failures"
            );
        }
        Ok(result)
    }

    /// One message per cycle, however many downloaders hit the bad value.
    async fn notify_invalid(&self, err: &CoreError, services: &[String]) {
        let body = format!(
            "Could not set speed limits: {err}. Affected downloaders: {}.",
            services.join(", ")
        );
        if let Err(e) = self.notifier.send(NOTIFY_TITLE, &body).await {
            warn!(error = %e, "failed to deliver notification");
        }
    }
}

/// Read → resolve → set for one downloader. Never fails; the second
/// element carries a value-parse error for the aggregate notification.
async fn apply_to_service(
    transition: Transition,
    settings: &EnforcementSettings,
    service: &ManagedService,
) -> (ServiceOutcome, Option<CoreError>) {
    let name = service.name.as_str();

    let live = match service.port.get_speed_limit().await {
        Ok(live) => live,
        Err(e) => {
            warn!(service = name, error = %e, "could not read current speed limits; skipping");
            let failure = FailureReason::ReadFailed {
                message: e.to_string(),
            };
            return (ServiceOutcome::failed(name, failure, None), None);
        }
    };

    let plan = match resolve_plan(transition, settings, live) {
        Ok(plan) => plan,
        Err(err) => {
            error!(service = name, error = %err, "speed limit is not a number");
            let failure = match &err {
                CoreError::InvalidLimitValue {
                    direction, value, ..
                } => FailureReason::InvalidLimitValue {
                    direction: *direction,
                    value: value.clone(),
                },
                other => FailureReason::ReadFailed {
                    message: other.to_string(),
                },
            };
            return (ServiceOutcome::failed(name, failure, None), Some(err));
        }
    };

    debug!(
        service = name,
        download = plan.download,
        upload = plan.upload,
        live_download = live.download,
        live_upload = live.upload,
        "resolved limit plan"
    );

    if service.port.set_speed_limit(plan.download, plan.upload).await {
        info!(service = name, download = plan.download, upload = plan.upload, "limits applied");
        (ServiceOutcome::applied(name, plan), None)
    } else {
        warn!(service = name, "downloader rejected new speed limits");
        (
            ServiceOutcome::failed(name, FailureReason::RejectedByService, Some(plan)),
            None,
        )
    }
}
