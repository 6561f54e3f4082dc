//! `speedwindow run`: the scheduler daemon.
//!
//! Registers the restrict/release jobs on a `CronClock` and waits for
//! Ctrl-C. On unix, SIGHUP re-reads the config file, swaps the new
//! settings and downloader list in, and re-registers the jobs.

use std::path::Path;

use tracing::{error, info, warn};

use speedwindow_core::{CronClock, Transition, parse_schedule, register_jobs};

use crate::cli::GlobalOpts;
use crate::config::{self, Runtime};
use crate::error::CliError;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::resolve_path(global);
    let cfg = config::load(global)?;
    let runtime = config::build_runtime(&cfg)?;

    let clock = CronClock::new();
    let jobs = register_jobs(&clock, &runtime.enforcer)?;
    if jobs == 0 {
        warn!("no jobs registered; edit the config and send SIGHUP to start limiting");
    }
    info!(config = %path.display(), jobs, "speedwindow running");

    wait_for_signals(&path, &runtime, &clock).await?;

    info!("shutting down");
    clock.shutdown();
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signals(path: &Path, runtime: &Runtime, clock: &CronClock) -> Result<(), CliError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                return Ok(());
            }
            _ = hangup.recv() => reload(path, runtime, clock),
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signals(_path: &Path, _runtime: &Runtime, _clock: &CronClock) -> Result<(), CliError> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}

/// Apply a fresh config. A broken file leaves the running setup untouched.
#[cfg_attr(not(unix), allow(dead_code))]
fn reload(path: &Path, runtime: &Runtime, clock: &CronClock) {
    info!(config = %path.display(), "reloading configuration");

    let cfg = match config::load_config_from(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "reload failed; keeping current configuration");
            return;
        }
    };
    let downloaders = match cfg.to_downloader_configs() {
        Ok(d) => d,
        Err(e) => {
            error!(error = %e, "reload failed; keeping current configuration");
            return;
        }
    };
    let settings = cfg.to_enforcement_settings();
    for transition in [Transition::Restricted, Transition::Normal] {
        let Some(expr) = settings.schedule_for(transition) else {
            continue;
        };
        if let Err(e) = parse_schedule(expr) {
            error!(error = %e, "reload failed; keeping current configuration");
            return;
        }
    }

    runtime.directory.reload(downloaders);
    runtime.enforcer.reload(settings);
    match register_jobs(clock, &runtime.enforcer) {
        Ok(jobs) => info!(jobs, "configuration reloaded"),
        Err(e) => error!(error = %e, "could not register jobs after reload"),
    }
}
