//! `speedwindow check`: validate the config and preview the schedule.

use std::fmt::Write as _;

use serde::Serialize;

use speedwindow_core::{
    Direction, EnforcementSettings, RELEASE_JOB_ID, RESTRICT_JOB_ID, Transition, next_fire_times,
};

use crate::cli::{CheckArgs, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct CheckReport {
    config_path: String,
    enabled: bool,
    managed: Vec<String>,
    jobs: Vec<JobPreview>,
    warnings: Vec<String>,
    problems: Vec<String>,
}

#[derive(Debug, Serialize)]
struct JobPreview {
    id: &'static str,
    transition: Transition,
    cron: Option<String>,
    next: Vec<String>,
}

fn build_report(cfg: &Config, config_path: String, count: usize) -> CheckReport {
    let settings = cfg.to_enforcement_settings();
    let mut report = CheckReport {
        config_path,
        enabled: settings.enabled,
        managed: settings.services.iter().cloned().collect(),
        jobs: Vec::new(),
        warnings: Vec::new(),
        problems: Vec::new(),
    };

    if let Err(e) = cfg.to_downloader_configs() {
        report.problems.push(e.to_string());
    }
    for name in cfg.unknown_services() {
        report
            .warnings
            .push(format!("managed downloader '{name}' has no [downloaders.{name}] entry"));
    }
    if !settings.enabled {
        report
            .warnings
            .push("limiter.enabled is false; `run` will not schedule anything".into());
    }
    if !settings.any_direction_enabled() {
        report
            .warnings
            .push("neither upload nor download limiting is enabled".into());
    }

    for (id, transition) in [
        (RESTRICT_JOB_ID, Transition::Restricted),
        (RELEASE_JOB_ID, Transition::Normal),
    ] {
        report.jobs.push(preview_job(&settings, id, transition, count, &mut report.problems));
    }

    check_limit_values(&settings, &mut report.problems);
    report
}

fn preview_job(
    settings: &EnforcementSettings,
    id: &'static str,
    transition: Transition,
    count: usize,
    problems: &mut Vec<String>,
) -> JobPreview {
    let cron = settings.schedule_for(transition);
    let mut next = Vec::new();
    match cron {
        Some(expr) => match next_fire_times(expr, count) {
            Ok(times) => {
                next = times
                    .iter()
                    .map(|t| t.format("%a %Y-%m-%d %H:%M:%S %:z").to_string())
                    .collect();
            }
            Err(e) => problems.push(e.to_string()),
        },
        None if settings.enabled => {
            problems.push(format!("no cron expression configured for the {transition} job"));
        }
        None => {}
    }
    JobPreview {
        id,
        transition,
        cron: cron.map(str::to_owned),
        next,
    }
}

fn check_limit_values(settings: &EnforcementSettings, problems: &mut Vec<String>) {
    for direction in [Direction::Upload, Direction::Download] {
        let cfg = settings.direction(direction);
        if !cfg.enabled {
            continue;
        }
        for transition in [Transition::Restricted, Transition::Normal] {
            let value = cfg.target(transition);
            if let Err(reason) = value.parse() {
                problems.push(format!(
                    "limiter.{direction}.{transition} = {:?} is not a number: {reason}",
                    value.to_string()
                ));
            }
        }
    }
}

fn detail(report: &CheckReport, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Config:   {}", report.config_path);
    let _ = writeln!(
        out,
        "Enabled:  {}",
        output::status_word(report.enabled, "yes", "no", color)
    );
    let managed = if report.managed.is_empty() {
        output::muted("(none)", color)
    } else {
        report.managed.join(", ")
    };
    let _ = writeln!(out, "Managed:  {managed}");

    for job in &report.jobs {
        let _ = writeln!(out);
        let cron = job.cron.as_deref().unwrap_or("(not set)");
        let _ = writeln!(out, "{} ({}): {cron}", job.id, job.transition);
        for t in &job.next {
            let _ = writeln!(out, "  next: {t}");
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out);
        for w in &report.warnings {
            let _ = writeln!(out, "{} {w}", output::status_word(false, "", "warning:", color));
        }
    }
    if !report.problems.is_empty() {
        let _ = writeln!(out);
        for p in &report.problems {
            let _ = writeln!(out, "{} {p}", output::status_word(false, "", "error:", color));
        }
    }
    out.trim_end().to_owned()
}

pub fn handle(args: &CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::resolve_path(global);
    let cfg = config::load(global)?;
    let report = build_report(&cfg, path.display().to_string(), args.count);

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(r, color),
        |r| r.problems.join("\n"),
    )?;
    output::print_output(&out, global.quiet);

    if report.problems.is_empty() {
        Ok(())
    } else {
        Err(CliError::CheckFailed {
            count: report.problems.len(),
            path: report.config_path,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use speedwindow_core::LimitValue;

    use super::*;

    fn enabled_config() -> Config {
        let mut cfg = Config::default();
        cfg.limiter.enabled = true;
        cfg.limiter.restrict_cron = Some("0 18 * * *".into());
        cfg.limiter.release_cron = Some("0 23 * * *".into());
        cfg.limiter.download.enabled = true;
        cfg.limiter.download.restricted = LimitValue::Integer(100);
        cfg
    }

    #[test]
    fn valid_config_has_no_problems() {
        let report = build_report(&enabled_config(), "cfg.toml".into(), 2);
        assert!(report.problems.is_empty(), "{:?}", report.problems);
        assert_eq!(report.jobs.len(), 2);
        assert!(report.jobs.iter().all(|j| j.next.len() == 2));
    }

    #[test]
    fn missing_cron_is_a_problem_when_enabled() {
        let mut cfg = enabled_config();
        cfg.limiter.release_cron = None;
        let report = build_report(&cfg, "cfg.toml".into(), 1);
        assert_eq!(report.problems.len(), 1);
        assert!(report.problems[0].contains("normal"));
    }

    #[test]
    fn malformed_values_and_crons_are_reported() {
        let mut cfg = enabled_config();
        cfg.limiter.restrict_cron = Some("every evening".into());
        cfg.limiter.download.normal = LimitValue::Text("full".into());
        let report = build_report(&cfg, "cfg.toml".into(), 1);
        assert_eq!(report.problems.len(), 2);
        assert!(report.problems.iter().any(|p| p.contains("limiter.download.normal")));
    }

    #[test]
    fn disabled_limiter_only_warns() {
        let report = build_report(&Config::default(), "cfg.toml".into(), 1);
        assert!(report.problems.is_empty());
        assert!(!report.warnings.is_empty());
    }
}
