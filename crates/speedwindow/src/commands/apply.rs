//! `speedwindow apply <restricted|normal>`: one enforcement cycle, now.

use tabled::Tabled;

use speedwindow_core::{EnforcementResult, ServiceOutcome, Transition};

use crate::cli::{ApplyArgs, GlobalOpts, TransitionArg};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Downloader")]
    service: String,
    #[tabled(rename = "Applied")]
    applied: String,
    #[tabled(rename = "Download")]
    download: String,
    #[tabled(rename = "Upload")]
    upload: String,
    #[tabled(rename = "Failure")]
    failure: String,
}

fn outcome_row(outcome: &ServiceOutcome, color: bool) -> OutcomeRow {
    let (download, upload) = outcome.plan.map_or_else(
        || ("-".to_owned(), "-".to_owned()),
        |p| (output::format_limit(p.download), output::format_limit(p.upload)),
    );
    OutcomeRow {
        service: outcome.service.clone(),
        applied: output::status_word(outcome.applied, "yes", "no", color),
        download,
        upload,
        failure: outcome
            .failure
            .as_ref()
            .map_or_else(String::new, ToString::to_string),
    }
}

fn detail(result: &EnforcementResult, color: bool) -> String {
    if result.outcomes.is_empty() {
        return output::muted(
            &format!("No eligible downloaders; nothing to apply for {}.", result.transition),
            color,
        );
    }
    let rows: Vec<OutcomeRow> = result
        .outcomes
        .iter()
        .map(|o| outcome_row(o, color))
        .collect();
    output::render_table(&rows)
}

pub fn to_transition(arg: TransitionArg) -> Transition {
    match arg {
        TransitionArg::Restricted => Transition::Restricted,
        TransitionArg::Normal => Transition::Normal,
    }
}

pub async fn handle(args: &ApplyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let runtime = config::build_runtime(&cfg)?;
    let transition = to_transition(args.transition);

    let result = runtime.enforcer.enforce(transition).await?;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &result,
        |r| detail(r, color),
        |r| {
            r.outcomes
                .iter()
                .map(|o| format!("{}\t{}", o.service, if o.applied { "ok" } else { "failed" }))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);

    if result.success {
        Ok(())
    } else {
        Err(CliError::Partial {
            transition: transition.to_string(),
            failed: result.failures().count(),
            total: result.outcomes.len(),
        })
    }
}
