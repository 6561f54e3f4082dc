//! `speedwindow status`: live limits of every configured downloader.

use tabled::Tabled;

use speedwindow_core::ServiceStatus;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Downloader")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Managed")]
    managed: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Download")]
    download: String,
    #[tabled(rename = "Upload")]
    upload: String,
    #[tabled(rename = "Note")]
    note: String,
}

fn status_row(s: &ServiceStatus, color: bool) -> StatusRow {
    let (download, upload) = s.limits.map_or_else(
        || ("-".to_owned(), "-".to_owned()),
        |l| (output::format_limit(l.download), output::format_limit(l.upload)),
    );
    StatusRow {
        name: s.name.clone(),
        kind: s.kind.to_string(),
        managed: if s.managed { "yes".into() } else { output::muted("no", color) },
        active: output::status_word(s.active, "yes", "no", color),
        version: s.version.clone().unwrap_or_else(|| "-".into()),
        download,
        upload,
        note: s.error.clone().unwrap_or_default(),
    }
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let runtime = config::build_runtime(&cfg)?;
    let managed = runtime.enforcer.snapshot().services.clone();

    let statuses = runtime.directory.inspect(&managed).await;
    if statuses.is_empty() && !global.quiet {
        eprintln!("No downloaders configured in {}", config::resolve_path(global).display());
        return Ok(());
    }

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &statuses,
        |s| status_row(s, color),
        |s| s.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
