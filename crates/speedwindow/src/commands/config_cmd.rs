//! Config subcommand handlers.

use std::fmt::Write as _;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking passwords.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();
    let l = &cfg.limiter;

    let _ = writeln!(out, "[limiter]");
    let _ = writeln!(out, "enabled = {}", l.enabled);
    let _ = writeln!(out, "notify = {}", l.notify);
    if let Some(ref cron) = l.restrict_cron {
        let _ = writeln!(out, "restrict_cron = \"{cron}\"");
    }
    if let Some(ref cron) = l.release_cron {
        let _ = writeln!(out, "release_cron = \"{cron}\"");
    }
    let services: Vec<String> = l.services.iter().map(|s| format!("\"{s}\"")).collect();
    let _ = writeln!(out, "services = [{}]", services.join(", "));

    let settings = cfg.to_enforcement_settings();
    for (name, dir) in [("upload", &settings.upload), ("download", &settings.download)] {
        let _ = writeln!(out);
        let _ = writeln!(out, "[limiter.{name}]");
        let _ = writeln!(out, "enabled = {}", dir.enabled);
        let _ = writeln!(out, "restricted = {}", dir.restricted);
        let _ = writeln!(out, "normal = {}", dir.normal);
    }

    for (name, d) in &cfg.downloaders {
        let _ = writeln!(out);
        let _ = writeln!(out, "[downloaders.{name}]");
        let _ = writeln!(out, "kind = \"{}\"", d.kind);
        let _ = writeln!(out, "url = \"{}\"", d.url);
        let _ = writeln!(out, "enabled = {}", d.enabled);
        if let Some(ref u) = d.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if d.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = d.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if d.insecure {
            let _ = writeln!(out, "insecure = true");
        }
        if let Some(ref ca) = d.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(timeout) = d.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    if let Some(ref url) = cfg.notify.webhook_url {
        let _ = writeln!(out);
        let _ = writeln!(out, "[notify]");
        let _ = writeln!(out, "webhook_url = \"{url}\"");
    }

    out.trim_end().to_owned()
}

/// Copy of `cfg` with plaintext passwords masked, for structured output.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for d in cfg.downloaders.values_mut() {
        if d.password.is_some() {
            d.password = Some("****".into());
        }
    }
    cfg
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        ConfigCommand::Show => {
            let cfg = redacted(&config::load(global)?);
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                config::resolve_path(global).display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::resolve_path(global).display().to_string(), false);
            Ok(())
        }

        ConfigCommand::SetPassword { downloader } => {
            let cfg = config::load(global)?;
            if cfg.downloader(downloader).is_err() {
                return Err(CliError::UnknownDownloader {
                    name: downloader.clone(),
                    path: config::resolve_path(global).display().to_string(),
                });
            }

            let password = rpassword::prompt_password(format!("Password for {downloader}: "))
                .map_err(|e| CliError::Validation {
                    field: "password".into(),
                    reason: format!("prompt failed: {e}"),
                })?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            config::store_password(downloader, &password)?;
            if !global.quiet {
                eprintln!("✓ Password stored in system keyring for '{downloader}'");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use speedwindow_config::DownloaderProfile;
    use speedwindow_core::ServiceKind;

    use super::*;

    #[test]
    fn passwords_never_appear_in_show_output() {
        let mut cfg = Config::default();
        cfg.downloaders.insert(
            "qb".into(),
            DownloaderProfile {
                kind: ServiceKind::Qbittorrent,
                url: "http://localhost:8080".into(),
                enabled: true,
                username: Some("admin".into()),
                password: Some("hunter2".into()),
                password_env: None,
                insecure: false,
                ca_cert: None,
                timeout: None,
            },
        );
        let text = format_config_redacted(&redacted(&cfg));
        assert!(!text.contains("hunter2"));
        assert!(text.contains("[downloaders.qb]"));
        assert!(text.contains("password = \"****\""));
    }
}
