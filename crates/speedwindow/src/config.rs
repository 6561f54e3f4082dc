//! CLI configuration: a thin layer over `speedwindow_config` that honours
//! `--config` and wires the runtime objects the commands share.

use std::path::PathBuf;
use std::sync::Arc;

use speedwindow_api::{TransportConfig, WebhookClient};
use speedwindow_core::{ClientDirectory, LimitEnforcer, LogNotifier, Notifier, WebhookNotifier};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use speedwindow_config::{Config, load_config_from, store_password};

/// `--config` if given, otherwise the platform config path.
pub fn resolve_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(speedwindow_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config_from(&resolve_path(global))?)
}

/// The enforcer and the directory behind it, built from one config.
pub struct Runtime {
    pub directory: Arc<ClientDirectory>,
    pub enforcer: Arc<LimitEnforcer>,
}

pub fn build_runtime(cfg: &Config) -> Result<Runtime, CliError> {
    let directory = Arc::new(ClientDirectory::new(cfg.to_downloader_configs()?));
    let notifier = build_notifier(cfg)?;
    let enforcer = Arc::new(LimitEnforcer::new(
        cfg.to_enforcement_settings(),
        Arc::<ClientDirectory>::clone(&directory),
        notifier,
    ));
    Ok(Runtime {
        directory,
        enforcer,
    })
}

fn build_notifier(cfg: &Config) -> Result<Arc<dyn Notifier>, CliError> {
    let Some(ref raw) = cfg.notify.webhook_url else {
        return Ok(Arc::new(LogNotifier));
    };
    let url: url::Url = raw.parse().map_err(|_| CliError::Validation {
        field: "notify.webhook_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    let client = WebhookClient::new(url, &TransportConfig::default())
        .map_err(speedwindow_core::CoreError::from)?;
    Ok(Arc::new(WebhookNotifier::new(client)))
}
