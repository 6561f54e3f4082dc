//! Configuration for speedwindow.
//!
//! TOML file + `SPEEDWINDOW_` environment layering, downloader credential
//! resolution (env + keyring + plaintext), and translation into the
//! runtime types `speedwindow-core` consumes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use speedwindow_core::{
    DirectionLimitConfig, DownloaderConfig, EnforcementSettings, LimitValue, ServiceKind,
    TlsVerification,
};

/// Keyring service name; entries are keyed `{downloader}/password`.
pub const KEYRING_SERVICE: &str = "speedwindow";

const ENV_PREFIX: &str = "SPEEDWINDOW_";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for downloader '{downloader}'")]
    NoCredentials { downloader: String },

    #[error("unknown downloader '{0}'")]
    UnknownDownloader(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub limiter: LimiterSection,

    /// Named download clients.
    #[serde(default)]
    pub downloaders: BTreeMap<String, DownloaderProfile>,

    #[serde(default)]
    pub notify: NotifySection,
}

/// `[limiter]`: the schedule and the limits it switches between.
///
/// The flat `pause_*`/`resume_*`/`enable_*` keys are accepted for
/// configurations carried over from the MoviePilot plugin. "pause" is the
/// normal state and "resume" the restricted one. When present they win over
/// the nested `[limiter.upload]`/`[limiter.download]` tables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimiterSection {
    #[serde(default)]
    pub enabled: bool,

    /// Send a notification when a configured limit is not a number.
    #[serde(default = "default_true")]
    pub notify: bool,

    /// Crontab expression that enters the restricted window.
    #[serde(default, alias = "resume_cron", skip_serializing_if = "Option::is_none")]
    pub restrict_cron: Option<String>,

    /// Crontab expression that returns to normal limits.
    #[serde(default, alias = "pause_cron", skip_serializing_if = "Option::is_none")]
    pub release_cron: Option<String>,

    /// Downloader names this limiter manages.
    #[serde(default, alias = "downloaders", skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_upload_limit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_upload_limit: Option<LimitValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_upload_limit: Option<LimitValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_download_limit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_download_limit: Option<LimitValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_download_limit: Option<LimitValue>,

    #[serde(default)]
    pub upload: DirectionLimitConfig,

    #[serde(default)]
    pub download: DirectionLimitConfig,
}

impl Default for LimiterSection {
    fn default() -> Self {
        Self {
            enabled: false,
            notify: true,
            restrict_cron: None,
            release_cron: None,
            services: Vec::new(),
            upload: DirectionLimitConfig::default(),
            download: DirectionLimitConfig::default(),
            enable_upload_limit: None,
            pause_upload_limit: None,
            resume_upload_limit: None,
            enable_download_limit: None,
            pause_download_limit: None,
            resume_download_limit: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A named download client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderProfile {
    #[serde(default = "default_kind")]
    pub kind: ServiceKind,

    /// WebUI root URL (e.g., "http://192.168.1.10:8080").
    pub url: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Plaintext password (prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub insecure: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

fn default_kind() -> ServiceKind {
    ServiceKind::Qbittorrent
}

/// `[notify]`: where operator notifications go. Logged when unset.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct NotifySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "speedwindow", "speedwindow").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("speedwindow");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file yields the
/// defaults (limiting disabled).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credentials ─────────────────────────────────────────────────────

/// Resolve a downloader password.
///
/// `Ok(None)` when the profile has no username (the WebUI lets the host
/// in without a login). Otherwise: `password_env` → keyring → plaintext.
pub fn resolve_password(
    profile: &DownloaderProfile,
    name: &str,
) -> Result<Option<SecretString>, ConfigError> {
    if profile.username.is_none() {
        return Ok(None);
    }

    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(Some(SecretString::from(val)));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(name)) {
        if let Ok(secret) = entry.get_password() {
            return Ok(Some(SecretString::from(secret)));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(Some(SecretString::from(pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        downloader: name.into(),
    })
}

/// Store a downloader password in the system keyring.
pub fn store_password(name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(name))?;
    entry.set_password(password)?;
    Ok(())
}

fn keyring_user(name: &str) -> String {
    format!("{name}/password")
}

// ── Translation to runtime types ────────────────────────────────────

impl Config {
    /// The enforcement snapshot for `LimitEnforcer`.
    pub fn to_enforcement_settings(&self) -> EnforcementSettings {
        let l = &self.limiter;

        let mut upload = l.upload.clone();
        apply_flat(
            &mut upload,
            l.enable_upload_limit,
            l.resume_upload_limit.as_ref(),
            l.pause_upload_limit.as_ref(),
        );
        let mut download = l.download.clone();
        apply_flat(
            &mut download,
            l.enable_download_limit,
            l.resume_download_limit.as_ref(),
            l.pause_download_limit.as_ref(),
        );

        EnforcementSettings {
            enabled: l.enabled,
            notify: l.notify,
            restrict_cron: l.restrict_cron.clone(),
            release_cron: l.release_cron.clone(),
            upload,
            download,
            services: l.services.iter().cloned().collect(),
        }
    }

    /// Every configured downloader as a `DownloaderConfig`.
    pub fn to_downloader_configs(&self) -> Result<Vec<DownloaderConfig>, ConfigError> {
        self.downloaders
            .iter()
            .map(|(name, profile)| profile_to_downloader_config(profile, name))
            .collect()
    }

    /// Managed names with no matching `[downloaders.*]` entry.
    pub fn unknown_services(&self) -> BTreeSet<&str> {
        self.limiter
            .services
            .iter()
            .filter(|s| !self.downloaders.contains_key(*s))
            .map(String::as_str)
            .collect()
    }

    pub fn downloader(&self, name: &str) -> Result<&DownloaderProfile, ConfigError> {
        self.downloaders
            .get(name)
            .ok_or_else(|| ConfigError::UnknownDownloader(name.into()))
    }
}

fn apply_flat(
    cfg: &mut DirectionLimitConfig,
    enabled: Option<bool>,
    restricted: Option<&LimitValue>,
    normal: Option<&LimitValue>,
) {
    if let Some(enabled) = enabled {
        cfg.enabled = enabled;
    }
    if let Some(v) = restricted {
        cfg.restricted = v.clone();
    }
    if let Some(v) = normal {
        cfg.normal = v.clone();
    }
}

/// Build a `DownloaderConfig` from a profile, resolving its password.
pub fn profile_to_downloader_config(
    profile: &DownloaderProfile,
    name: &str,
) -> Result<DownloaderConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: format!("downloaders.{name}.url"),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let tls = if profile.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let password = resolve_password(profile, name)?;

    Ok(DownloaderConfig {
        name: name.to_owned(),
        kind: profile.kind,
        enabled: profile.enabled,
        url,
        username: profile.username.clone(),
        password,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_disabled_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(!cfg.limiter.enabled);
        assert!(cfg.limiter.notify);
        assert!(cfg.downloaders.is_empty());
    }

    #[test]
    fn nested_limiter_tables_load() {
        let file = write_config(
            r#"
            [limiter]
            enabled = true
            restrict_cron = "0 18 * * *"
            release_cron = "0 23 * * *"
            services = ["home"]

            [limiter.download]
            enabled = true
            restricted = 100
            normal = 0

            [downloaders.home]
            url = "http://192.168.1.10:8080"
            "#,
        );
        let cfg = load_config_from(file.path()).unwrap();
        let settings = cfg.to_enforcement_settings();

        assert!(settings.enabled);
        assert_eq!(settings.restrict_cron.as_deref(), Some("0 18 * * *"));
        assert!(settings.download.enabled);
        assert_eq!(settings.download.restricted, LimitValue::Integer(100));
        assert!(!settings.upload.enabled);
        assert_eq!(settings.services.iter().collect::<Vec<_>>(), vec!["home"]);
        assert_eq!(cfg.downloaders["home"].kind, ServiceKind::Qbittorrent);
    }

    #[test]
    fn plugin_style_keys_are_accepted() {
        let file = write_config(
            r#"
            [limiter]
            enabled = true
            notify = false
            pause_cron = "0 7 * * *"
            resume_cron = "0 19 * * *"
            downloaders = ["qb"]
            enable_upload_limit = true
            pause_upload_limit = 0
            resume_upload_limit = "512"
            "#,
        );
        let settings = load_config_from(file.path()).unwrap().to_enforcement_settings();

        assert!(!settings.notify);
        assert_eq!(settings.release_cron.as_deref(), Some("0 7 * * *"));
        assert_eq!(settings.restrict_cron.as_deref(), Some("0 19 * * *"));
        assert!(settings.upload.enabled);
        assert_eq!(settings.upload.restricted, LimitValue::Text("512".into()));
        assert_eq!(settings.upload.normal, LimitValue::Integer(0));
        assert!(settings.services.contains("qb"));
    }

    #[test]
    fn non_numeric_limits_survive_loading() {
        let file = write_config(
            r#"
            [limiter.upload]
            enabled = true
            restricted = "fast"
            "#,
        );
        let settings = load_config_from(file.path()).unwrap().to_enforcement_settings();
        assert_eq!(settings.upload.restricted, LimitValue::Text("fast".into()));
    }

    #[test]
    fn downloader_profiles_translate_tls_and_timeout() {
        let file = write_config(
            r#"
            [downloaders.a]
            url = "https://seedbox.example:8443"
            insecure = true
            timeout = 3

            [downloaders.b]
            kind = "transmission"
            url = "http://10.0.0.2:9091"
            ca_cert = "/etc/ssl/ca.pem"
            enabled = false
            "#,
        );
        let configs = load_config_from(file.path())
            .unwrap()
            .to_downloader_configs()
            .unwrap();

        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].name, "a");
        assert_eq!(configs[0].tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(configs[0].timeout, Duration::from_secs(3));
        assert!(configs[0].password.is_none());
        assert_eq!(configs[1].kind, ServiceKind::Transmission);
        assert!(!configs[1].enabled);
        assert_eq!(
            configs[1].tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/ssl/ca.pem"))
        );
        assert_eq!(configs[1].timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn plaintext_password_is_the_last_resort() {
        let profile = DownloaderProfile {
            kind: ServiceKind::Qbittorrent,
            url: "http://localhost:8080".into(),
            enabled: true,
            username: Some("admin".into()),
            password: Some("hunter2".into()),
            password_env: None,
            insecure: false,
            ca_cert: None,
            timeout: None,
        };
        let secret = resolve_password(&profile, "speedwindow-test-plaintext")
            .unwrap()
            .unwrap();
        assert_eq!(secret.expose_secret(), "hunter2");
    }

    #[test]
    fn invalid_url_names_the_field() {
        let mut cfg = Config::default();
        cfg.downloaders.insert(
            "bad".into(),
            DownloaderProfile {
                kind: ServiceKind::Qbittorrent,
                url: "not a url".into(),
                enabled: true,
                username: None,
                password: None,
                password_env: None,
                insecure: false,
                ca_cert: None,
                timeout: None,
            },
        );
        let err = cfg.to_downloader_configs().unwrap_err();
        assert!(err.to_string().contains("downloaders.bad.url"));
    }

    #[test]
    fn unknown_services_are_reported() {
        let mut cfg = Config::default();
        cfg.limiter.services = vec!["known".into(), "ghost".into()];
        cfg.downloaders.insert(
            "known".into(),
            DownloaderProfile {
                kind: ServiceKind::Qbittorrent,
                url: "http://localhost:8080".into(),
                enabled: true,
                username: None,
                password: None,
                password_env: None,
                insecure: false,
                ca_cert: None,
                timeout: None,
            },
        );
        assert_eq!(cfg.unknown_services().into_iter().collect::<Vec<_>>(), vec!["ghost"]);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.limiter.enabled = true;
        cfg.limiter.restrict_cron = Some("0 18 * * *".into());
        cfg.limiter.upload.enabled = true;
        cfg.limiter.upload.restricted = LimitValue::Integer(64);

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert!(loaded.limiter.enabled);
        assert_eq!(loaded.limiter.restrict_cron.as_deref(), Some("0 18 * * *"));
        assert_eq!(loaded.limiter.upload.restricted, LimitValue::Integer(64));
    }
}
