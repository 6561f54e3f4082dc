// ── Runtime downloader configuration ──
//
// These types describe *how* to reach a download client. They carry
// credential data and connection tuning, but never touch disk. The host
// constructs `DownloaderConfig`s and hands them to the directory.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

/// The download-client family behind a configured service.
///
/// Only qBittorrent exposes the limit endpoints the enforcer drives; other
/// kinds may be configured (and shared with other tooling) but are never
/// eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceKind {
    Qbittorrent,
    Transmission,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed WebUI certificates).
    DangerAcceptInvalid,
}

/// Connection settings for one named download client.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Unique name, matched against the limiter's managed service set.
    pub name: String,
    pub kind: ServiceKind,
    /// Whether the operator has this downloader switched on at all.
    pub enabled: bool,
    /// WebUI root, e.g. `http://192.168.1.10:8080`.
    pub url: Url,
    /// `None` when the WebUI bypasses auth for the caller's subnet.
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub tls: TlsVerification,
    /// Bound on every single remote call.
    pub timeout: Duration,
}
