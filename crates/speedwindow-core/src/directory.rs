// ── Downloader directory ──
//
// Maps configured downloader names onto live qBittorrent sessions. The
// directory owns one cached client per downloader so the session cookie
// survives between cycles; `reload` drops the cache wholesale.

use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;
use secrecy::SecretString;
use serde::Serialize;
use speedwindow_api::{QbitClient, TlsMode, TransferLimits, TransportConfig};
use tracing::{debug, info, warn};

use crate::config::{DownloaderConfig, ServiceKind, TlsVerification};
use crate::error::CoreError;
use crate::limit::SpeedLimits;
use crate::port::{LimitPort, ManagedService, ServiceDirectory};

// ── QbitLimitPort ────────────────────────────────────────────────

/// `LimitPort` backed by a qBittorrent WebUI session.
///
/// Logs in lazily: the first request that comes back 403 triggers a login
/// and a single retry.
pub struct QbitLimitPort {
    name: String,
    client: QbitClient,
    username: Option<String>,
    password: Option<SecretString>,
}

impl QbitLimitPort {
    pub fn new(config: &DownloaderConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.timeout,
            cookie_jar: None,
        };
        let client = QbitClient::new(config.url.clone(), &transport)?;
        Ok(Self {
            name: config.name.clone(),
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Confirm the WebUI answers with a valid session, logging in if needed.
    /// Returns the reported application version.
    pub async fn ensure_session(&self) -> Result<String, CoreError> {
        match self.client.version().await {
            Ok(version) => Ok(version),
            Err(e) if e.is_auth_expired() => {
                self.login().await?;
                Ok(self.client.version().await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn login(&self) -> Result<(), CoreError> {
        let (Some(username), Some(password)) = (&self.username, &self.password) else {
            return Err(CoreError::AuthenticationFailed {
                message: format!("{} requires a login but has no credentials configured", self.name),
            });
        };
        debug!(service = %self.name, "logging in");
        self.client.login(username, password).await?;
        Ok(())
    }

    async fn read_limits(&self) -> Result<TransferLimits, CoreError> {
        match self.client.transfer_limits().await {
            Err(e) if e.is_auth_expired() => {
                self.login().await?;
                Ok(self.client.transfer_limits().await?)
            }
            other => Ok(other?),
        }
    }

    async fn write_limits(&self, limits: TransferLimits) -> Result<(), CoreError> {
        match self.client.set_transfer_limits(limits).await {
            Err(e) if e.is_auth_expired() => {
                self.login().await?;
                Ok(self.client.set_transfer_limits(limits).await?)
            }
            other => Ok(other?),
        }
    }
}

#[async_trait]
impl LimitPort for QbitLimitPort {
    async fn get_speed_limit(&self) -> Result<SpeedLimits, CoreError> {
        let limits = self
            .read_limits()
            .await
            .map_err(|e| CoreError::ReadFailed {
                service: self.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(SpeedLimits {
            download: limits.download_kib,
            upload: limits.upload_kib,
        })
    }

    async fn set_speed_limit(&self, download: i64, upload: i64) -> bool {
        let limits = TransferLimits {
            download_kib: download,
            upload_kib: upload,
        };
        match self.write_limits(limits).await {
            Ok(()) => true,
            Err(e) => {
                warn!(service = %self.name, error = %e, "setting speed limits failed");
                false
            }
        }
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

// ── ServiceStatus ────────────────────────────────────────────────

/// One row of `inspect` output.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub kind: ServiceKind,
    /// Listed in the limiter's managed set.
    pub managed: bool,
    /// Reachable with a valid session right now.
    pub active: bool,
    pub version: Option<String>,
    pub limits: Option<SpeedLimits>,
    pub error: Option<String>,
}

// ── ClientDirectory ──────────────────────────────────────────────

/// `ServiceDirectory` over the configured downloaders.
pub struct ClientDirectory {
    downloaders: ArcSwap<Vec<DownloaderConfig>>,
    ports: DashMap<String, Arc<QbitLimitPort>>,
}

impl ClientDirectory {
    pub fn new(downloaders: Vec<DownloaderConfig>) -> Self {
        Self {
            downloaders: ArcSwap::from_pointee(downloaders),
            ports: DashMap::new(),
        }
    }

    /// Replace the downloader list. Cached sessions are discarded.
    pub fn reload(&self, downloaders: Vec<DownloaderConfig>) {
        self.downloaders.store(Arc::new(downloaders));
        self.ports.clear();
        debug!("downloader directory reloaded");
    }

    pub fn downloaders(&self) -> Arc<Vec<DownloaderConfig>> {
        self.downloaders.load_full()
    }

    fn port_for(&self, config: &DownloaderConfig) -> Result<Arc<QbitLimitPort>, CoreError> {
        if let Some(port) = self.ports.get(&config.name) {
            return Ok(Arc::clone(port.value()));
        }
        let port = Arc::new(QbitLimitPort::new(config)?);
        self.ports.insert(config.name.clone(), Arc::clone(&port));
        Ok(port)
    }

    /// Status of every configured downloader, managed or not.
    pub async fn inspect(&self, managed: &BTreeSet<String>) -> Vec<ServiceStatus> {
        let downloaders = self.downloaders();
        let futs = downloaders.iter().map(|cfg| self.inspect_one(cfg, managed.contains(&cfg.name)));
        futures_util::future::join_all(futs).await
    }

    async fn inspect_one(&self, cfg: &DownloaderConfig, managed: bool) -> ServiceStatus {
        let mut status = ServiceStatus {
            name: cfg.name.clone(),
            kind: cfg.kind,
            managed,
            active: false,
            version: None,
            limits: None,
            error: None,
        };

        if !cfg.enabled {
            status.error = Some("disabled".into());
            return status;
        }
        if cfg.kind != ServiceKind::Qbittorrent {
            status.error = Some(format!("{} does not support speed limiting", cfg.kind));
            return status;
        }

        let port = match self.port_for(cfg) {
            Ok(port) => port,
            Err(e) => {
                status.error = Some(e.to_string());
                return status;
            }
        };
        match port.ensure_session().await {
            Ok(version) => {
                status.active = true;
                status.version = Some(version);
            }
            Err(e) => {
                status.error = Some(e.to_string());
                return status;
            }
        }
        match port.get_speed_limit().await {
            Ok(limits) => status.limits = Some(limits),
            Err(e) => status.error = Some(e.to_string()),
        }
        status
    }
}

#[async_trait]
impl ServiceDirectory for ClientDirectory {
    async fn resolve_eligible(
        &self,
        names: &BTreeSet<String>,
    ) -> Result<Vec<ManagedService>, CoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let downloaders = self.downloaders();
        for name in names {
            if !downloaders.iter().any(|d| &d.name == name) {
                warn!(service = %name, "managed downloader is not configured");
            }
        }

        let mut candidates = Vec::new();
        for cfg in downloaders.iter().filter(|d| names.contains(&d.name)) {
            if !cfg.enabled {
                debug!(service = %cfg.name, "downloader disabled; skipping");
                continue;
            }
            if cfg.kind != ServiceKind::Qbittorrent {
                debug!(service = %cfg.name, kind = %cfg.kind, "downloader kind has no speed limits; skipping");
                continue;
            }
            match self.port_for(cfg) {
                Ok(port) => candidates.push((cfg.kind, port)),
                Err(e) => {
                    warn!(service = %cfg.name, error = %e, "downloader client could not be built; skipping");
                }
            }
        }

        let probes = candidates.iter().map(|(_, port)| port.ensure_session());
        let results = futures_util::future::join_all(probes).await;

        let mut eligible = Vec::with_capacity(candidates.len());
        for ((kind, port), probe) in candidates.into_iter().zip(results) {
            match probe {
                Ok(version) => {
                    debug!(service = port.name(), %version, "downloader active");
                    eligible.push(ManagedService {
                        name: port.name().to_owned(),
                        kind,
                        port,
                    });
                }
                Err(e) => {
                    warn!(service = port.name(), error = %e, "downloader not reachable; skipping");
                }
            }
        }

        info!(requested = names.len(), eligible = eligible.len(), "resolved managed downloaders");
        Ok(eligible)
    }
}
