use thiserror::Error;

/// Top-level error type for the `speedwindow-api` crate.
///
/// Covers every failure mode of the qBittorrent Web API and the webhook
/// transport. `speedwindow-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (qBittorrent answers `Fails.` with HTTP 200).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The SID cookie is missing or no longer valid (HTTP 403 on an API call).
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    /// Too many failed logins; qBittorrent bans the client IP for a while.
    #[error("Client IP is banned after too many failed login attempts")]
    Banned,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success HTTP status from an endpoint.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body could not be parsed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}
