// ── Core error types ──
//
// Domain errors from speedwindow-core. Consumers never see HTTP status
// codes or body parse failures directly; the `From<speedwindow_api::Error>`
// impl translates transport-layer errors into these variants.

use thiserror::Error;

use crate::limit::{Direction, Transition};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Cycle-level errors ───────────────────────────────────────────
    #[error("Could not resolve managed downloaders: {reason}")]
    DirectoryResolution { reason: String },

    #[error("Invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    // ── Per-service errors ───────────────────────────────────────────
    #[error("Could not read current speed limits from {service}: {reason}")]
    ReadFailed { service: String, reason: String },

    #[error("The {transition} {direction} limit {value:?} is not a number: {reason}")]
    InvalidLimitValue {
        transition: Transition,
        direction: Direction,
        value: String,
        reason: String,
    },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to downloader at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("TLS setup failed: {message}")]
    Tls { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Downloader request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Notification delivery failed: {message}")]
    Notification { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<speedwindow_api::Error> for CoreError {
    fn from(err: speedwindow_api::Error) -> Self {
        match err {
            speedwindow_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            speedwindow_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- re-authentication required".into(),
            },
            speedwindow_api::Error::Banned => CoreError::AuthenticationFailed {
                message: "Client IP banned after too many failed logins".into(),
            },
            speedwindow_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            speedwindow_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            speedwindow_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            speedwindow_api::Error::Tls(message) => CoreError::Tls { message },
            speedwindow_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            speedwindow_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
