//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use speedwindow_config::ConfigError;
use speedwindow_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// Some downloaders were not updated.
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to downloader at {url}")]
    #[diagnostic(
        code(speedwindow::connection_failed),
        help(
            "Check that the qBittorrent WebUI is running and reachable.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(speedwindow::tls),
        help("Check the downloader's ca_cert path, or set insecure = true for self-signed WebUIs.")
    )]
    Tls { message: String },

    #[error("Could not resolve managed downloaders: {reason}")]
    #[diagnostic(
        code(speedwindow::directory),
        help("Check the [downloaders] entries, in particular ca_cert paths.")
    )]
    Directory { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(speedwindow::auth_failed),
        help(
            "Verify the WebUI username and password.\n\
             Store a password with: speedwindow config set-password <downloader>"
        )
    )]
    AuthFailed { message: String },

    #[error("No password configured for downloader '{downloader}'")]
    #[diagnostic(
        code(speedwindow::no_credentials),
        help(
            "Run: speedwindow config set-password {downloader}\n\
             Or set password_env / password under [downloaders.{downloader}]."
        )
    )]
    NoCredentials { downloader: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Downloader '{name}' is not configured")]
    #[diagnostic(
        code(speedwindow::unknown_downloader),
        help("Add a [downloaders.{name}] table to {path}")
    )]
    UnknownDownloader { name: String, path: String },

    #[error("Invalid schedule '{expression}': {reason}")]
    #[diagnostic(
        code(speedwindow::invalid_schedule),
        help("Use a 5-field crontab expression, e.g. \"0 18 * * 1-5\".")
    )]
    InvalidSchedule { expression: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(speedwindow::validation))]
    Validation { field: String, reason: String },

    #[error("{count} configuration problem(s) found")]
    #[diagnostic(
        code(speedwindow::check_failed),
        help("See the report above. Config file: {path}")
    )]
    CheckFailed { count: usize, path: String },

    #[error(transparent)]
    #[diagnostic(code(speedwindow::config))]
    Config(Box<ConfigError>),

    // ── Enforcement ──────────────────────────────────────────────────
    #[error("{failed} of {total} downloader(s) did not take the {transition} limits")]
    #[diagnostic(
        code(speedwindow::partial),
        help("Re-run with -v for per-downloader logs.")
    )]
    Partial {
        transition: String,
        failed: usize,
        total: usize,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(speedwindow::api_error))]
    ApiError { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(speedwindow::timeout),
        help("Raise `timeout` for the downloader or check the WebUI's responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(speedwindow::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Tls { .. } | Self::Directory { .. } => {
                exit_code::CONNECTION
            }
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::UnknownDownloader { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::InvalidSchedule { .. } | Self::CheckFailed { .. } => {
                exit_code::USAGE
            }
            Self::Partial { .. } => exit_code::PARTIAL,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { downloader } => CliError::NoCredentials { downloader },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Tls { message } => CliError::Tls { message },

            CoreError::DirectoryResolution { reason } => CliError::Directory { reason },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::InvalidSchedule { expression, reason } => {
                CliError::InvalidSchedule { expression, reason }
            }

            err @ CoreError::InvalidLimitValue { .. } => CliError::Validation {
                field: "limiter".into(),
                reason: err.to_string(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::ReadFailed { service, reason } => CliError::ApiError {
                message: format!("{service}: {reason}"),
            },

            CoreError::Api { message, .. }
            | CoreError::Notification { message }
            | CoreError::Internal(message) => CliError::ApiError { message },
        }
    }
}
