//! Clap derive structures for the `speedwindow` CLI.
//!
//! Also compiled by `build.rs` for man page generation, so this module may
//! only depend on `clap` and `clap_complete`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// speedwindow: cron-scheduled speed limits for qBittorrent
#[derive(Debug, Parser)]
#[command(
    name = "speedwindow",
    version,
    about = "Switch qBittorrent speed limits on a cron schedule",
    long_about = "Switches the global upload and download limits of one or more\n\
        qBittorrent WebUIs between a restricted and a normal pair of values,\n\
        driven by two crontab expressions.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "SPEEDWINDOW_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SPEEDWINDOW_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scheduler until interrupted (SIGHUP reloads the config)
    #[command(alias = "daemon")]
    Run,

    /// Apply one transition to every managed downloader now
    Apply(ApplyArgs),

    /// Show live speed limits of every configured downloader
    #[command(alias = "st")]
    Status,

    /// Validate the configuration and preview upcoming fire times
    Check(CheckArgs),

    /// Inspect and edit the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Apply ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Which limit pair to apply
    pub transition: TransitionArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TransitionArg {
    /// The restricted limits (the `restrict_cron` job)
    #[value(alias = "restrict", alias = "resume")]
    Restricted,
    /// The normal limits (the `release_cron` job)
    #[value(alias = "release", alias = "pause")]
    Normal,
}

// ── Check ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Number of upcoming fire times to show per job
    #[arg(long, short = 'n', default_value = "3")]
    pub count: usize,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// Store a downloader password in the system keyring
    SetPassword {
        /// Downloader name as configured under [downloaders]
        downloader: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
