//! Command handlers, one module per subcommand.

pub mod apply;
pub mod check;
pub mod config_cmd;
pub mod run;
pub mod status;
