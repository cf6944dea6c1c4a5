pub mod core;
pub mod output;
mod shell;

pub use self::core::{CliError, CliMode};
pub use shell::{run_cli, SCRIPT_ENV_VAR};
