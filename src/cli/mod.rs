//! CLI module for apimodel
//!
//! Provides command-line interface for:
//! - check: Load, validate and dump a JSON payload
//! - describe: Print the properties of a model

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, ModelName};
pub use commands::{check, check_payload, describe, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_payload, write_error, write_response};
