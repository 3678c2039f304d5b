//! CLI command implementations
//!
//! Each invocation builds a fresh engine, registers the mail schemas and
//! runs exactly one command. Results go to stdout as JSON, logs to stderr.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::engine::{Engine, EngineConfig};
use crate::mail;

use super::args::{Cli, Command, ModelName};
use super::errors::{CliError, CliResult};
use super::io::{read_payload, write_error, write_response};

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a specific command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Check {
            model,
            config,
            payload,
        } => {
            let config = load_config(config.as_deref())?;
            init_logging(&config)?;
            check(config, model, &payload)
        }
        Command::Describe { model } => {
            let config = EngineConfig::default();
            init_logging(&config)?;
            describe(config, model)
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(config: &EngineConfig) -> CliResult<()> {
    let level = config.level_filter()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    // A second init in the same process (tests) is not an error.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
    Ok(())
}

fn build_engine(config: EngineConfig) -> CliResult<Engine> {
    let engine = Engine::new(config);
    mail::register(&engine)?;
    debug!(schemas = engine.schemas().len(), "engine ready");
    Ok(engine)
}

/// Load the payload, validate it and print the dumped wire form.
///
/// A rejected payload prints an error object and returns an error so the
/// process exits non-zero.
pub fn check(config: EngineConfig, model: ModelName, payload: &Path) -> CliResult<()> {
    let engine = build_engine(config)?;
    let json = read_payload(payload)?;
    let name = model.schema_name();

    match check_payload(&engine, name, &json) {
        Ok(dumped) => {
            info!(model = name, "payload accepted");
            write_response(dumped)
        }
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Load then dump `json` through `model`
pub fn check_payload(engine: &Engine, model: &str, json: &Value) -> CliResult<Value> {
    let record = engine.load_json(model, json).map_err(|e| {
        debug!(model, error = %e, "payload rejected");
        CliError::from(e)
    })?;
    Ok(engine.dump_json(model, &record)?)
}

/// Print the schema of `model` as JSON
pub fn describe(config: EngineConfig, model: ModelName) -> CliResult<()> {
    let engine = build_engine(config)?;
    let schema = engine.schema(model.schema_name())?;
    write_response(serde_json::to_value(schema.describe())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> Engine {
        build_engine(EngineConfig::default()).unwrap()
    }

    fn part() -> Value {
        json!({
            "id": 3,
            "part_type": "text/plain",
            "is_attachment": 0,
            "file_name": "",
            "charset": "utf-8",
            "body": "hello",
            "size": 5,
            "created": "2024/01/02 03:04:05"
        })
    }

    #[test]
    fn test_check_payload_accepts_valid_part() {
        let dumped = check_payload(&engine(), "MessagePart", &part()).unwrap();
        assert_eq!(dumped, part());
    }

    #[test]
    fn test_check_payload_rejects_invalid_part() {
        let mut payload = part();
        payload["is_attachment"] = json!(2);
        let err = check_payload(&engine(), "MessagePart", &payload).unwrap_err();
        assert_eq!(err.code_str(), "APIMODEL_CLI_REJECTED");
        assert!(err.message().contains("is_attachment"));
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let err = load_config(Some(Path::new("/nonexistent/apimodel.json"))).unwrap_err();
        assert_eq!(err.code_str(), "APIMODEL_CLI_CONFIG_ERROR");
    }
}
