//! CLI argument definitions using clap
//!
//! Commands:
//! - apimodel check --model <name> [--config <path>] <payload>
//! - apimodel describe --model <name>

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::mail::{Message, MessagePart};
use crate::schema::ApiModel;

/// apimodel - load, validate and dump API payloads against declared schemas
#[derive(Parser, Debug)]
#[command(name = "apimodel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Built-in models selectable from the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelName {
    Message,
    MessagePart,
}

impl ModelName {
    /// Registered schema name
    pub fn schema_name(self) -> &'static str {
        match self {
            ModelName::Message => Message::NAME,
            ModelName::MessagePart => MessagePart::NAME,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a JSON payload, validate it and dump it back
    Check {
        /// Model the payload must conform to
        #[arg(long, value_enum)]
        model: ModelName,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Path to the JSON payload, or "-" for stdin
        payload: PathBuf,
    },

    /// Print the properties of a model
    Describe {
        /// Model to describe
        #[arg(long, value_enum)]
        model: ModelName,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["apimodel", "check", "--model", "message-part", "part.json"]).unwrap();
        match cli.command {
            Command::Check { model, config, payload } => {
                assert_eq!(model, ModelName::MessagePart);
                assert!(config.is_none());
                assert_eq!(payload, PathBuf::from("part.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_schema_names() {
        assert_eq!(ModelName::Message.schema_name(), "Message");
        assert_eq!(ModelName::MessagePart.schema_name(), "MessagePart");
    }
}
