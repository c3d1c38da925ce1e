mod commands;
mod types;

use clap::{Parser, Subcommand};
use hashvec_tracing::{init_stderr_tracing, LogFilter, LogFilterLevel};
use std::io;

pub use crate::commands::transform::{transform_command, transform_reader, TransformArgs};
pub use crate::types::CliError;

#[derive(Subcommand, Debug)]
enum Command {
    /// Hash JSON-lines samples into a CSR matrix printed as JSON.
    Transform(TransformArgs),
}

#[derive(Parser, Debug)]
#[command(name = "hashvec")]
#[command(version = "0.1.0")]
#[command(about = "Feature hashing from the command line", long_about = None)]
struct Cli {
    /// Log level for the hashvec crates. `RUST_LOG` overrides it.
    #[arg(long, global = true, value_parser = parse_log_level)]
    log_level: Option<LogFilterLevel>,
    #[command(subcommand)]
    command: Command,
}

fn parse_log_level(value: &str) -> Result<LogFilterLevel, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("expected one of trace, debug, info, warn, error; got `{value}`"))
}

pub fn hashvec_cli(args: Vec<String>) -> Result<(), CliError> {
    let cli = Cli::parse_from(args);

    let filters = cli
        .log_level
        .map(|filter_level| {
            ["hashvec", "hashvec_cli"]
                .into_iter()
                .map(|crate_name| LogFilter {
                    crate_name: crate_name.to_string(),
                    filter_level,
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    init_stderr_tracing(&filters)?;

    match cli.command {
        Command::Transform(args) => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            transform_command(&mut out, args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug"), Ok(LogFilterLevel::Debug));
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_parse_transform_args() {
        let cli = Cli::try_parse_from([
            "hashvec",
            "transform",
            "--n-features",
            "16",
            "--input-shape",
            "string",
            "--no-alternate-sign",
            "--feature-names",
        ])
        .unwrap();
        let Command::Transform(args) = cli.command;
        assert_eq!(args.n_features, Some(16));
        assert_eq!(args.input_shape, Some(hashvec::InputShape::Names));
        assert!(args.no_alternate_sign);
        assert!(args.feature_names);
        assert_eq!(args.input, "-");
    }
}
