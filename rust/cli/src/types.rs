use hashvec::{ConfigError, MappingError, TransformError};
use hashvec_error::{ErrorCodes, HashvecError};
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid sample on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("Failed to write output: {0}")]
    Output(#[source] serde_json::Error),
    #[error("Failed to initialize logging: {0}")]
    Tracing(#[from] SetGlobalDefaultError),
}

impl HashvecError for CliError {
    fn code(&self) -> ErrorCodes {
        match self {
            CliError::Io(err) => err.code(),
            CliError::Parse { .. } => ErrorCodes::InvalidArgument,
            CliError::Config(err) => err.code(),
            CliError::Transform(err) => err.code(),
            CliError::Mapping(err) => err.code(),
            CliError::Output(_) => ErrorCodes::Internal,
            CliError::Tracing(_) => ErrorCodes::Internal,
        }
    }
}
