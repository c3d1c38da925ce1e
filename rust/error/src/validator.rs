use crate::{ErrorCodes, HashvecError};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Validation error: {0}")]
pub struct HashvecValidationError(#[from] validator::ValidationErrors);

impl HashvecError for HashvecValidationError {
    fn code(&self) -> ErrorCodes {
        ErrorCodes::InvalidArgument
    }
}
