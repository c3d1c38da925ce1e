// Error codes shared by every hashvec crate. The numbering follows the gRPC
// status codes (https://grpc.github.io/grpc/core/md_doc_statuscodes.html) so
// callers embedding the library in a service can forward them unchanged.
use std::error::Error;

#[cfg(feature = "validator")]
mod validator;
#[cfg(feature = "validator")]
pub use validator::*;

#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum ErrorCodes {
    // UNKNOWN indicates an unknown error.
    Unknown = 2,
    // INVALID_ARGUMENT covers malformed configuration and feature values of an unusable kind.
    InvalidArgument = 3,
    // FAILED_PRECONDITION indicates the hasher is not in a state required for the call,
    // e.g. asking for feature names before any mapping was recorded.
    FailedPrecondition = 9,
    // OUT_OF_RANGE means a numeric feature value is not finite.
    OutOfRange = 11,
    // INTERNAL errors are internal errors.
    Internal = 13,
    // UNPROCESSABLE_ENTITY indicates the request is valid but cannot be processed,
    // e.g. vectorizing an empty input stream.
    UnprocessableEntity = 18,
    // INVALID_TYPE means a feature value is of a kind that cannot be used as a number.
    InvalidType = 19,
}

impl ErrorCodes {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCodes::InvalidArgument => "InvalidArgumentError",
            ErrorCodes::FailedPrecondition => "StateError",
            ErrorCodes::OutOfRange => "ValueError",
            ErrorCodes::Internal => "InternalError",
            ErrorCodes::UnprocessableEntity => "EmptyInputError",
            ErrorCodes::InvalidType => "TypeError",
            ErrorCodes::Unknown => "HashvecError",
        }
    }
}

impl std::fmt::Display for ErrorCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub trait HashvecError: Error + Send {
    fn code(&self) -> ErrorCodes;
    fn boxed(self) -> Box<dyn HashvecError>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
    fn should_trace_error(&self) -> bool {
        true
    }
}

impl Error for Box<dyn HashvecError> {}

impl HashvecError for Box<dyn HashvecError> {
    fn code(&self) -> ErrorCodes {
        self.as_ref().code()
    }
}

impl HashvecError for std::io::Error {
    fn code(&self) -> ErrorCodes {
        ErrorCodes::Unknown
    }
}
