/// Errors raised by the reaction engine.
///
/// Invalid arguments are always surfaced to the caller of the failing
/// operation; operation failures are surfaced except at sites documented as
/// best-effort (per-device push, notification events, webhook forwarding),
/// where they are logged and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidArgument(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        EngineError::OperationFailed(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
