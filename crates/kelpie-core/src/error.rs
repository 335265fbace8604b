use crate::tree::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("node not found: {id}")]
    NotFound { id: NodeId },

    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("corrupt state ({message})")]
    CorruptData { message: String },
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptData {
            message: message.into(),
        }
    }

    /// `true` for errors a caller recovers from by dropping the operation.
    pub fn is_recoverable_noop(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::InvalidOperation { .. }
        )
    }
}
