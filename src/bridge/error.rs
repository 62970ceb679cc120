use thiserror::Error;

/// Coarse classification of bridge failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ArityMismatch,
    MalformedTopology,
    MpiFailure,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Wrong number of inputs or outputs. The call is rejected, the process lives on.
    #[error("Require topology structure on RHS (got {inputs} inputs, {outputs} outputs; need 1 and 1)")]
    ArityMismatch { inputs: usize, outputs: usize },

    /// The topology record could not be decoded
    #[error("Malformed topology: {0}")]
    MalformedTopology(String),

    /// Failure inside an MPI call while deriving communicators
    #[error("MPI failure: {0}")]
    MpiFailure(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            Self::MalformedTopology(_) => ErrorKind::MalformedTopology,
            Self::MpiFailure(_) => ErrorKind::MpiFailure,
        }
    }
}

/// Kind of a bridge error wrapped in an anyhow::Error, if it is one
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.downcast_ref::<BridgeError>().map(BridgeError::kind)
}
