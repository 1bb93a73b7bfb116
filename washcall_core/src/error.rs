use thiserror::Error;

use crate::model::MachineId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unauthorized: session expired or token rejected")]
    Unauthorized,
    #[error("server returned {code}: {detail}")]
    Status { code: u16, detail: String },
    #[error("machine {machine_id}: missing required field `{field}`")]
    MissingField {
        machine_id: MachineId,
        field: &'static str,
    },
    #[error("unrecognized {field} value {value:?}")]
    UnrecognizedEnum { field: &'static str, value: String },
    #[error("malformed payload: {0}")]
    Decode(String),
    #[error("unknown machine {0}")]
    UnknownMachine(MachineId),
    #[error("action not allowed: {0}")]
    InvalidAction(&'static str),
}

impl ClientError {
    /// Errors raised by the backend or the link rather than by local data.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Unauthorized | ClientError::Status { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
