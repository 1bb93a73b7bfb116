//! Maps `Box<dyn Error>` from trait boundaries to typed `ClientError`.
//!
//! The traits in `washcall_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `washcall_transport::TransportError`
//! downcasting.

use crate::error::ClientError;

/// Map a trait-boundary error to a typed `ClientError`.
///
/// Attempts to downcast known transport error types first, then falls back
/// to string-based heuristics.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> ClientError {
    #[cfg(feature = "transport-errors")]
    {
        use washcall_transport::TransportError;
        if let Some(te) = e.downcast_ref::<TransportError>() {
            return match te {
                TransportError::Unauthorized => ClientError::Unauthorized,
                TransportError::Status { code, detail } => ClientError::Status {
                    code: *code,
                    detail: detail.clone(),
                },
                other => ClientError::Transport(other.to_string()),
            };
        }
    }

    // Already typed (e.g. test doubles returning ClientError directly)
    if let Some(ce) = e.downcast_ref::<ClientError>() {
        return ce.clone();
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("401") || lower.contains("unauthorized") {
        ClientError::Unauthorized
    } else {
        ClientError::Transport(s)
    }
}
