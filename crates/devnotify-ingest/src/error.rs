/// Errors that can occur while ingesting events from an external source.
///
/// # Examples
///
/// ```rust
/// use devnotify_ingest::error::IngestError;
///
/// let err = IngestError::UnsupportedService("dynamodb".to_string());
/// assert!(err.to_string().contains("dynamodb"));
/// assert!(!err.is_transient());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A required field is missing from an otherwise recognized payload.
    #[error("Incomplete payload: missing {field}")]
    IncompletePayload { field: &'static str },

    /// The event kind is not in the normalizer's lookup table.
    #[error("Unsupported event kind: {0}")]
    UnsupportedEventKind(String),

    /// The probe target service is not one the adapter knows how to reach.
    #[error("Service type not supported: {0}")]
    UnsupportedService(String),

    /// A state-machine operation referenced an id that does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An outbound call exceeded its bounded timeout.
    #[error("Timeout calling {service}")]
    Timeout { service: String },

    /// Non-success response from an upstream API, carrying the provider's
    /// literal message. Operators act on that text, so it is never replaced
    /// with a generic failure string.
    #[error("{service}: {message}")]
    Upstream { service: String, message: String },

    /// Malformed integration config, e.g. a missing credential field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// HMAC signing failed (invalid key length or algorithm mismatch).
    #[error("Signing error: {0}")]
    Signing(String),

    /// JSON serialization or deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    /// Whether a retry with backoff may succeed. Permanent conditions
    /// (incomplete payloads, validation failures, unknown kinds) return
    /// false and must not be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IngestError::Timeout { .. } | IngestError::Upstream { .. }
        )
    }

    /// Classify a transport error from `reqwest`, keeping timeouts distinct.
    pub fn from_reqwest(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IngestError::Timeout {
                service: service.to_string(),
            }
        } else {
            IngestError::Upstream {
                service: service.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Convenience type alias so callers can write `error::Result<T>`.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_mark_only_timeout_and_upstream_as_transient() {
        assert!(IngestError::Timeout {
            service: "github".to_string()
        }
        .is_transient());
        assert!(IngestError::Upstream {
            service: "aws".to_string(),
            message: "throttled".to_string()
        }
        .is_transient());
        assert!(!IngestError::IncompletePayload { field: "head_commit" }.is_transient());
        assert!(!IngestError::Validation("token is required".to_string()).is_transient());
        assert!(!IngestError::UnsupportedEventKind("gollum".to_string()).is_transient());
    }

    #[test]
    fn should_keep_upstream_message_verbatim() {
        let err = IngestError::Upstream {
            service: "aws sts".to_string(),
            message: "InvalidClientTokenId".to_string(),
        };
        assert!(err.to_string().contains("InvalidClientTokenId"));
    }
}
