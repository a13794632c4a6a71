// Third party imports
use thiserror::Error;

/// Failure of a single round-trip to the risk-scoring service.
///
/// Contained at its origin: one failed query never aborts the enclosing
/// poll cycle or the other in-flight queries.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("risk query timed out for {protocol}")]
    Timeout { protocol: String },

    #[error("transport error querying {protocol}: {message}")]
    Transport { protocol: String, message: String },

    #[error("malformed response for {protocol}: {message}")]
    Malformed { protocol: String, message: String },

    #[error("backend returned status {status} for {protocol}")]
    Backend { protocol: String, status: u16 },
}

impl QueryError {
    /// Classify a reqwest failure into the query taxonomy.
    pub fn from_reqwest(protocol: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QueryError::Timeout {
                protocol: protocol.to_string(),
            }
        } else if err.is_decode() {
            QueryError::Malformed {
                protocol: protocol.to_string(),
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            QueryError::Backend {
                protocol: protocol.to_string(),
                status: status.as_u16(),
            }
        } else {
            QueryError::Transport {
                protocol: protocol.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// True when the backend answered but rejected the request, which is
    /// how an unknown protocol surfaces; false means the backend itself
    /// was unreachable or broken.
    pub fn is_backend_rejection(&self) -> bool {
        matches!(self, QueryError::Backend { status, .. } if (400..500).contains(status))
    }
}

/// Failure delivering one message to one subscriber endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Recipient blocked the bot (Telegram 403). Candidate for the
    /// auto-unsubscribe policy hook.
    #[error("recipient blocked the sender")]
    Blocked,

    #[error("transport rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("delivery transport error: {0}")]
    Transport(String),

    #[error("bot API error {code}: {description}")]
    Api { code: i64, description: String },
}

impl DeliveryError {
    /// Classify a Telegram Bot API error response.
    pub fn from_api_response(code: i64, description: &str, retry_after: Option<u64>) -> Self {
        match code {
            403 => DeliveryError::Blocked,
            429 => DeliveryError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(0),
            },
            _ => DeliveryError::Api {
                code,
                description: description.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_rejection_classification() {
        let err = QueryError::Backend {
            protocol: "NotAProtocol".to_string(),
            status: 404,
        };
        assert!(err.is_backend_rejection());

        let err = QueryError::Backend {
            protocol: "Jupiter".to_string(),
            status: 502,
        };
        assert!(!err.is_backend_rejection());

        let err = QueryError::Timeout {
            protocol: "Jupiter".to_string(),
        };
        assert!(!err.is_backend_rejection());
    }

    #[test]
    fn test_delivery_error_from_api_response() {
        assert_eq!(
            DeliveryError::from_api_response(403, "Forbidden: bot was blocked by the user", None),
            DeliveryError::Blocked
        );
        assert_eq!(
            DeliveryError::from_api_response(429, "Too Many Requests", Some(31)),
            DeliveryError::RateLimited {
                retry_after_secs: 31
            }
        );
        assert_eq!(
            DeliveryError::from_api_response(400, "Bad Request: chat not found", None),
            DeliveryError::Api {
                code: 400,
                description: "Bad Request: chat not found".to_string()
            }
        );
    }

    #[test]
    fn test_query_error_display() {
        let err = QueryError::Timeout {
            protocol: "Orca".to_string(),
        };
        assert_eq!(err.to_string(), "risk query timed out for Orca");
    }
}
