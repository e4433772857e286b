use thiserror::Error;

/// Failure talking to something outside the process: Slack, the linguistics
/// service, or an image host.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("request to `{endpoint}` failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("`{endpoint}` responded with status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("slack api `{method}` returned error: {error}")]
    Api { method: String, error: String },
    #[error("could not decode response from `{endpoint}`: {message}")]
    Decode { endpoint: String, message: String },
    #[error("{0} is not configured")]
    NotConfigured(String),
}

impl IntegrationError {
    pub fn transport(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport { endpoint: endpoint.into(), message: message.to_string() }
    }

    pub fn decode(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode { endpoint: endpoint.into(), message: message.to_string() }
    }

    /// Chat-safe wording; internal endpoints and payloads stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Transport { .. } | Self::Status { .. } => {
                "I couldn't reach the lookup service right now. Try again in a bit."
            }
            Self::Api { .. } | Self::Decode { .. } => {
                "The lookup service gave me something I couldn't understand."
            }
            Self::NotConfigured(_) => "That lookup isn't set up on this instance.",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Api { .. } | Self::Decode { .. } | Self::NotConfigured(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::IntegrationError;

    #[test]
    fn transport_failures_map_to_retry_hint() {
        let error = IntegrationError::transport("https://ling.example/translate", "timed out");

        assert!(error.is_retryable());
        assert_eq!(
            error.user_message(),
            "I couldn't reach the lookup service right now. Try again in a bit."
        );
        assert!(error.to_string().contains("timed out"));
    }

    #[test]
    fn server_errors_are_retryable_but_client_errors_are_not() {
        let server = IntegrationError::Status { endpoint: "x".to_owned(), status: 503 };
        let client = IntegrationError::Status { endpoint: "x".to_owned(), status: 404 };
        let throttled = IntegrationError::Status { endpoint: "x".to_owned(), status: 429 };

        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(throttled.is_retryable());
    }

    #[test]
    fn missing_configuration_has_user_safe_message() {
        let error = IntegrationError::NotConfigured("linguistics service".to_owned());

        assert_eq!(error.to_string(), "linguistics service is not configured");
        assert_eq!(error.user_message(), "That lookup isn't set up on this instance.");
        assert!(!error.is_retryable());
    }
}
