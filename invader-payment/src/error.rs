//! Error types for payment processing

use thiserror::Error;

/// Payment error types
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Bad or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Payment mode or acquirer set up for another provider
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Payable, payment mode or transaction lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation the deployment does not provide
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Business error reported by the acquirer (declined card, bad tax id)
    #[error("{0}")]
    Acquirer(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(String),

    /// Anything else
    #[error("Unhandled error: {0}")]
    Unhandled(String),
}

impl PaymentError {
    /// Errors reported back to the storefront as `{result: false}`
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PaymentError::Acquirer(_))
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

impl From<invader_validation::ValidationErrors> for PaymentError {
    fn from(errors: invader_validation::ValidationErrors) -> Self {
        PaymentError::Validation(errors.to_string())
    }
}

impl From<PaymentError> for invader_core::Error {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(msg) | PaymentError::Acquirer(msg) => {
                invader_core::Error::BadRequest(msg)
            }
            PaymentError::NotFound(msg) => invader_core::Error::NotFound(msg),
            PaymentError::NotImplemented(msg) => invader_core::Error::NotImplemented(msg),
            other => invader_core::Error::Internal(other.to_string()),
        }
    }
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_acquirer_errors_are_recoverable() {
        assert!(PaymentError::Acquirer("CPF inválido".into()).is_recoverable());
        assert!(!PaymentError::Configuration("wrong provider".into()).is_recoverable());
        assert!(!PaymentError::Network("timeout".into()).is_recoverable());
    }

    #[test]
    fn test_http_status_mapping() {
        let status = |err: PaymentError| invader_core::Error::from(err).status_code();
        assert_eq!(status(PaymentError::Validation("x".into())), 400);
        assert_eq!(status(PaymentError::NotFound("cart".into())), 404);
        assert_eq!(status(PaymentError::NotImplemented("x".into())), 501);
        assert_eq!(status(PaymentError::Configuration("x".into())), 500);
        assert_eq!(status(PaymentError::Unhandled("x".into())), 500);
        assert_eq!(status(PaymentError::Acquirer("declined".into())), 400);
    }

    #[test]
    fn test_acquirer_message_is_verbatim() {
        assert_eq!(
            PaymentError::Acquirer("invalid_parameter".into()).to_string(),
            "invalid_parameter"
        );
    }
}
