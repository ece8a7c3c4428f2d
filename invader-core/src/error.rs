// Error types for the REST layer

use crate::HttpResponse;
use invader_validation::ValidationErrors;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not Implemented: {0}")]
    NotImplemented(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound(_) | Error::NotFound(_) => 404,
            Error::MethodNotAllowed(_) => 405,
            Error::Validation(_) | Error::Deserialization(_) | Error::BadRequest(_) => 400,
            Error::NotImplemented(_) => 501,
            Error::Serialization(_) | Error::Internal(_) | Error::Io(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Render the error as a JSON response.
    ///
    /// Validation failures list every violation; server errors never echo
    /// their detail to the caller.
    pub fn to_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            Error::Validation(errors) => errors.to_json(),
            _ if self.is_server_error() && !matches!(self, Error::NotImplemented(_)) => {
                serde_json::json!({
                    "error": "Internal server error",
                    "status": status,
                })
            }
            _ => serde_json::json!({
                "error": self.to_string(),
                "status": status,
            }),
        };
        HttpResponse::new(status)
            .with_json(&body)
            .unwrap_or_else(|_| HttpResponse::internal_server_error())
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Deserialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invader_validation::ValidationError;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::RouteNotFound("GET /".into()).status_code(), 404);
        assert_eq!(Error::BadRequest("bad".into()).status_code(), 400);
        assert_eq!(Error::NotImplemented("webhook".into()).status_code(), 501);
        assert!(Error::Internal("boom".into()).is_server_error());
        assert!(Error::NotFound("cart".into()).is_client_error());
    }

    #[test]
    fn test_validation_error_body_lists_fields() {
        let mut errors = ValidationErrors::new(Vec::new());
        errors.add(ValidationError::new("target", "unallowed value").with_constraint("allowed"));

        let response = Error::from(errors).to_response();
        assert_eq!(response.status, 400);
        let body = response.body_json().unwrap();
        assert_eq!(body["errors"][0]["field"], "target");
        assert_eq!(body["errors"][0]["constraint"], "allowed");
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let response = Error::Internal("db password leaked".into()).to_response();
        assert_eq!(response.status, 500);
        let body = response.body_json().unwrap();
        assert_eq!(body["error"], "Internal server error");
    }
}
