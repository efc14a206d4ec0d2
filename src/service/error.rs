use axum::http::StatusCode;
use thiserror::Error;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid {0}")]
    InvalidField(&'static str),

    #[error("Required parameters are missing")]
    MissingParams,

    #[error("Request reference is required")]
    MissingRef,

    #[error("Contact phone or email is required")]
    MissingContact,

    #[error("Required fields are missing")]
    MissingFields,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Request {0} is already completed")]
    AlreadyCompleted(String),

    #[error("Request {0} was already accepted by another provider")]
    AlreadyAccepted(String),

    #[error("Request {0} was rejected")]
    RequestRejected(String),

    #[error("Provider {0} is not approved")]
    ProviderNotApproved(i64),

    #[error("Provider city does not match the request city")]
    CityMismatch,

    #[error("Provider does not offer service {0}")]
    ServiceMismatch(String),

    #[error("A rejected request cannot be completed")]
    CannotCompleteRejected,

    #[error("Request {0} has no accepted offer yet")]
    NotApproved(String),

    #[error("Contact does not match this request")]
    ContactMismatch,

    #[error("Provider {0} is not assigned to request {1}")]
    Unauthorized(i64, String),

    #[error("Chat opens once a provider accepts the request")]
    ChatUnavailable,

    #[error("A provider with this phone or email already exists")]
    ProviderExists,

    #[error("Phone/email or password is wrong")]
    InvalidCredentials,

    #[error("Could not allocate a unique reference after {0} attempts")]
    RefCollision(usize),

    #[error("Database error: {1}")]
    Database(&'static str, #[source] sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<sqlx::Error> for ServiceError {
    fn from(error: sqlx::Error) -> Self {
        ServiceError::Database("db_error", error)
    }
}

/// Tags a store failure with the operation that failed.
pub trait DbContext<T> {
    fn db(self, code: &'static str) -> Result<T, ServiceError>;
}

impl<T> DbContext<T> for Result<T, sqlx::Error> {
    fn db(self, code: &'static str) -> Result<T, ServiceError> {
        self.map_err(|e| ServiceError::Database(code, e))
    }
}

impl ServiceError {
    pub fn code(&self) -> String {
        match self {
            ServiceError::InvalidField(field) => format!("invalid_{}", field),
            ServiceError::MissingParams => "missing_params".to_string(),
            ServiceError::MissingRef => "missing_ref".to_string(),
            ServiceError::MissingContact => "missing_contact".to_string(),
            ServiceError::MissingFields => "missing_fields".to_string(),
            ServiceError::NotFound(_) => "not_found".to_string(),
            ServiceError::AlreadyCompleted(_) => "already_completed".to_string(),
            ServiceError::AlreadyAccepted(_) => "already_accepted".to_string(),
            ServiceError::RequestRejected(_) => "request_rejected".to_string(),
            ServiceError::ProviderNotApproved(_) => "provider_not_approved".to_string(),
            ServiceError::CityMismatch => "city_mismatch".to_string(),
            ServiceError::ServiceMismatch(_) => "service_mismatch".to_string(),
            ServiceError::CannotCompleteRejected => "cannot_complete_rejected".to_string(),
            ServiceError::NotApproved(_) => "request_not_approved".to_string(),
            ServiceError::ContactMismatch => "contact_mismatch".to_string(),
            ServiceError::Unauthorized(_, _) => "unauthorized".to_string(),
            ServiceError::ChatUnavailable => "chat_unavailable".to_string(),
            ServiceError::ProviderExists => "provider_exists".to_string(),
            ServiceError::InvalidCredentials => "invalid_credentials".to_string(),
            ServiceError::RefCollision(_) => "ref_collision".to_string(),
            ServiceError::Database(code, _) => code.to_string(),
            ServiceError::Other(_) => "server_error".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidField(_)
            | ServiceError::MissingParams
            | ServiceError::MissingRef
            | ServiceError::MissingContact
            | ServiceError::MissingFields => StatusCode::BAD_REQUEST,

            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::AlreadyCompleted(_)
            | ServiceError::AlreadyAccepted(_)
            | ServiceError::RequestRejected(_)
            | ServiceError::CannotCompleteRejected
            | ServiceError::NotApproved(_)
            | ServiceError::ChatUnavailable
            | ServiceError::ProviderExists => StatusCode::CONFLICT,

            ServiceError::ProviderNotApproved(_)
            | ServiceError::CityMismatch
            | ServiceError::ServiceMismatch(_)
            | ServiceError::ContactMismatch
            | ServiceError::Unauthorized(_, _) => StatusCode::FORBIDDEN,

            ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,

            ServiceError::RefCollision(_)
            | ServiceError::Database(_, _)
            | ServiceError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        let code = error.code();

        let message = match &error {
            ServiceError::Database(_, source) => {
                tracing::error!("Database failure ({}): {}", code, source);
                "Database operation failed".to_string()
            }
            ServiceError::Other(detail) => {
                tracing::error!("Unexpected failure: {}", detail);
                "Server Error. Please try again later".to_string()
            }
            _ => error.to_string(),
        };

        HttpError::new(code, message, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ServiceError::InvalidField("phone").code(), "invalid_phone");
        assert_eq!(
            ServiceError::AlreadyCompleted("KS-1".into()).code(),
            "already_completed"
        );
        assert_eq!(
            ServiceError::Database("db_insert_failed", sqlx::Error::RowNotFound).code(),
            "db_insert_failed"
        );
        assert_eq!(ServiceError::from(sqlx::Error::PoolTimedOut).code(), "db_error");
    }

    #[test]
    fn test_db_context_tags_operation() {
        let result: Result<(), sqlx::Error> = Err(sqlx::Error::RowNotFound);
        let err = result.db("db_read_failed").unwrap_err();
        assert_eq!(err.code(), "db_read_failed");
    }

    #[test]
    fn test_http_error_hides_driver_text() {
        let http: HttpError =
            ServiceError::Database("db_update_failed", sqlx::Error::PoolTimedOut).into();
        assert_eq!(http.code, "db_update_failed");
        assert_eq!(http.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(http.message, "Database operation failed");
    }

    #[test]
    fn test_precondition_errors_are_client_visible() {
        let http: HttpError = ServiceError::CityMismatch.into();
        assert_eq!(http.code, "city_mismatch");
        assert_eq!(http.status, StatusCode::FORBIDDEN);
    }
}
