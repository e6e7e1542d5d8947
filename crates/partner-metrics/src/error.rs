use crate::access::AccessError;
use crate::config::ConfigError;
use crate::import::ImportError;
use crate::metrics::AggregationError;
use crate::notifications::DeliveryError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Import(ImportError),
    Aggregation(AggregationError),
    Delivery(DeliveryError),
    Access(AccessError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Import(_) | AppError::Aggregation(_) => StatusCode::BAD_REQUEST,
            AppError::Access(AccessError::UnknownPartner(_)) => StatusCode::NOT_FOUND,
            AppError::Access(_) => StatusCode::FORBIDDEN,
            AppError::Delivery(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Aggregation(err) => write!(f, "aggregation error: {}", err),
            AppError::Delivery(err) => write!(f, "delivery error: {}", err),
            AppError::Access(err) => write!(f, "access denied: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Aggregation(err) => Some(err),
            AppError::Delivery(err) => Some(err),
            AppError::Access(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<AggregationError> for AppError {
    fn from(value: AggregationError) -> Self {
        Self::Aggregation(value)
    }
}

impl From<DeliveryError> for AppError {
    fn from(value: DeliveryError) -> Self {
        Self::Delivery(value)
    }
}

impl From<AccessError> for AppError {
    fn from(value: AccessError) -> Self {
        Self::Access(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::identity::key_for;

    #[test]
    fn access_errors_map_to_forbidden_or_not_found() {
        assert_eq!(
            AppError::from(AccessError::UnknownToken).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(AccessError::InvalidManagementKey).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(AccessError::UnknownPartner(key_for("Crew A"))).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn input_errors_are_bad_requests() {
        let err = AppError::from(AggregationError::MissingInput);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "aggregation error: no appointment records were supplied"
        );
    }
}
