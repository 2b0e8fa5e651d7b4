// src/handlers/error.rs
use std::fmt;
use warp::http::StatusCode;
use warp::reject::Reject;

use crate::services::forecast::ForecastError;
use crate::services::pipeline::PipelineError;
use crate::services::world_bank::LoadError;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// The World Bank API could not give us the series.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
impl Reject for ApiError {}

impl From<LoadError> for ApiError {
    fn from(e: LoadError) -> Self {
        ApiError::upstream(format!("failed to load GDP series: {}", e))
    }
}

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        match e {
            ForecastError::InvalidHorizon(_) => ApiError::bad_request(e.to_string()),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::InvalidHorizon { .. } => ApiError::bad_request(e.to_string()),
            PipelineError::Load(load) => load.into(),
            PipelineError::Forecast(forecast) => forecast.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let load: ApiError = PipelineError::Load(LoadError::Status(500)).into();
        assert_eq!(load.status, StatusCode::BAD_GATEWAY);
        assert!(load.message.contains("HTTP 500"));

        let horizon: ApiError = PipelineError::InvalidHorizon { min: 1, max: 20, got: 0 }.into();
        assert_eq!(horizon.status, StatusCode::BAD_REQUEST);

        let zero: ApiError = ForecastError::InvalidHorizon(0).into();
        assert_eq!(zero.status, StatusCode::BAD_REQUEST);
    }
}
