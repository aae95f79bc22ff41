use crate::gateway::GatewayError;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

pub const DOWNLOAD_FAILED: &str = "Failed to download video";
pub const VIDEO_INFO_FAILED: &str = "Failed to get video info";

// Define our custom error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Configuration(String),
    /// Any upstream, extraction or delivery failure. Only `public` reaches
    /// the client.
    Gateway {
        public: &'static str,
        source: GatewayError,
    },
}

impl AppError {
    /// Sorts a gateway failure into what the caller is allowed to see.
    pub fn from_gateway(error: GatewayError, public: &'static str) -> Self {
        match error {
            GatewayError::MissingInput => AppError::BadRequest("URL is required".to_string()),
            GatewayError::Configuration(detail) => AppError::Configuration(detail),
            source => AppError::Gateway { public, source },
        }
    }
}

// This implementation allows us to convert our AppError into a valid HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(e) => (StatusCode::BAD_REQUEST, e),
            AppError::Configuration(detail) => {
                tracing::error!("Server configuration error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Server configuration error: {}", detail),
                )
            }
            AppError::Gateway { public, source } => {
                // Log the full error for debugging
                tracing::error!("{}: {:?}", public, source);
                (StatusCode::INTERNAL_SERVER_ERROR, public.to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
