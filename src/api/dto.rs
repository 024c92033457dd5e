//! REST API request/response data transfer objects

use serde::{Deserialize, Serialize};

use crate::service::TryOnRequest;

/// Try-on request body
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TryOnRequestDto {
    pub session_id: Option<String>,
    pub body_image_key: Option<String>,
    pub garment_image_keys: Option<Vec<String>>,
}

impl From<TryOnRequestDto> for TryOnRequest {
    fn from(dto: TryOnRequestDto) -> Self {
        TryOnRequest {
            session_id: dto.session_id,
            body_image_key: dto.body_image_key,
            garment_image_keys: dto.garment_image_keys,
        }
    }
}

/// Try-on response
#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    pub session_id: String,
    pub result_image_key: String,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    #[serde(rename = "backendName", skip_serializing_if = "Option::is_none")]
    pub backend_name: Option<String>,
}

/// Metrics response
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub completed: u64,
    pub failed: u64,
    pub backend_connected: bool,
    pub uptime_seconds: u64,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}
