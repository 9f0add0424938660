use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// 车辆遥测 API 错误 (对本次账单运行是致命的)
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid telemetry base url: {0}")]
    InvalidUrl(String),
    #[error("telemetry API returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("telemetry request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// 格式化错误: 仅在无法产出任何载荷时返回
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("failed to encode {format} document: {message}")]
    Encode { format: &'static str, message: String },
    #[error("encoding {format} document timed out after {seconds}s")]
    Timeout { format: &'static str, seconds: u64 },
    #[error("failed to serialize bill: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl FormatError {
    pub(crate) fn encode(format: &'static str, message: impl ToString) -> Self {
        Self::Encode {
            format,
            message: message.to_string(),
        }
    }
}

/// HTTP 层错误
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Telemetry(_) => StatusCode::BAD_GATEWAY,
            Self::Format(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!("Request failed: {}", self);

        let body = Json(json!({
            "success": false,
            "message": format!("Error: {}", self),
        }));
        (status, body).into_response()
    }
}
