//! Error types and HTTP error mapping for the `zangli` service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Stable, machine readable error codes returned in the error envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    EmptyRequest,
    MissingParams,
    InvalidRequest,
    InvalidDateFormat,
    DateOutOfRange,
    PayloadTooLarge,
    NotFound,
    AiNotConfigured,
    UpstreamError,
    ServerError,
}

impl ErrorCode {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::EmptyRequest
            | ErrorCode::MissingParams
            | ErrorCode::InvalidRequest
            | ErrorCode::InvalidDateFormat
            | ErrorCode::DateOutOfRange => StatusCode::BAD_REQUEST,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::AiNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Main error type for the `zangli` service
#[derive(Error, Debug)]
pub enum ZangliError {
    /// Request validation errors
    #[error("Invalid input: {message}")]
    Validation { code: ErrorCode, message: String },

    /// A date or value outside the range the calendar tables cover
    #[error("Out of range: {message}")]
    OutOfRange { message: String },

    /// An optional integration is not configured
    #[error("Not configured: {message}")]
    NotConfigured { message: String },

    /// External provider failures
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Route not found
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Anything else
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ZangliError {
    pub fn validation<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn missing_params<S: Into<String>>(message: S) -> Self {
        Self::validation(ErrorCode::MissingParams, message)
    }

    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::validation(ErrorCode::InvalidRequest, message)
    }

    pub fn invalid_date<S: Into<String>>(message: S) -> Self {
        Self::validation(ErrorCode::InvalidDateFormat, message)
    }

    pub fn payload_too_large<S: Into<String>>(message: S) -> Self {
        Self::validation(ErrorCode::PayloadTooLarge, message)
    }

    pub fn out_of_range<S: Into<String>>(message: S) -> Self {
        Self::OutOfRange {
            message: message.into(),
        }
    }

    pub fn not_configured<S: Into<String>>(message: S) -> Self {
        Self::NotConfigured {
            message: message.into(),
        }
    }

    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            ZangliError::Validation { code, .. } => *code,
            ZangliError::OutOfRange { .. } => ErrorCode::DateOutOfRange,
            ZangliError::NotConfigured { .. } => ErrorCode::AiNotConfigured,
            ZangliError::Upstream { .. } => ErrorCode::UpstreamError,
            ZangliError::NotFound { .. } => ErrorCode::NotFound,
            ZangliError::Config { .. }
            | ZangliError::Cache { .. }
            | ZangliError::Io { .. }
            | ZangliError::Internal { .. } => ErrorCode::ServerError,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ZangliError::Validation { message, .. } => message.clone(),
            ZangliError::OutOfRange { .. } => "日期超出范围".to_string(),
            ZangliError::NotConfigured { .. } => "AI 助手未配置".to_string(),
            ZangliError::Upstream { .. } => "调用AI服务时出错，请稍后重试".to_string(),
            ZangliError::NotFound { .. } => "接口不存在".to_string(),
            ZangliError::Config { .. }
            | ZangliError::Cache { .. }
            | ZangliError::Io { .. }
            | ZangliError::Internal { .. } => "服务器内部错误".to_string(),
        }
    }
}

impl From<anyhow::Error> for ZangliError {
    fn from(err: anyhow::Error) -> Self {
        ZangliError::internal(format!("{err:#}"))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

impl IntoResponse for ZangliError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = code.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        // Internal failure detail stays in the logs.
        let details = match &self {
            ZangliError::Upstream { message }
            | ZangliError::NotConfigured { message }
            | ZangliError::OutOfRange { message } => Some(message.clone()),
            _ => None,
        };

        let body = ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code,
                message: self.user_message(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
