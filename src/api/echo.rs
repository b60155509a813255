use super::params::body_bytes;
use super::{ApiResponse, ApiResult};
use crate::error::ZangliError;
use axum::extract::Request;
use serde_json::{Value, json};

/// Return the request body unchanged; an empty body echoes `null`
pub async fn echo(req: Request) -> ApiResult<Value> {
    let body = body_bytes(req, &()).await?;
    let echoed = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ZangliError::invalid_request(format!("无效的JSON请求体: {e}")))?
    };
    Ok(ApiResponse::ok(json!({ "echo": echoed })))
}
