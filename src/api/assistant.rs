//! AI question answering endpoints

use super::params::JsonObject;
use super::{ApiResponse, ApiResult, AppState};
use crate::error::ZangliError;
use axum::extract::State;
use serde::Serialize;
use tracing::info;

const MAX_QUESTION_CHARS: usize = 2000;

#[derive(Debug, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct Reply {
    pub reply: String,
}

fn question_field<'a>(body: &'a JsonObject, field: &str) -> Result<&'a str, ZangliError> {
    body.require_non_empty()?;
    let question = body
        .str(field)
        .ok_or_else(|| ZangliError::invalid_request(format!("请求体必须包含'{field}'字段")))?;
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(ZangliError::invalid_request(format!(
            "问题长度不能超过{MAX_QUESTION_CHARS}个字符"
        )));
    }
    Ok(question)
}

/// `POST /ask` with `{"question": ...}`
pub async fn ask(State(state): State<AppState>, body: JsonObject) -> ApiResult<Answer> {
    let question = question_field(&body, "question")?;
    info!("Answering question ({} chars)", question.chars().count());
    let answer = state.assistant.answer(question).await?;
    Ok(ApiResponse::ok(Answer {
        question: question.to_string(),
        answer,
    }))
}

/// `POST /chat` with `{"message": ...}`
pub async fn chat(State(state): State<AppState>, body: JsonObject) -> ApiResult<Reply> {
    let message = question_field(&body, "message")?;
    info!("Answering chat message ({} chars)", message.chars().count());
    let reply = state.assistant.answer(message).await?;
    Ok(ApiResponse::ok(Reply { reply }))
}
