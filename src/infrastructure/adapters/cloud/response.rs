//! generateContent 响应解析
//!
//! 文本来源依次为 `candidates[0].content.parts[*].text`、`candidates[0].output`、
//! `candidates[0].text`。

use serde::Deserialize;

use crate::application::error::InferenceError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    output: Option<String>,
    text: Option<String>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// 解析出的模型文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedText {
    pub text: String,
    /// 因输出 token 上限而截断
    pub truncated: bool,
}

const FINISH_MAX_TOKENS: &str = "MAX_TOKENS";
const FINISH_STOP: &str = "STOP";

/// 解析成功响应体
pub fn parse_generate_response(body: &str) -> Result<GeneratedText, InferenceError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| InferenceError::MalformedResponse(format!("invalid response JSON: {}", e)))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let blocked = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason);
        return Err(match blocked {
            Some(reason) => InferenceError::MalformedResponse(format!("prompt blocked: {}", reason)),
            None => InferenceError::MalformedResponse("response has no candidates".to_string()),
        });
    };

    let finish_reason = candidate.finish_reason.clone();
    let text = candidate_text(candidate);

    match (finish_reason.as_deref(), text) {
        (Some(FINISH_MAX_TOKENS), Some(text)) => Ok(GeneratedText {
            text,
            truncated: true,
        }),
        (Some(FINISH_MAX_TOKENS), None) => Err(InferenceError::Truncated(
            "output token limit reached before any text was produced".to_string(),
        )),
        (_, Some(text)) => Ok(GeneratedText {
            text,
            truncated: false,
        }),
        (None, None) | (Some(FINISH_STOP), None) => Err(InferenceError::MalformedResponse(
            "response contains no text".to_string(),
        )),
        (Some(reason), None) => Err(InferenceError::MalformedResponse(format!(
            "response contains no text (finish reason {})",
            reason
        ))),
    }
}

fn candidate_text(candidate: Candidate) -> Option<String> {
    let from_parts = candidate.content.map(|content| {
        content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<String>()
    });

    [from_parts, candidate.output, candidate.text]
        .into_iter()
        .flatten()
        .find(|text| !text.trim().is_empty())
}

/// 从错误响应体中取出 `error.message`，取不到时返回原文
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| body.trim().to_string())
}
