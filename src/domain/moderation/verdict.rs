//! Moderation Context - 评论审核结论
//!
//! 模型输出是非结构化或半结构化文本，可能在 JSON 前后夹带说明文字。
//! 解析规则：取第一个括号平衡的 `{...}` 块并按 JSON 解码。

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// 审核结论解析错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerdictError {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("invalid verdict JSON: {0}")]
    InvalidJson(String),

    #[error("verdict marked problematic without a reason")]
    MissingReason,
}

/// 评论审核结论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentModerationVerdict {
    pub is_problematic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl CommentModerationVerdict {
    pub fn acceptable() -> Self {
        Self {
            is_problematic: false,
            reason: None,
            suggestion: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    #[serde(deserialize_with = "lenient_bool")]
    is_problematic: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    suggestion: Option<String>,
}

/// 小模型偶尔把布尔值写成字符串
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        Bool(bool),
        Text(String),
    }

    match BoolLike::deserialize(deserializer)? {
        BoolLike::Bool(b) => Ok(b),
        BoolLike::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected boolean, got {:?}",
                other
            ))),
        },
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 提取第一个括号平衡的 JSON 对象
///
/// 字符串字面量内的括号与转义字符不参与计数。
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// 解析模型返回的审核结论
pub fn parse_verdict(raw: &str) -> Result<CommentModerationVerdict, VerdictError> {
    let json = extract_json_object(raw).ok_or(VerdictError::NoJsonObject)?;

    let parsed: RawVerdict =
        serde_json::from_str(json).map_err(|e| VerdictError::InvalidJson(e.to_string()))?;

    let reason = non_blank(parsed.reason);
    if parsed.is_problematic && reason.is_none() {
        return Err(VerdictError::MissingReason);
    }

    Ok(CommentModerationVerdict {
        is_problematic: parsed.is_problematic,
        reason,
        suggestion: non_blank(parsed.suggestion),
    })
}
