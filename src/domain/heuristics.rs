//! 端侧"答非所问"检测
//!
//! 端侧模型在没有真正处理图片时常返回"我看不到图片"之类的文本。
//! 命中时编排器视为端侧失败并回退云端。判断规则可以整体替换。

/// 判断模型输出是否为无效回答
pub trait NonAnswerPredicate: Send + Sync {
    fn is_non_answer(&self, text: &str) -> bool;
}

impl<F> NonAnswerPredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_non_answer(&self, text: &str) -> bool {
        self(text)
    }
}

/// 默认规则，见 [`looks_like_non_answer`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNonAnswerPredicate;

impl NonAnswerPredicate for DefaultNonAnswerPredicate {
    fn is_non_answer(&self, text: &str) -> bool {
        looks_like_non_answer(text)
    }
}

const REFUSAL_PHRASES: &[&str] = &[
    "can't see",
    "cannot see",
    "unable to see",
    "can't view",
    "cannot view",
    "unable to view",
    "don't see an image",
    "do not see an image",
    "don't see any image",
    "no image was",
    "no image provided",
    "no image attached",
    "haven't provided an image",
    "have not provided an image",
    "didn't provide an image",
    "can't process images",
    "cannot process images",
    "unable to process images",
    "text-based model",
    "text-based ai",
];

const REQUEST_WORDS: &[&str] = &["provide", "upload", "share", "attach", "send"];

/// 默认的无效回答判断
///
/// 规则:
/// 1. 空文本
/// 2. 包含明确的"看不到/无法处理图片"措辞
/// 3. 同时出现 "need" 与 "image"，且带有索要图片的动词（provide/upload/...）
pub fn looks_like_non_answer(text: &str) -> bool {
    let normalized = text.trim().to_lowercase().replace('\u{2019}', "'");
    if normalized.is_empty() {
        return true;
    }

    if REFUSAL_PHRASES.iter().any(|p| normalized.contains(p)) {
        return true;
    }

    normalized.contains("need")
        && normalized.contains("image")
        && REQUEST_WORDS.iter().any(|w| normalized.contains(w))
}
