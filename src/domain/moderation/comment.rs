//! Moderation Context - Value Objects

use serde::{Deserialize, Serialize};

/// 单条评论最大字符数
const MAX_COMMENT_CHARS: usize = 2000;

/// 待审核的评论文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentText(String);

impl CommentText {
    pub fn new(text: impl Into<String>) -> Result<Self, &'static str> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err("Comment cannot be empty");
        }
        if trimmed.chars().count() > MAX_COMMENT_CHARS {
            return Err("Comment cannot exceed 2000 characters");
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommentText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_is_trimmed() {
        let comment = CommentText::new("  Hate it!  ").unwrap();
        assert_eq!(comment.as_str(), "Hate it!");
    }

    #[test]
    fn test_comment_validation() {
        assert!(CommentText::new("   ").is_err());
        assert!(CommentText::new("a".repeat(2001)).is_err());
        assert!(CommentText::new("a".repeat(2000)).is_ok());
    }
}
