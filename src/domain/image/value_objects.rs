//! Image Context - Value Objects

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::ImageError;

/// 支持的图片媒体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
    Heic,
    Heif,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Heic => "image/heic",
            Self::Heif => "image/heif",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/heic" => Some(Self::Heic),
            "image/heif" => Some(Self::Heif),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "heic" => Some(Self::Heic),
            "heif" => Some(Self::Heif),
            _ => None,
        }
    }

    /// 根据文件头魔数识别媒体类型
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(Self::Webp);
        }
        // ISO BMFF: [size][ftyp][major brand]
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            return match &bytes[8..12] {
                b"heic" | b"heix" | b"hevc" | b"hevx" | b"heim" | b"heis" => Some(Self::Heic),
                b"mif1" | b"msf1" | b"heif" => Some(Self::Heif),
                _ => None,
            };
        }
        None
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 图片载荷
///
/// 不变量:
/// - media_type 属于支持的类型
/// - data 是非空且可解码的 base64
///
/// 数据通过 `Arc` 共享，克隆开销与图片大小无关。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    media_type: MediaType,
    data: Arc<str>,
}

impl ImagePayload {
    /// 从原始字节构建（已知媒体类型）
    pub fn from_bytes(bytes: &[u8], media_type: MediaType) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(Self {
            media_type,
            data: Arc::from(BASE64.encode(bytes)),
        })
    }

    /// 解析 `data:<mime>;base64,<data>` 格式
    pub fn from_data_url(url: &str) -> Result<Self, ImageError> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUrl("missing `data:` prefix".to_string()))?;

        let (mime, data) = rest
            .split_once(";base64,")
            .ok_or_else(|| ImageError::InvalidDataUrl("expected `;base64,` separator".to_string()))?;

        let media_type = MediaType::from_mime(mime)
            .ok_or_else(|| ImageError::UnsupportedMediaType(mime.to_string()))?;

        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        BASE64
            .decode(data)
            .map_err(|e| ImageError::InvalidDataUrl(format!("bad base64 payload: {}", e)))?;

        Ok(Self {
            media_type,
            data: Arc::from(data),
        })
    }

    /// 从文件读取，先按文件头识别类型，失败时回退到扩展名
    pub fn from_file(path: &Path, max_bytes: u64) -> Result<Self, ImageError> {
        let size = std::fs::metadata(path)?.len();
        if size > max_bytes {
            return Err(ImageError::TooLarge {
                size,
                max: max_bytes,
            });
        }

        let bytes = std::fs::read(path)?;
        let media_type = MediaType::sniff(&bytes)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(MediaType::from_extension)
            })
            .ok_or_else(|| ImageError::UnsupportedMediaType(path.display().to_string()))?;

        tracing::debug!(
            path = %path.display(),
            media_type = %media_type,
            size,
            "Image loaded"
        );

        Self::from_bytes(&bytes, media_type)
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// base64 编码后的数据（不含前缀）
    pub fn base64_data(&self) -> &str {
        &self.data
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type.as_str(), self.data)
    }

    /// 原始字节数的估算值
    pub fn approx_decoded_len(&self) -> usize {
        self.data.len() / 4 * 3
    }
}
