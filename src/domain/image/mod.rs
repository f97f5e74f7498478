//! Image Context - 图片输入
//!
//! 职责:
//! - 媒体类型识别与校验
//! - data URL 编解码
//!
//! 不做任何解码或变换，图片以编码后的字节原样传递。

mod errors;
mod value_objects;

pub use errors::ImageError;
pub use value_objects::{ImagePayload, MediaType};
