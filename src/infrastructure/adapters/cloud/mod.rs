//! Cloud Adapter - Gemini generateContent 执行器

mod gemini_client;
mod response;

pub use gemini_client::{GeminiClientConfig, GeminiExecutor};
pub use response::{parse_generate_response, GeneratedText};
