//! LLM-backed collaborators: JSON-mode chat structuring, TGI tag
//! structuring and the spatial auxiliary judge.

pub mod chat;
pub mod error;
pub mod extract;
pub mod judge;
pub mod tgi;

pub use chat::{strip_code_fence, ChatClient};
pub use error::LlmError;
pub use extract::{parse_json_tags, ChatExtractor, DEFAULT_STRUCT_PROMPT};
pub use judge::{parse_score_map, ChatJudge};
pub use tgi::{parse_tag_text, TagExtractor};
