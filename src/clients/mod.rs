pub mod llm_client;

pub use llm_client::{parse_json_content, ChatOptions, LlmClient};
