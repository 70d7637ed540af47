//! optidb AI - recommendation augmenters backed by a chat-completions service
//!
//! The only provider is Azure OpenAI. It is constructed from environment
//! variables and plugs into the rule engine as a
//! [`optidb_core::RecommendationAugmenter`].

mod azure;
mod prompt;
mod response;

pub use azure::*;
pub use prompt::*;
pub use response::*;
