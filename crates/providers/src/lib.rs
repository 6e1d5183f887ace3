//! LLM provider implementations for Zabbot.
//!
//! All providers implement the `zabbot_core::Provider` trait.
//! The router builds the correct provider from a configuration snapshot.

pub mod bedrock;
pub mod gemini;
mod http;
pub mod openai;
pub mod router;
pub mod sigv4;

pub use bedrock::BedrockProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use router::{ProviderFactory, ProviderRouter};
