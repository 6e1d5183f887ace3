//! The Zabbot conversation loop.
//!
//! 1. **Receive** an operator message plus optional situational context
//! 2. **Build** the system prompt from the fixed policy and the context
//! 3. **Send** the conversation and tool catalog to the configured provider
//! 4. **If tool calls**: execute them in order, append the results, go to 3
//! 5. **If text**: return it
//!
//! The loop gives up after [`MAX_ROUND_TRIPS`] provider calls.

pub mod loop_runner;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use loop_runner::{BOUND_EXCEEDED_REPLY, ChatOutcome, ConversationLoop, MAX_ROUND_TRIPS};
pub use prompt::{SituationalContext, SystemPromptBuilder};
