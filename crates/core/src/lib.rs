//! # Zabbot Core
//!
//! Domain types, traits, and error definitions for the Zabbot monitoring agent.
//! This crate has **no transport dependencies**. It defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is defined as a trait here (`Provider`, `Tool`,
//! `MonitoringClient`). Implementations live in their respective crates, so the
//! conversation loop can be tested end to end with in-process doubles.

pub mod agent;
pub mod error;
pub mod message;
pub mod monitoring;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, BedrockCredentials, Credentials, ProviderKind};
pub use error::{MonitoringError, ProviderError, ToolError};
pub use message::{Arguments, ContentBlock, Conversation, Role, Turn};
pub use monitoring::{
    HostSpec, HostStatus, HostSummary, InterfaceType, MaintenanceWindow, MonitoringClient, Problem,
};
pub use provider::{
    Provider, ProviderRequest, ProviderResponse, StopReason, ToolDefinition, Usage,
};
pub use tool::{Tool, ToolRegistry};
