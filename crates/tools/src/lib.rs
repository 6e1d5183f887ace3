//! Monitoring tools for Zabbot.
//!
//! Tools give the agent the ability to act on the monitoring system:
//! register hosts, look up templates and host groups, acknowledge problems,
//! open maintenance windows, and toggle monitoring for a host.
//!
//! Every tool holds a shared [`MonitoringClient`]; [`catalog`] wires them all
//! into a registry in a fixed order.

pub mod acknowledge_problem;
pub mod create_host;
pub mod get_host_groups;
pub mod get_templates;
pub mod schedule_maintenance;
pub mod update_host_status;

#[cfg(test)]
mod fake;

use std::sync::Arc;
use zabbot_core::error::{MonitoringError, ToolError};
use zabbot_core::monitoring::MonitoringClient;
use zabbot_core::tool::ToolRegistry;

pub use acknowledge_problem::AcknowledgeProblemTool;
pub use create_host::CreateHostTool;
pub use get_host_groups::GetHostGroupsTool;
pub use get_templates::GetTemplatesTool;
pub use schedule_maintenance::ScheduleMaintenanceTool;
pub use update_host_status::UpdateHostStatusTool;

/// The full tool catalog, in the order it is presented to the model.
pub fn catalog(client: Arc<dyn MonitoringClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CreateHostTool::new(client.clone())));
    registry.register(Box::new(GetTemplatesTool::new(client.clone())));
    registry.register(Box::new(GetHostGroupsTool::new(client.clone())));
    registry.register(Box::new(AcknowledgeProblemTool::new(client.clone())));
    registry.register(Box::new(ScheduleMaintenanceTool::new(client.clone())));
    registry.register(Box::new(UpdateHostStatusTool::new(client)));
    registry
}

/// Render a monitoring result as the text fed back to the model.
pub(crate) fn render(result: &serde_json::Value) -> String {
    match result {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Wrap a collaborator failure for the tool that hit it.
pub(crate) fn failed(tool_name: &str, error: MonitoringError) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool_name.to_string(),
        reason: error.to_string(),
    }
}
