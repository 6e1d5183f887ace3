//! One-off maintenance windows starting now.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;
use zabbot_core::error::ToolError;
use zabbot_core::message::Arguments;
use zabbot_core::monitoring::{MaintenanceWindow, MonitoringClient};
use zabbot_core::tool::{Tool, int_arg, opt_str_arg, str_arg};

const DEFAULT_DESCRIPTION: &str = "AI Agent Maintenance";

pub struct ScheduleMaintenanceTool {
    client: Arc<dyn MonitoringClient>,
    clock: fn() -> DateTime<Utc>,
}

impl ScheduleMaintenanceTool {
    pub fn new(client: Arc<dyn MonitoringClient>) -> Self {
        Self {
            client,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock (tests pin the window start).
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl Tool for ScheduleMaintenanceTool {
    fn name(&self) -> &str {
        "schedule_maintenance"
    }

    fn description(&self) -> &str {
        "Put a host into maintenance mode immediately for a specified duration. This suppresses alerts."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "host_id": {
                    "type": "string",
                    "description": "The Host ID or Hostname to put in maintenance."
                },
                "minutes": {
                    "type": "integer",
                    "description": "Duration of maintenance in minutes."
                },
                "description": {
                    "type": "string",
                    "description": "Reason for maintenance."
                }
            },
            "required": ["host_id", "minutes"]
        })
    }

    async fn execute(&self, arguments: &Arguments) -> Result<String, ToolError> {
        let host_id = str_arg(arguments, "host_id")?;
        let minutes = int_arg(arguments, "minutes")?
            .ok_or_else(|| ToolError::InvalidArguments("missing required argument 'minutes'".into()))?;
        let minutes = u32::try_from(minutes)
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| {
                ToolError::InvalidArguments(format!("minutes must be a positive number, got {minutes}"))
            })?;
        let description = opt_str_arg(arguments, "description")
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION);

        let window = MaintenanceWindow::starting_at(host_id, description, (self.clock)(), minutes);
        debug!(host = %host_id, since = window.active_since, till = window.active_till, "Maintenance window");

        let result = self
            .client
            .schedule_maintenance(&window)
            .await
            .map_err(|e| crate::failed(self.name(), e))?;
        Ok(crate::render(&result))
    }
}
