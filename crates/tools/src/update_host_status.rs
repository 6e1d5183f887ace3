use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use zabbot_core::error::ToolError;
use zabbot_core::message::Arguments;
use zabbot_core::monitoring::{HostStatus, MonitoringClient};
use zabbot_core::tool::{Tool, str_arg};

/// Enable (`"0"`) or disable (`"1"`) monitoring for a host.
pub struct UpdateHostStatusTool {
    client: Arc<dyn MonitoringClient>,
}

impl UpdateHostStatusTool {
    pub fn new(client: Arc<dyn MonitoringClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for UpdateHostStatusTool {
    fn name(&self) -> &str {
        "update_host_status"
    }

    fn description(&self) -> &str {
        "Enable or disable monitoring for a specific host."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "host_id": { "type": "string", "description": "The Host ID or Hostname." },
                "status": {
                    "type": "string",
                    "enum": ["0", "1"],
                    "description": "0 to Enable/Monitor, 1 to Disable/Stop Monitoring."
                }
            },
            "required": ["host_id", "status"]
        })
    }

    async fn execute(&self, arguments: &Arguments) -> Result<String, ToolError> {
        let host_id = str_arg(arguments, "host_id")?;
        let code = str_arg(arguments, "status")?;
        let status = HostStatus::from_code(code).ok_or_else(|| {
            ToolError::InvalidArguments(format!("status must be \"0\" or \"1\", got {code:?}"))
        })?;

        let result = self
            .client
            .update_host_status(host_id, status)
            .await
            .map_err(|e| crate::failed(self.name(), e))?;
        Ok(crate::render(&result))
    }
}
