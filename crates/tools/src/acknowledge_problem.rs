use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use zabbot_core::error::ToolError;
use zabbot_core::message::Arguments;
use zabbot_core::monitoring::MonitoringClient;
use zabbot_core::tool::{Tool, str_arg};

/// Acknowledge a problem with a comment. The event may be named instead of
/// numbered; the client resolves it to the most recent matching event.
pub struct AcknowledgeProblemTool {
    client: Arc<dyn MonitoringClient>,
}

impl AcknowledgeProblemTool {
    pub fn new(client: Arc<dyn MonitoringClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for AcknowledgeProblemTool {
    fn name(&self) -> &str {
        "acknowledge_problem"
    }

    fn description(&self) -> &str {
        "Acknowledge a problem in Zabbix. Use this when the user wants to take ownership of an alert or leave a comment."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "event_id": {
                    "type": "string",
                    "description": "The Event ID or precise Name of the problem to acknowledge."
                },
                "message": {
                    "type": "string",
                    "description": "The comment or message to leave on the problem."
                }
            },
            "required": ["event_id", "message"]
        })
    }

    async fn execute(&self, arguments: &Arguments) -> Result<String, ToolError> {
        let event_id = str_arg(arguments, "event_id")?;
        let message = str_arg(arguments, "message")?;
        let result = self
            .client
            .acknowledge_problem(event_id, message)
            .await
            .map_err(|e| crate::failed(self.name(), e))?;
        Ok(crate::render(&result))
    }
}
