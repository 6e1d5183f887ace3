use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use zabbot_core::error::ToolError;
use zabbot_core::message::Arguments;
use zabbot_core::monitoring::MonitoringClient;
use zabbot_core::tool::Tool;

pub struct GetHostGroupsTool {
    client: Arc<dyn MonitoringClient>,
}

impl GetHostGroupsTool {
    pub fn new(client: Arc<dyn MonitoringClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetHostGroupsTool {
    fn name(&self) -> &str {
        "get_host_groups"
    }

    fn description(&self) -> &str {
        "Get a list of available host groups in Zabbix. Use this to help find the correct group_id."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _arguments: &Arguments) -> Result<String, ToolError> {
        let result = self
            .client
            .get_host_groups()
            .await
            .map_err(|e| crate::failed(self.name(), e))?;
        Ok(crate::render(&result))
    }
}
