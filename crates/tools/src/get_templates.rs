use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use zabbot_core::error::ToolError;
use zabbot_core::message::Arguments;
use zabbot_core::monitoring::MonitoringClient;
use zabbot_core::tool::{Tool, str_arg};

/// Template search by name.
pub struct GetTemplatesTool {
    client: Arc<dyn MonitoringClient>,
}

impl GetTemplatesTool {
    pub fn new(client: Arc<dyn MonitoringClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GetTemplatesTool {
    fn name(&self) -> &str {
        "get_templates"
    }

    fn description(&self) -> &str {
        "Search for Zabbix Templates by name. Use to find correct template IDs for the host OS."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "search": {
                    "type": "string",
                    "description": "Search term (e.g. 'Linux', 'Windows', 'Cisco')."
                }
            },
            "required": ["search"]
        })
    }

    async fn execute(&self, arguments: &Arguments) -> Result<String, ToolError> {
        let search = str_arg(arguments, "search")?;
        let result = self
            .client
            .get_templates(Some(search))
            .await
            .map_err(|e| crate::failed(self.name(), e))?;
        Ok(crate::render(&result))
    }
}
