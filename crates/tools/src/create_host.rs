//! Host registration.
//!
//! The system prompt tells the model to interview the operator (platform,
//! connection method, templates) and confirm before calling this tool.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use zabbot_core::error::ToolError;
use zabbot_core::message::Arguments;
use zabbot_core::monitoring::{HostSpec, InterfaceType, MonitoringClient};
use zabbot_core::tool::{Tool, int_arg, opt_str_arg, str_arg};

const DEFAULT_AGENT_PORT: &str = "10050";

pub struct CreateHostTool {
    client: Arc<dyn MonitoringClient>,
}

impl CreateHostTool {
    pub fn new(client: Arc<dyn MonitoringClient>) -> Self {
        Self { client }
    }

    fn spec_from(arguments: &Arguments) -> Result<HostSpec, ToolError> {
        let interface_type = match int_arg(arguments, "interface_type")? {
            None => InterfaceType::Agent,
            Some(code) => InterfaceType::from_code(code).ok_or_else(|| {
                ToolError::InvalidArguments(format!(
                    "interface_type must be 1 (Agent), 2 (SNMP), 3 (IPMI) or 4 (JMX), got {code}"
                ))
            })?,
        };

        let template_ids = arguments
            .get("template_ids")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(HostSpec {
            host_name: str_arg(arguments, "host_name")?.to_string(),
            ip_address: str_arg(arguments, "ip_address")?.to_string(),
            group_id: str_arg(arguments, "group_id")?.to_string(),
            template_ids,
            description: opt_str_arg(arguments, "description")
                .unwrap_or_default()
                .to_string(),
            interface_type,
            port: opt_str_arg(arguments, "port")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(DEFAULT_AGENT_PORT)
                .to_string(),
        })
    }
}

#[async_trait]
impl Tool for CreateHostTool {
    fn name(&self) -> &str {
        "create_host"
    }

    fn description(&self) -> &str {
        "Create a new host in Zabbix. ONLY use this after gathering all necessary info (OS, Templates, Interface)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "host_name": { "type": "string", "description": "The visible name of the host" },
                "ip_address": { "type": "string", "description": "The IP address of the host" },
                "group_id": { "type": "string", "description": "The ID of the host group." },
                "template_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "List of Template IDs to link."
                },
                "description": { "type": "string", "description": "Description of the host's purpose." },
                "interface_type": {
                    "type": "integer",
                    "description": "1=Agent, 2=SNMP, 3=IPMI, 4=JMX. Default 1."
                },
                "port": { "type": "string", "description": "Port number. Default 10050." }
            },
            "required": ["host_name", "ip_address", "group_id"]
        })
    }

    async fn execute(&self, arguments: &Arguments) -> Result<String, ToolError> {
        let spec = Self::spec_from(arguments)?;
        let result = self
            .client
            .create_host(&spec)
            .await
            .map_err(|e| crate::failed(self.name(), e))?;
        Ok(crate::render(&result))
    }
}
