//! In-memory monitoring client that records every call.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;
use zabbot_core::error::MonitoringError;
use zabbot_core::monitoring::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateHost(HostSpec),
    GetTemplates(Option<String>),
    GetHostGroups,
    Acknowledge(String, String),
    Maintenance(MaintenanceWindow),
    UpdateStatus(String, HostStatus),
}

#[derive(Default)]
pub struct RecordingMonitor {
    pub calls: Mutex<Vec<Call>>,
    /// When set, every call fails with this message
    pub fail_with: Option<String>,
}

impl RecordingMonitor {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call, result: Value) -> Result<Value, MonitoringError> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(message) => Err(MonitoringError::Api {
                code: -32602,
                message: "Invalid params.".into(),
                data: message.clone(),
            }),
            None => Ok(result),
        }
    }
}

#[async_trait]
impl MonitoringClient for RecordingMonitor {
    async fn create_host(&self, spec: &HostSpec) -> Result<Value, MonitoringError> {
        self.record(Call::CreateHost(spec.clone()), json!({"hostids": ["10500"]}))
    }

    async fn get_templates(&self, search: Option<&str>) -> Result<Value, MonitoringError> {
        self.record(
            Call::GetTemplates(search.map(String::from)),
            json!([{"templateid": "10001", "name": "Linux by Zabbix agent"}]),
        )
    }

    async fn get_host_groups(&self) -> Result<Value, MonitoringError> {
        self.record(
            Call::GetHostGroups,
            json!([{"groupid": "2", "name": "Linux servers"}]),
        )
    }

    async fn acknowledge_problem(
        &self,
        event_id: &str,
        message: &str,
    ) -> Result<Value, MonitoringError> {
        self.record(
            Call::Acknowledge(event_id.into(), message.into()),
            json!({"eventids": [event_id]}),
        )
    }

    async fn schedule_maintenance(
        &self,
        window: &MaintenanceWindow,
    ) -> Result<Value, MonitoringError> {
        self.record(Call::Maintenance(window.clone()), json!({"maintenanceids": ["3"]}))
    }

    async fn update_host_status(
        &self,
        host_id: &str,
        status: HostStatus,
    ) -> Result<Value, MonitoringError> {
        self.record(
            Call::UpdateStatus(host_id.into(), status),
            json!({"hostids": [host_id]}),
        )
    }

    async fn get_problems(&self) -> Result<Vec<Problem>, MonitoringError> {
        Ok(Vec::new())
    }

    async fn get_hosts(&self) -> Result<Vec<HostSummary>, MonitoringError> {
        Ok(Vec::new())
    }
}
