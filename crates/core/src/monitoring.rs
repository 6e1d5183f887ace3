//! MonitoringClient trait: the abstraction over the monitoring control plane.
//!
//! Tools call into this; the Zabbix JSON-RPC client implements it. Every
//! operation returns the backend's raw JSON result so tools can hand it back to
//! the model verbatim.
//!
//! Identifier fields (`host_id`, `event_id`) may hold a human-readable name;
//! implementations resolve non-numeric values to internal ids.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MonitoringError;

/// Interface used to poll a host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceType {
    #[default]
    Agent = 1,
    Snmp = 2,
    Ipmi = 3,
    Jmx = 4,
}

impl InterfaceType {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Agent),
            2 => Some(Self::Snmp),
            3 => Some(Self::Ipmi),
            4 => Some(Self::Jmx),
            _ => None,
        }
    }
}

/// Everything needed to register a monitored host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSpec {
    pub host_name: String,
    pub ip_address: String,
    pub group_id: String,
    #[serde(default)]
    pub template_ids: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub interface_type: InterfaceType,
    pub port: String,
}

/// Monitoring state of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostStatus {
    /// Status `0`: monitoring enabled
    Monitored,
    /// Status `1`: monitoring disabled
    Unmonitored,
}

impl HostStatus {
    pub fn code(self) -> i64 {
        match self {
            Self::Monitored => 0,
            Self::Unmonitored => 1,
        }
    }

    /// Parse the wire code. Only `"0"` and `"1"` are valid.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Self::Monitored),
            "1" => Some(Self::Unmonitored),
            _ => None,
        }
    }
}

/// A one-off maintenance window starting at a fixed instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    pub host_id: String,
    pub description: String,
    /// Unix seconds
    pub active_since: i64,
    /// Unix seconds
    pub active_till: i64,
}

impl MaintenanceWindow {
    pub fn starting_at(
        host_id: impl Into<String>,
        description: impl Into<String>,
        start: DateTime<Utc>,
        minutes: u32,
    ) -> Self {
        let active_since = start.timestamp();
        Self {
            host_id: host_id.into(),
            description: description.into(),
            active_since,
            active_till: active_since + i64::from(minutes) * 60,
        }
    }

    pub fn period_secs(&self) -> i64 {
        self.active_till - self.active_since
    }
}

/// An active problem, as used for situational context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub event_id: String,
    pub name: String,
    pub severity: String,
    pub acknowledged: bool,
}

/// A monitored host, as used for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSummary {
    pub host_id: String,
    pub name: String,
    pub monitored: bool,
}

/// The monitoring control plane, as seen by the tools.
#[async_trait]
pub trait MonitoringClient: Send + Sync {
    async fn create_host(&self, spec: &HostSpec) -> Result<Value, MonitoringError>;

    async fn get_templates(&self, search: Option<&str>) -> Result<Value, MonitoringError>;

    async fn get_host_groups(&self) -> Result<Value, MonitoringError>;

    async fn acknowledge_problem(&self, event_id: &str, message: &str)
    -> Result<Value, MonitoringError>;

    async fn schedule_maintenance(&self, window: &MaintenanceWindow)
    -> Result<Value, MonitoringError>;

    async fn update_host_status(&self, host_id: &str, status: HostStatus)
    -> Result<Value, MonitoringError>;

    /// Recent problems, newest first.
    async fn get_problems(&self) -> Result<Vec<Problem>, MonitoringError>;

    async fn get_hosts(&self) -> Result<Vec<HostSummary>, MonitoringError>;
}
