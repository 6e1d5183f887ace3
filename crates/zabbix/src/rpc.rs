//! JSON-RPC 2.0 envelope and the parameter shapes of the methods we call.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use zabbot_core::error::MonitoringError;
use zabbot_core::monitoring::{HostSpec, HostStatus, HostSummary, MaintenanceWindow, Problem};

/// Acknowledge (2) + add message (4).
pub const ACKNOWLEDGE_WITH_MESSAGE: i64 = 6;

/// `timeperiod_type` for a one-off maintenance period.
const ONE_TIME_ONLY: i64 = 0;

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: &'a Value,
    pub id: u64,
}

impl<'a> Request<'a> {
    pub fn new(method: &'a str, params: &'a Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: String,
}

impl Response {
    /// Unwrap the envelope into the result or a typed API error.
    pub fn into_result(self) -> Result<Value, MonitoringError> {
        match (self.error, self.result) {
            (Some(e), _) => Err(MonitoringError::Api {
                code: e.code,
                message: e.message,
                data: e.data,
            }),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(MonitoringError::InvalidResponse(
                "response carries neither result nor error".into(),
            )),
        }
    }
}

/// Whether an API error means the session token is no longer valid.
pub fn is_session_expired(error: &MonitoringError) -> bool {
    match error {
        MonitoringError::Api { message, data, .. } => {
            let text = format!("{message} {data}").to_ascii_lowercase();
            text.contains("re-login") || text.contains("session terminated") || text.contains("not authorized")
        }
        _ => false,
    }
}

/// True for values that are already internal ids rather than names.
pub fn is_numeric_id(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

pub fn login_params(user: &str, password: &str) -> Value {
    json!({ "username": user, "password": password })
}

pub fn create_host_params(spec: &HostSpec) -> Value {
    let mut params = json!({
        "host": spec.host_name,
        "interfaces": [{
            "type": spec.interface_type.code(),
            "main": 1,
            "useip": if spec.ip_address.is_empty() { 0 } else { 1 },
            "ip": spec.ip_address,
            "dns": "",
            "port": spec.port,
        }],
        "groups": [{ "groupid": spec.group_id }],
        "description": spec.description,
    });
    if !spec.template_ids.is_empty() {
        params["templates"] = spec
            .template_ids
            .iter()
            .map(|id| json!({ "templateid": id }))
            .collect();
    }
    params
}

pub fn template_search_params(search: Option<&str>) -> Value {
    let mut params = json!({ "output": ["templateid", "name"] });
    if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
        params["search"] = json!({ "name": term });
    }
    params
}

pub fn host_group_params() -> Value {
    json!({ "output": ["groupid", "name"] })
}

pub fn host_lookup_params(field: &str, name: &str) -> Value {
    json!({ "filter": { field: name }, "output": ["hostid"] })
}

pub fn problem_lookup_params(name: &str) -> Value {
    json!({
        "search": { "name": name },
        "output": ["eventid"],
        "limit": 1,
        "recent": true,
    })
}

pub fn acknowledge_params(event_id: &str, message: &str) -> Value {
    json!({
        "eventids": event_id,
        "action": ACKNOWLEDGE_WITH_MESSAGE,
        "message": message,
    })
}

pub fn maintenance_params(window: &MaintenanceWindow) -> Value {
    json!({
        "name": format!("AI Maintenance: {}", window.description),
        "active_since": window.active_since,
        "active_till": window.active_till,
        "hostids": [window.host_id],
        "timeperiods": [{
            "timeperiod_type": ONE_TIME_ONLY,
            "start_date": window.active_since,
            "period": window.period_secs(),
        }],
    })
}

pub fn host_status_params(host_id: &str, status: HostStatus) -> Value {
    json!({ "hostid": host_id, "status": status.code() })
}

pub fn problems_params() -> Value {
    json!({
        "output": "extend",
        "recent": true,
        "sortfield": ["eventid"],
        "sortorder": "DESC",
        "limit": 20,
    })
}

pub fn hosts_params() -> Value {
    json!({ "output": ["hostid", "host", "name", "status"] })
}

/// The first `field` of the first element of an array result.
pub fn first_id(result: &Value, field: &str) -> Option<String> {
    result.get(0)?.get(field)?.as_str().map(String::from)
}

pub fn parse_problems(result: &Value) -> Result<Vec<Problem>, MonitoringError> {
    let rows = result
        .as_array()
        .ok_or_else(|| MonitoringError::InvalidResponse("problem.get did not return a list".into()))?;
    Ok(rows
        .iter()
        .map(|row| Problem {
            event_id: text(row, "eventid"),
            name: text(row, "name"),
            severity: text(row, "severity"),
            acknowledged: row["acknowledged"].as_str() == Some("1"),
        })
        .collect())
}

pub fn parse_hosts(result: &Value) -> Result<Vec<HostSummary>, MonitoringError> {
    let rows = result
        .as_array()
        .ok_or_else(|| MonitoringError::InvalidResponse("host.get did not return a list".into()))?;
    Ok(rows
        .iter()
        .map(|row| HostSummary {
            host_id: text(row, "hostid"),
            name: row["name"]
                .as_str()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| row["host"].as_str().unwrap_or_default())
                .to_string(),
            monitored: row["status"].as_str() == Some("0"),
        })
        .collect())
}

fn text(row: &Value, field: &str) -> String {
    row[field].as_str().unwrap_or_default().to_string()
}
