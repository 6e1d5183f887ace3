//! Zabbix JSON-RPC client.
//!
//! Implements [`MonitoringClient`] against `<url>/api_jsonrpc.php`. The client
//! logs in lazily on first use, caches the session token, and logs in again
//! once if the server reports the session as expired.

pub mod rpc;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zabbot_config::ZabbixConfig;
use zabbot_core::error::MonitoringError;
use zabbot_core::monitoring::{
    HostSpec, HostStatus, HostSummary, MaintenanceWindow, MonitoringClient, Problem,
};

/// A Zabbix API client shared by all requests.
pub struct ZabbixClient {
    endpoint: String,
    user: String,
    password: String,
    http: reqwest::Client,
    token: Mutex<Option<String>>,
    next_id: AtomicU64,
}

impl ZabbixClient {
    pub fn new(config: &ZabbixConfig) -> Result<Self, MonitoringError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| MonitoringError::Connection(e.to_string()))?;

        info!(url = %config.url, "Zabbix client initialized");
        Ok(Self {
            endpoint: api_endpoint(&config.url),
            user: config.user.clone(),
            password: config.password.clone(),
            http,
            token: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Perform one JSON-RPC call, authenticated with `token` when given.
    async fn post(
        &self,
        method: &str,
        params: &Value,
        token: Option<&str>,
    ) -> Result<Value, MonitoringError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "Zabbix API call");

        let mut request = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json-rpc")
            .json(&rpc::Request::new(method, params, id));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MonitoringError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitoringError::Connection(format!(
                "HTTP {} from {}",
                status.as_u16(),
                self.endpoint
            )));
        }

        let envelope: rpc::Response = response
            .json()
            .await
            .map_err(|e| MonitoringError::InvalidResponse(e.to_string()))?;
        envelope.into_result()
    }

    /// The cached session token, logging in first if there is none.
    async fn session(&self) -> Result<String, MonitoringError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }

        info!(user = %self.user, "Logging in to Zabbix API");
        let result = self
            .post("user.login", &rpc::login_params(&self.user, &self.password), None)
            .await
            .inspect_err(|e| warn!(error = %e, "Zabbix login failed"))?;
        let token = result
            .as_str()
            .ok_or_else(|| MonitoringError::InvalidResponse("user.login did not return a token".into()))?
            .to_string();
        *guard = Some(token.clone());
        Ok(token)
    }

    /// An authenticated call, retried once after re-login if the session expired.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, MonitoringError> {
        let token = self.session().await?;
        match self.post(method, &params, Some(&token)).await {
            Err(e) if rpc::is_session_expired(&e) => {
                warn!(method, "Zabbix session expired, logging in again");
                self.token.lock().await.take();
                let token = self.session().await?;
                self.post(method, &params, Some(&token)).await
            }
            other => other,
        }
    }

    /// Resolve a host name (visible name first, then technical name) to its id.
    async fn resolve_host(&self, host: &str) -> Result<String, MonitoringError> {
        if rpc::is_numeric_id(host) {
            return Ok(host.to_string());
        }
        for field in ["name", "host"] {
            let result = self
                .call("host.get", rpc::host_lookup_params(field, host))
                .await?;
            if let Some(id) = rpc::first_id(&result, "hostid") {
                debug!(host, id = %id, "Resolved host name");
                return Ok(id);
            }
        }
        Err(MonitoringError::NotFound(format!(
            "Could not find host with name: {host}"
        )))
    }

    /// Resolve a problem name to the event id of its most recent occurrence.
    async fn resolve_problem(&self, event: &str) -> Result<String, MonitoringError> {
        if rpc::is_numeric_id(event) {
            return Ok(event.to_string());
        }
        let result = self
            .call("problem.get", rpc::problem_lookup_params(event))
            .await?;
        rpc::first_id(&result, "eventid").ok_or_else(|| {
            MonitoringError::NotFound(format!("Could not find problem with name: {event}"))
        })
    }
}

/// `<base>/api_jsonrpc.php`, tolerating a base that already names the script.
fn api_endpoint(url: &str) -> String {
    let base = url.trim_end_matches('/');
    if base.ends_with("api_jsonrpc.php") {
        base.to_string()
    } else {
        format!("{base}/api_jsonrpc.php")
    }
}

#[async_trait]
impl MonitoringClient for ZabbixClient {
    async fn create_host(&self, spec: &HostSpec) -> Result<Value, MonitoringError> {
        let result = self
            .call("host.create", rpc::create_host_params(spec))
            .await?;
        info!(host = %spec.host_name, "Host created");
        Ok(result)
    }

    async fn get_templates(&self, search: Option<&str>) -> Result<Value, MonitoringError> {
        self.call("template.get", rpc::template_search_params(search))
            .await
    }

    async fn get_host_groups(&self) -> Result<Value, MonitoringError> {
        self.call("hostgroup.get", rpc::host_group_params()).await
    }

    async fn acknowledge_problem(
        &self,
        event_id: &str,
        message: &str,
    ) -> Result<Value, MonitoringError> {
        let event_id = self.resolve_problem(event_id).await?;
        let result = self
            .call("event.acknowledge", rpc::acknowledge_params(&event_id, message))
            .await?;
        info!(event_id = %event_id, "Problem acknowledged");
        Ok(result)
    }

    async fn schedule_maintenance(
        &self,
        window: &MaintenanceWindow,
    ) -> Result<Value, MonitoringError> {
        let host_id = self.resolve_host(&window.host_id).await?;
        let window = MaintenanceWindow {
            host_id,
            ..window.clone()
        };
        let result = self
            .call("maintenance.create", rpc::maintenance_params(&window))
            .await?;
        info!(host_id = %window.host_id, secs = window.period_secs(), "Maintenance scheduled");
        Ok(result)
    }

    async fn update_host_status(
        &self,
        host_id: &str,
        status: HostStatus,
    ) -> Result<Value, MonitoringError> {
        let host_id = self.resolve_host(host_id).await?;
        let result = self
            .call("host.update", rpc::host_status_params(&host_id, status))
            .await?;
        info!(host_id = %host_id, status = status.code(), "Host status updated");
        Ok(result)
    }

    async fn get_problems(&self) -> Result<Vec<Problem>, MonitoringError> {
        let result = self.call("problem.get", rpc::problems_params()).await?;
        rpc::parse_problems(&result)
    }

    async fn get_hosts(&self) -> Result<Vec<HostSummary>, MonitoringError> {
        let result = self.call("host.get", rpc::hosts_params()).await?;
        rpc::parse_hosts(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_script() {
        assert_eq!(
            api_endpoint("http://127.0.0.1/zabbix"),
            "http://127.0.0.1/zabbix/api_jsonrpc.php"
        );
        assert_eq!(
            api_endpoint("https://zbx.example.com/"),
            "https://zbx.example.com/api_jsonrpc.php"
        );
        assert_eq!(
            api_endpoint("https://zbx.example.com/api_jsonrpc.php"),
            "https://zbx.example.com/api_jsonrpc.php"
        );
    }

    #[test]
    fn client_from_default_config() {
        let client = ZabbixClient::new(&ZabbixConfig::default()).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1/zabbix/api_jsonrpc.php");
    }

    #[tokio::test]
    async fn numeric_identifiers_skip_lookup() {
        let client = ZabbixClient::new(&ZabbixConfig::default()).unwrap();
        // No server is contacted for ids that are already numeric
        assert_eq!(client.resolve_host("10084").await.unwrap(), "10084");
        assert_eq!(client.resolve_problem("42").await.unwrap(), "42");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let config = ZabbixConfig {
            url: "http://127.0.0.1:1".into(),
            timeout_secs: 2,
            ..ZabbixConfig::default()
        };
        let client = ZabbixClient::new(&config).unwrap();
        let err = client.get_host_groups().await.unwrap_err();
        assert!(matches!(err, MonitoringError::Connection(_)));
    }
}
