//! `zabbot status`: Check the monitoring backend connection.
//!
//! Read-only: a missing settings file is reported, not created.

use zabbot_config::SettingsStore;
use zabbot_core::monitoring::MonitoringClient;
use zabbot_zabbix::ZabbixClient;

pub async fn run() -> anyhow::Result<()> {
    let config = super::load_config()?;
    let monitor = ZabbixClient::new(&config.zabbix)?;
    let settings = SettingsStore::attach(config.settings_path(), &config.agent);

    println!("Zabbot Status");
    println!("=============");
    println!("  Zabbix:     {}", config.zabbix.url);
    println!("  Gateway:    {}:{}", config.gateway.host, config.gateway.port);

    match monitor.get_hosts().await {
        Ok(hosts) => println!("  Connected:  yes ({} hosts)", hosts.len()),
        Err(e) => println!("  Connected:  no ({e})"),
    }
    println!("  Provider:   {}", provider_line(&settings));

    Ok(())
}

fn provider_line(settings: &SettingsStore) -> String {
    if !settings.path().exists() {
        return format!(
            "not configured ({} does not exist yet; `zabbot serve` creates it)",
            settings.path().display()
        );
    }
    match settings.snapshot() {
        Ok(agent) => match agent.credentials_error() {
            None => format!("{} ({})", agent.provider(), agent.model_id),
            Some(problem) => format!("{} (not ready: {problem})", agent.provider()),
        },
        Err(e) => format!("unavailable ({e})"),
    }
}
