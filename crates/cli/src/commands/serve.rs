//! `zabbot serve`: Start the HTTP API server.

pub async fn run(port_override: Option<u16>) -> anyhow::Result<()> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Zabbot Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Zabbix:    {}", config.zabbix.url);

    zabbot_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway failed: {e}"))?;

    Ok(())
}
