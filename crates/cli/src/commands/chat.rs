//! `zabbot chat`: One stateless exchange with the agent.

use zabbot_gateway::GatewayState;
use zabbot_gateway::api::gather_context;

pub async fn run(message: &str) -> anyhow::Result<()> {
    let config = super::load_config()?;
    let state = GatewayState::from_config(&config).map_err(|e| anyhow::anyhow!("{e}"))?;

    let agent_config = state.settings.snapshot()?;
    tracing::debug!(provider = %agent_config.provider(), model = %agent_config.model_id, "Chat");

    let context = gather_context(state.monitor.as_ref()).await;
    let reply = state.agent.chat(message, context.as_ref(), &agent_config).await;

    println!("{reply}");
    Ok(())
}
