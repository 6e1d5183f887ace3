pub mod chat;
pub mod config;
pub mod serve;
pub mod status;

use anyhow::Context;
use zabbot_config::AppConfig;

fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("Failed to load config")
}
