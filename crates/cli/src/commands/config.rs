//! `zabbot config`: Show the agent settings with secrets masked.

use anyhow::Context;
use zabbot_config::SettingsStore;

pub fn run() -> anyhow::Result<()> {
    let config = super::load_config()?;
    let store = SettingsStore::open(config.settings_path(), &config.agent)?;
    let settings = store.load()?.masked();

    println!("# {}", store.path().display());
    print!(
        "{}",
        toml::to_string_pretty(&settings).context("Failed to render settings")?
    );
    Ok(())
}
