use std::path::Path;

use anyhow::Result;
use chatguard_config::{Config, SettingKey};

use crate::cli::SettingsCommands;

pub fn handle(cmd: SettingsCommands, config: Config, path: Option<&Path>) -> Result<()> {
    match cmd {
        SettingsCommands::Show => {
            show(&config);
            Ok(())
        }
        SettingsCommands::Set { key, value } => set(config, path, &key, value),
    }
}

fn show(config: &Config) {
    println!("Settings:");
    for key in SettingKey::ALL {
        println!("  {:<24} {}", key.as_str(), config.settings.get(key));
    }
}

fn set(mut config: Config, path: Option<&Path>, key: &str, value: bool) -> Result<()> {
    let key: SettingKey = key.parse()?;
    config.settings = config.settings.with(key, value);

    match path {
        Some(path) => config.save_to(path)?,
        None => config.save()?,
    }

    println!("✓ {} = {}", key, value);
    Ok(())
}
