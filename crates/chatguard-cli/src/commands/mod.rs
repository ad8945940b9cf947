pub mod check;
pub mod health;
pub mod settings;
pub mod simulate;

use anyhow::Result;
use chatguard_classifier::{ClassifierClient, FallbackMatcher};
use chatguard_config::Config;
use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;

/// Remote classifier with local fallback, or the local word list alone
pub fn classifier(config: &Config, offline: bool) -> Result<ClassifierClient> {
    if offline {
        return Ok(ClassifierClient::offline(FallbackMatcher::new(
            &config.fallback.extra_words,
        )));
    }
    Ok(ClassifierClient::from_config(config)?)
}

pub fn completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "chatguard", &mut std::io::stdout());
}
