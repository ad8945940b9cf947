use anyhow::Result;
use chatguard_classifier::RemoteClassifier;
use chatguard_config::Config;

pub async fn handle(config: &Config) -> Result<()> {
    let remote = RemoteClassifier::new(&config.api)?;

    match remote.health().await {
        Ok(status) if status.is_ok() => {
            println!("✓ Classifier is up");
            println!("  Endpoint: {}", remote.endpoint());
            Ok(())
        }
        Ok(status) => anyhow::bail!(
            "classifier at {} reported status '{}'",
            remote.endpoint(),
            status.status
        ),
        Err(e) => anyhow::bail!(
            "classifier at {} is unreachable: {} (the local word list will be used)",
            remote.endpoint(),
            e
        ),
    }
}
