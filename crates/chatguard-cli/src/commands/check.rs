use anyhow::Result;
use chatguard_config::Config;
use chatguard_redact::Redactor;
use serde_json::json;

pub async fn handle(config: &Config, text: &str, offline: bool, json: bool) -> Result<()> {
    let client = super::classifier(config, offline)?;
    let result = client.classify(text).await;

    let (redacted, redactions) = if result.is_offensive {
        Redactor::new().redact(text, &result.offending_tokens)
    } else {
        (text.to_string(), Vec::new())
    };

    if json {
        let output = json!({
            "text": text,
            "is_offensive": result.is_offensive,
            "offensive_words": result.offending_tokens,
            "redacted": redacted,
            "redactions": redactions,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if !result.is_offensive {
        println!("✓ Clean");
        return Ok(());
    }

    println!("✗ Offensive");
    if result.masks_whole_text() {
        println!("  No specific words identified; whole text masked");
    } else {
        println!("  Words: {}", result.offending_tokens.join(", "));
    }
    for info in &redactions {
        if let Some(token) = &info.token {
            println!("    {}: {} occurrence(s)", token, info.count);
        }
    }
    println!("  Redacted: {}", redacted);

    Ok(())
}
