//! Simulate command - drive the pipeline against an in-process page

use std::time::Duration;

use anyhow::Result;
use chatguard_config::{Config, MemorySettingsStore};
use chatguard_core::element::{ATTR_CONTAINS_OFFENSIVE, ATTR_OFFENSIVE_WORDS};
use chatguard_core::{Document, DomError, NodeId, Page, markup};
use chatguard_engine::{ChatGuard, NOTIFICATION_CLASS};
use tokio::time::{Instant, sleep};

const FIELD_NAME: &str = "message";
const POLL: Duration = Duration::from_millis(50);

pub async fn handle(
    config: &Config,
    edits: Vec<String>,
    contenteditable: bool,
    offline: bool,
    host: String,
) -> Result<()> {
    let classifier = super::classifier(config, offline)?;
    let (page, form, field) = build_page(&host, contenteditable)?;

    let store = MemorySettingsStore::new(config.settings);
    let guard = ChatGuard::new(page.clone(), &store, classifier, &config.pipeline);
    guard.start();

    // Type faster than the quiet window so only the last edit is classified
    let window = config.pipeline.debounce();
    let mut last = String::new();
    for (i, edit) in edits.iter().enumerate() {
        if i > 0 {
            sleep(window / 2).await;
        }
        page.with(|doc| doc.input_text(field, edit))?;
        last = edit.clone();
    }

    let watched = guard.registry().is_listening(field);
    if watched && markup::char_len(&last) >= config.pipeline.min_text_len {
        wait_for_verdict(&page, field, window + config.api.timeout() + Duration::from_secs(1)).await;
    }

    let (flag, tokens, content) = page.with(|doc| {
        (
            doc.attribute(field, ATTR_CONTAINS_OFFENSIVE).map(str::to_string),
            doc.attribute(field, ATTR_OFFENSIVE_WORDS).map(str::to_string),
            doc.editable_text(field).unwrap_or_default(),
        )
    });
    let notified = page.with(|doc| {
        doc.subtree(doc.root())
            .into_iter()
            .any(|id| doc.has_class(id, NOTIFICATION_CLASS))
    });
    let submission = page.with(|doc| doc.submit(form))?;

    println!("Page: {} ({})", host, if contenteditable { "contenteditable" } else { "textarea" });
    if !watched {
        println!("  Monitoring disabled for this site");
    }
    println!("  Typed:     {}", last);
    match flag.as_deref() {
        Some("true") => println!(
            "  Verdict:   offensive {}",
            tokens.as_deref().filter(|t| !t.is_empty()).unwrap_or("[]")
        ),
        Some(_) => println!("  Verdict:   clean"),
        None => println!("  Verdict:   not classified"),
    }
    println!("  Content:   {}", content);
    println!("  Notified:  {}", if notified { "yes" } else { "no" });
    println!(
        "  Submitted: {}",
        submission.get(FIELD_NAME).unwrap_or_default()
    );

    Ok(())
}

/// Form with a single named editable field
fn build_page(host: &str, contenteditable: bool) -> Result<(Page, NodeId, NodeId), DomError> {
    let mut doc = Document::new(host);
    let body = doc.body().ok_or(DomError::NoBody)?;

    let form = doc.create_element("form");
    doc.append_child(body, form)?;

    let field = if contenteditable {
        let div = doc.create_element("div");
        doc.set_attribute(div, "contenteditable", "true")?;
        div
    } else {
        doc.create_element("textarea")
    };
    doc.set_attribute(field, "name", FIELD_NAME)?;
    doc.append_child(form, field)?;

    Ok((Page::new(doc), form, field))
}

/// Poll until the field carries a verdict or `limit` elapses
async fn wait_for_verdict(page: &Page, field: NodeId, limit: Duration) {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if page.with(|doc| doc.attribute(field, ATTR_CONTAINS_OFFENSIVE).is_some()) {
            return;
        }
        sleep(POLL).await;
    }
    tracing::warn!("no verdict within {:?}", limit);
}
