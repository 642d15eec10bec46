//! Chat example binary
//!
//! Appends every command-line argument to the conversation (`world` when none
//! is given) and prints each snapshot as a JSON line on stdout.
//!
//! Logs go to stderr; tune them with `RUST_LOG`. Store settings come from the
//! `SIMPLE_STATE_*` environment variables.

use anyhow::Context;
use chat::{ADD_MESSAGE, ChatState, build_store};
use serde_json::json;
use simple_state_runtime::{Snapshot, StoreConfig, metrics::register_metrics};
use std::io::Write;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat=debug,simple_state_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    register_metrics();

    let config = StoreConfig::from_env().context("invalid store configuration")?;
    let store = build_store(ChatState::new("hello"), config)?;

    store.connect(|snapshot: &Snapshot<ChatState>| {
        let line = serde_json::to_string(snapshot)?;
        writeln!(std::io::stdout().lock(), "{line}")?;
        Ok(())
    });

    store.on(ADD_MESSAGE, |state: &ChatState| {
        tracing::info!(lines = state.content.lines().count(), "Message added");
    })?;

    let mut messages: Vec<String> = std::env::args().skip(1).collect();
    if messages.is_empty() {
        messages.push("world".to_string());
    }

    for message in messages {
        store
            .dispatch(ADD_MESSAGE, &[json!(message)])
            .with_context(|| format!("failed to add {message:?}"))?;
    }

    tracing::info!(
        version = store.version(),
        dead_letters = store.dead_letters().len(),
        "Conversation complete"
    );
    Ok(())
}
