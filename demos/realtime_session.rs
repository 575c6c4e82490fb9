//! One realtime session from connect to disconnect.
//!
//! Demonstrates:
//! - Building a ConnectionManager from environment configuration
//! - Wildcard and exact subscriptions
//! - Waiting for a specific server event with a timeout
//! - Handling the local `close` event
//!
//! Usage:
//!   REALTIME_API_KEY=sk-... cargo run --example realtime_session
//!   cargo run --example realtime_session -- --offline
//!   cargo run --example realtime_session -- --debug --model gpt-4o-realtime-preview

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::{Context, bail};
use common::Args;
use realtime_client::{ConnectOptions, ConnectionManager, MemoryTransport};
use serde_json::json;

// ============================================================================
// Constants
// ============================================================================

const REPLY_TIMEOUT: Duration = Duration::from_secs(15);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Realtime Session ===\n");

    // ========================================================================
    // Build Client
    // ========================================================================

    let peer = args.offline.then(MemoryTransport::new);

    let mut builder = ConnectionManager::builder().debug(args.debug);
    if let Some(url) = common::endpoint_url() {
        builder = builder.url(url);
    }
    match (common::credential(), &peer) {
        (Some(key), _) => builder = builder.credential(key),
        (None, Some(_)) => builder = builder.credential("offline"),
        (None, None) => {}
    }
    if let Some(peer) = &peer {
        builder = builder.transport(peer.clone());
    }

    let client = builder
        .build()
        .with_context(|| format!("set {} or pass --offline", common::KEY_VAR))?;
    println!("[Setup] {client:?}");

    client.on("server.*", |event| {
        println!("        <- {}", event.event_type());
    });
    client.on("client.*", |event| {
        println!("        -> {}", event.event_type());
    });
    client.on("close", |event| {
        println!("[Close] error = {}", event.get("error").unwrap_or(&json!(null)));
    });

    // ========================================================================
    // Connect
    // ========================================================================

    println!("\n[Connect] model = {}", args.model);
    let created = client.wait_for_next("server.session.created", Some(REPLY_TIMEOUT));
    client
        .connect(ConnectOptions::new().model(&args.model))
        .await
        .context("connect failed")?;

    if let Some(peer) = &peer {
        peer.inject(r#"{"type":"session.created","event_id":"evt_offline_1"}"#);
    }
    if created.await.is_none() {
        bail!("no session.created within {REPLY_TIMEOUT:?}");
    }

    // ========================================================================
    // Update Session
    // ========================================================================

    println!("\n[Session] Updating instructions");
    let updated = client.wait_for_next("server.session.updated", Some(REPLY_TIMEOUT));
    client.send(
        "session.update",
        Some(json!({
            "session": {
                "modalities": ["text"],
                "instructions": "Answer in one short sentence."
            }
        })),
    )?;

    if let Some(peer) = &peer {
        peer.inject(r#"{"type":"session.updated","event_id":"evt_offline_2"}"#);
    }
    match updated.await {
        Some(event) => println!("        session.updated {:?}", event.event_id()),
        None => bail!("no session.updated within {REPLY_TIMEOUT:?}"),
    }

    // ========================================================================
    // Ask
    // ========================================================================

    println!("\n[Response] Asking a question");
    let done = client.wait_for_next("server.response.done", Some(REPLY_TIMEOUT));
    client.send(
        "conversation.item.create",
        Some(json!({
            "item": {
                "type": "message",
                "role": "user",
                "content": [{ "type": "input_text", "text": "What is Rust?" }]
            }
        })),
    )?;
    client.send("response.create", None)?;

    if let Some(peer) = &peer {
        peer.inject(r#"{"type":"response.done","event_id":"evt_offline_3","response":{"status":"completed"}}"#);
    }
    match done.await {
        Some(event) => println!(
            "        status = {}",
            event
                .get("response")
                .and_then(|r| r.get("status"))
                .unwrap_or(&json!("unknown"))
        ),
        None => println!("        no response.done within {REPLY_TIMEOUT:?}"),
    }

    // ========================================================================
    // Disconnect
    // ========================================================================

    client.disconnect();
    if let Some(peer) = &peer {
        println!("\n[Offline] {} frames written", peer.sent().len());
    }

    println!("\n=== Done ===");
    Ok(())
}
