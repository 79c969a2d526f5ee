//! Guest mini-app talking newline-delimited JSON over stdio.
//!
//! Run with: cargo run -p naji-bridge --example stdio_guest
//!
//! Then play the host by typing frames, for example:
//!
//! ```text
//! {"type":"NAJI_INIT_DATA","user":{"username":"ann"},"theme":"dark"}
//! {"type":"NAJI_ASYNC_RESPONSE","reqId":"<id from stdout>","result":42}
//! {"type":"NAJI_EVENT","eventName":"themeChanged","payload":{"theme":"light"}}
//! ```

use std::io;
use std::time::Duration;

use naji_bridge::{Bridge, BridgeConfig, StreamTransport, ThemeChanged};
use serde_json::json;
use tokio::sync::oneshot;
use tracing::info;

#[tokio::main]
async fn main() -> naji_bridge::Result<()> {
    // Logs go to stderr; stdout carries frames.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = BridgeConfig::default().with_request_timeout(Duration::from_secs(60));
    let bridge = Bridge::connect(StreamTransport::stdio(), config)?;

    let (init_tx, init_rx) = oneshot::channel();
    bridge.on_init(move |session| {
        let _ = init_tx.send(session.nickname().map(str::to_string));
    });
    bridge.on(|event: &ThemeChanged| info!("Theme is now {}", event.theme.as_str()));

    let nickname = init_rx.await.ok().flatten();
    info!("Hello, {}", nickname.as_deref().unwrap_or("guest"));
    bridge.notify("APP_READY", ());

    let (score, address) = futures::join!(
        bridge.request("STORAGE_GET", json!({ "key": "score" })),
        bridge.request("GET_SOLANA_ADDRESS", ()),
    );
    info!("score = {:?}, wallet = {:?}", score, address);

    Ok(())
}
