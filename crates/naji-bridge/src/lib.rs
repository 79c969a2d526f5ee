//! Naji Bridge
//!
//! Guest-side message bridge for Naji mini-apps. A mini-app runs inside a
//! sandboxed frame and can only talk to its host through an untyped message
//! channel; this crate turns that channel into awaitable requests, fire-and-forget
//! notifications, a one-shot init handshake and typed host events.
//!
//! # Architecture
//!
//! - [`Bridge`] owns the inbound listener, the pending-request table, the event
//!   subscriber registry and the session state
//! - [`Transport`] is the seam to the actual channel: [`MemoryTransport`] for
//!   tests and host simulators, [`StreamTransport`] for newline-delimited JSON
//!   pipes, and `WindowTransport` for `postMessage` when compiled to wasm32
//! - Every outbound request carries a unique `reqId`; replies are matched to their
//!   caller by that id, and whichever of reply or deadline removes the table entry
//!   first decides the outcome
//!
//! # Example
//!
//! ```rust,ignore
//! let (transport, host) = MemoryTransport::pair();
//! let bridge = Bridge::connect(transport, BridgeConfig::default())?;
//!
//! bridge.on_init(|session| println!("hello {:?}", session.nickname()));
//! let score = bridge.request("STORAGE_GET", json!({ "key": "score" })).await?;
//! ```

mod bridge;
mod clock;
mod config;
mod error;
mod events;
mod frame;
mod pending;
mod session;
pub mod transport;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result, TransportError};
pub use events::{
    ActiveChanged, BackButtonPressed, EventKind, HostEvent, Subscription, ThemeChanged,
    WalletChanged,
};
pub use frame::{
    EventFrame, InboundFrame, InitData, NAJI_ASYNC_RESPONSE, NAJI_EVENT, NAJI_INIT_DATA,
    NAJI_SDK_INIT, OutboundFrame, REQ_ID_KEY, Reply,
};
pub use pending::{PendingReply, generate_request_id};
pub use session::{Session, Theme, UserProfile, WalletInfo};
pub use transport::{HostEnd, InboundHandler, MemoryTransport, Transport};

#[cfg(not(target_arch = "wasm32"))]
pub use transport::StreamTransport;

#[cfg(target_arch = "wasm32")]
pub use transport::WindowTransport;
