//! Transports
//!
//! A [`Transport`] is the raw, untyped channel between the guest and its
//! host. The bridge installs exactly one inbound handler on it and posts
//! outbound frames through it; everything else is the bridge's business.

mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod stream;
#[cfg(target_arch = "wasm32")]
mod web;

use serde_json::Value;

use crate::error::TransportError;
use crate::frame::OutboundFrame;

pub use memory::{HostEnd, MemoryTransport};
#[cfg(not(target_arch = "wasm32"))]
pub use stream::StreamTransport;
#[cfg(target_arch = "wasm32")]
pub use web::WindowTransport;

/// Callback receiving every inbound message, bridge frame or not.
pub type InboundHandler = Box<dyn Fn(Value) + Send + Sync + 'static>;

/// Message channel to the host.
pub trait Transport: Send + Sync + 'static {
    /// Install the inbound handler. It stays installed for the lifetime of
    /// the transport; a second call fails with
    /// [`TransportError::AlreadyListening`].
    fn listen(&self, handler: InboundHandler) -> Result<(), TransportError>;

    /// Post one frame to the host. Delivery is not acknowledged.
    fn post(&self, frame: &OutboundFrame) -> Result<(), TransportError>;
}
