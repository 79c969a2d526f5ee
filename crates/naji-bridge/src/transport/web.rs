//! `postMessage` transport for mini-apps running in a browser frame.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde_json::Value;
use tracing::trace;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{MessageEvent, Window};

use super::{InboundHandler, Transport};
use crate::config::BridgeConfig;
use crate::error::TransportError;
use crate::frame::OutboundFrame;

/// Talks to `window.parent` and listens on `window`'s `message` event.
pub struct WindowTransport {
    window: Window,
    target_origin: String,
    listening: AtomicBool,
}

// SAFETY: wasm32 is single-threaded here; `Window` is never shared across
// threads because there are none.
unsafe impl Send for WindowTransport {}
unsafe impl Sync for WindowTransport {}

impl WindowTransport {
    pub fn new(target_origin: impl Into<String>) -> Result<Self, TransportError> {
        let window = web_sys::window().ok_or(TransportError::Unavailable)?;
        Ok(Self {
            window,
            target_origin: target_origin.into(),
            listening: AtomicBool::new(false),
        })
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self, TransportError> {
        Self::new(config.target_origin.clone())
    }
}

fn js_error(value: JsValue) -> TransportError {
    TransportError::Send(format!("{:?}", value))
}

impl Transport for WindowTransport {
    fn listen(&self, handler: InboundHandler) -> Result<(), TransportError> {
        if self.listening.swap(true, Ordering::AcqRel) {
            return Err(TransportError::AlreadyListening);
        }

        let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
            // Structured-clone data that has no JSON form is not ours.
            match serde_wasm_bindgen::from_value::<Value>(event.data()) {
                Ok(value) => handler(value),
                Err(e) => trace!("Discarding non-JSON message: {}", e),
            }
        }) as Box<dyn FnMut(_)>);

        self.window
            .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            .map_err(js_error)?;
        // Lives until the page unloads.
        closure.forget();
        Ok(())
    }

    fn post(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        let parent = self
            .window
            .parent()
            .map_err(js_error)?
            .ok_or(TransportError::Unavailable)?;

        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let message = frame
            .serialize(&serializer)
            .map_err(|e| TransportError::Send(e.to_string()))?;

        parent
            .post_message(&message, &self.target_origin)
            .map_err(js_error)
    }
}
