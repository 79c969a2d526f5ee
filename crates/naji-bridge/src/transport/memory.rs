//! In-process transport with a scriptable host end.
//!
//! Used by tests and host simulators: the [`HostEnd`] records every frame the
//! guest posts and can push init frames, replies and events back in.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use tracing::trace;

use super::{InboundHandler, Transport};
use crate::error::TransportError;
use crate::frame::{NAJI_ASYNC_RESPONSE, NAJI_EVENT, NAJI_INIT_DATA, OutboundFrame};

type SharedHandler = Arc<dyn Fn(Value) + Send + Sync + 'static>;

struct Shared {
    listener: Mutex<Option<SharedHandler>>,
    sent: Mutex<Vec<OutboundFrame>>,
    parent_available: AtomicBool,
}

/// Guest side of an in-memory channel
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

/// Host side of an in-memory channel
#[derive(Clone)]
pub struct HostEnd {
    shared: Arc<Shared>,
}

impl MemoryTransport {
    /// Create a connected guest/host pair.
    pub fn pair() -> (MemoryTransport, HostEnd) {
        let shared = Arc::new(Shared {
            listener: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            parent_available: AtomicBool::new(true),
        });
        (
            MemoryTransport {
                shared: Arc::clone(&shared),
            },
            HostEnd { shared },
        )
    }
}

impl Transport for MemoryTransport {
    fn listen(&self, handler: InboundHandler) -> Result<(), TransportError> {
        let mut listener = self.shared.listener.lock();
        if listener.is_some() {
            return Err(TransportError::AlreadyListening);
        }
        *listener = Some(Arc::from(handler));
        Ok(())
    }

    fn post(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        if !self.shared.parent_available.load(Ordering::Acquire) {
            return Err(TransportError::Unavailable);
        }
        trace!("guest -> host: {}", frame.kind);
        self.shared.sent.lock().push(frame.clone());
        Ok(())
    }
}

impl HostEnd {
    /// Push raw data at the guest's listener. Returns `false` if the guest
    /// is not listening yet.
    pub fn deliver(&self, data: Value) -> bool {
        // Cloned out so the handler can post or deliver without deadlocking.
        let handler = self.shared.listener.lock().clone();
        match handler {
            Some(handler) => {
                handler(data);
                true
            }
            None => false,
        }
    }

    /// Send an init frame. `data` holds the metadata fields (`user`, `theme`, ...).
    pub fn send_init(&self, data: Value) -> bool {
        let mut frame = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        frame.insert("type".to_string(), Value::String(NAJI_INIT_DATA.to_string()));
        self.deliver(Value::Object(frame))
    }

    pub fn reply(&self, req_id: &str, result: Value) -> bool {
        self.deliver(json!({
            "type": NAJI_ASYNC_RESPONSE,
            "reqId": req_id,
            "result": result,
        }))
    }

    pub fn reply_error(&self, req_id: &str, message: &str) -> bool {
        self.deliver(json!({
            "type": NAJI_ASYNC_RESPONSE,
            "reqId": req_id,
            "error": message,
        }))
    }

    pub fn emit(&self, event_name: &str, payload: Value) -> bool {
        self.deliver(json!({
            "type": NAJI_EVENT,
            "eventName": event_name,
            "payload": payload,
        }))
    }

    /// Every frame the guest has posted so far.
    pub fn sent(&self) -> Vec<OutboundFrame> {
        self.shared.sent.lock().clone()
    }

    pub fn take_sent(&self) -> Vec<OutboundFrame> {
        std::mem::take(&mut *self.shared.sent.lock())
    }

    /// Posted frames of one type, oldest first.
    pub fn requests_of(&self, kind: &str) -> Vec<OutboundFrame> {
        self.shared
            .sent
            .lock()
            .iter()
            .filter(|frame| frame.kind == kind)
            .cloned()
            .collect()
    }

    /// Correlation id of the most recent request of one type.
    pub fn last_request_id(&self, kind: &str) -> Option<String> {
        self.shared
            .sent
            .lock()
            .iter()
            .rev()
            .filter(|frame| frame.kind == kind)
            .find_map(|frame| frame.request_id().map(str::to_string))
    }

    /// Simulate running outside any host: posts fail with
    /// [`TransportError::Unavailable`].
    pub fn set_parent_available(&self, available: bool) {
        self.shared
            .parent_available
            .store(available, Ordering::Release);
    }

    pub fn is_listening(&self) -> bool {
        self.shared.listener.lock().is_some()
    }
}
