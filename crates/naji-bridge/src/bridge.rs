//! Bridge
//!
//! The single owner of the inbound listener. Inbound frames are classified
//! and routed to the init waiters, to one pending request, or to the
//! subscribers of one event. Outbound traffic goes through [`Bridge::notify`]
//! (fire-and-forget) and [`Bridge::request`] (awaitable, exactly one outcome).

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::config::BridgeConfig;
use crate::error::TransportError;
use crate::events::{EventKind, HostEvent, SubscriberRegistry, Subscription};
use crate::frame::{InboundFrame, InitData, NAJI_SDK_INIT, OutboundFrame};
use crate::pending::{PendingReply, PendingTable};
use crate::session::{InitQueue, Session, run_init_callback};
use crate::transport::Transport;

/// Handle to a connected bridge. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Box<dyn Transport>,
    config: BridgeConfig,
    session: RwLock<Session>,
    /// Lock order: `init_queue` before `session`.
    init_queue: Mutex<InitQueue>,
    pending: Arc<PendingTable>,
    subscribers: SubscriberRegistry,
}

impl Bridge {
    /// Install the inbound listener, then announce readiness with
    /// `NAJI_SDK_INIT`. The listener is never removed.
    pub fn connect<T: Transport>(transport: T, config: BridgeConfig) -> crate::Result<Self> {
        let inner = Arc::new(Inner {
            transport: Box::new(transport),
            config,
            session: RwLock::new(Session::default()),
            init_queue: Mutex::new(InitQueue::default()),
            pending: Arc::new(PendingTable::default()),
            subscribers: SubscriberRegistry::default(),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner.transport.listen(Box::new(move |data: Value| {
            if let Some(inner) = weak.upgrade() {
                Bridge { inner }.handle_message(&data);
            }
        }))?;

        let bridge = Bridge { inner };
        bridge.notify(NAJI_SDK_INIT, ());
        info!(
            "Bridge listening (request timeout {:?})",
            bridge.inner.config.request_timeout()
        );
        Ok(bridge)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outbound
    // ─────────────────────────────────────────────────────────────────────────

    /// Fire-and-forget. Delivery failures are logged, never returned.
    pub fn notify(&self, kind: &str, payload: impl Serialize) {
        match OutboundFrame::notify(kind, payload) {
            Ok(frame) => {
                self.post(&frame);
            }
            Err(e) => error!("Dropping notification: {}", e),
        }
    }

    /// Send a request with the configured default deadline.
    pub fn request(&self, kind: &str, payload: impl Serialize) -> PendingReply {
        self.request_with_timeout(kind, payload, self.inner.config.request_timeout())
    }

    /// Send a request that fails with [`crate::BridgeError::Timeout`] if no reply
    /// arrives within `timeout`.
    ///
    /// The deadline is a scheduled task that starts when this is called and
    /// fires whether or not the returned future is being polled. Native
    /// builds must call this inside a tokio runtime.
    ///
    /// A transport failure is only logged; the request still waits for its
    /// deadline.
    pub fn request_with_timeout(
        &self,
        kind: &str,
        payload: impl Serialize,
        timeout: Duration,
    ) -> PendingReply {
        let (req_id, rx) = self.inner.pending.register(kind);

        let frame = match OutboundFrame::request(kind, payload, &req_id) {
            Ok(frame) => frame,
            Err(e) => {
                self.inner.pending.expire(&req_id);
                return PendingReply::failed(e);
            }
        };

        self.inner.pending.arm_deadline(&req_id, timeout);
        let reply = PendingReply::waiting(Arc::clone(&self.inner.pending), req_id, rx);
        self.post(&frame);
        reply
    }

    fn post(&self, frame: &OutboundFrame) -> bool {
        match self.inner.transport.post(frame) {
            Ok(()) => {
                trace!("Posted {}", frame.kind);
                true
            }
            Err(TransportError::Unavailable) => {
                warn!("No host to receive {}; is the app running inside Naji?", frame.kind);
                false
            }
            Err(e) => {
                warn!("Failed to post {}: {}", frame.kind, e);
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound
    // ─────────────────────────────────────────────────────────────────────────

    /// Route one inbound message. Anything that is not a well-formed bridge
    /// frame is ignored.
    pub fn handle_message(&self, data: &Value) {
        let Some(frame) = InboundFrame::parse(data) else {
            trace!("Ignoring non-bridge message");
            return;
        };

        match frame {
            InboundFrame::Init(init) => self.apply_init(init),
            InboundFrame::Reply(reply) => {
                let req_id = reply.req_id.clone();
                self.inner.pending.resolve(&req_id, reply.into_outcome());
            }
            InboundFrame::Event(event) => {
                let kind = event.kind();
                let delivered = self.inner.subscribers.dispatch(&kind, &event.payload);
                trace!("Event '{}' delivered to {} subscribers", kind, delivered);
            }
        }
    }

    fn apply_init(&self, init: InitData) {
        let (snapshot, waiters) = {
            let mut queue = self.inner.init_queue.lock();
            let snapshot = {
                let mut session = self.inner.session.write();
                session.apply_init(init);
                session.clone()
            };
            (snapshot, queue.begin_drain())
        };

        info!(
            "Session initialized (user {:?}, platform {}, {} waiting callbacks)",
            snapshot.nickname(),
            snapshot.platform(),
            waiters.len()
        );

        // Run without locks held so callbacks may call back into the bridge.
        for callback in waiters {
            run_init_callback(callback, &snapshot);
        }
        self.inner.init_queue.lock().end_drain();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Init
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `callback` once the session is initialized.
    ///
    /// After initialization it runs immediately on the calling thread.
    /// Registrations made from inside a draining init callback wait for the
    /// next init frame; other threads are not affected by the drain.
    pub fn on_init<F>(&self, callback: F)
    where
        F: FnOnce(&Session) + Send + 'static,
    {
        let mut queue = self.inner.init_queue.lock();
        if queue.is_draining_on_current_thread() {
            debug!("onInit registered during drain; deferred to next init");
            queue.push(Box::new(callback));
            return;
        }

        let session = self.inner.session.read();
        if session.is_initialized() {
            let snapshot = session.clone();
            drop(session);
            drop(queue);
            run_init_callback(Box::new(callback), &snapshot);
        } else {
            queue.push(Box::new(callback));
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.session.read().is_initialized()
    }

    /// Snapshot of the current session metadata.
    pub fn session(&self) -> Session {
        self.inner.session.read().clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to a typed host event.
    pub fn on<E, F>(&self, handler: F) -> Subscription
    where
        E: HostEvent,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe_typed(handler)
    }

    /// Subscribe to the raw payload of any event, including unknown ones.
    pub fn on_event<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(kind, Arc::new(handler))
    }

    /// Remove one subscription. Returns `false` if it was already gone.
    pub fn off(&self, subscription: &Subscription) -> bool {
        self.inner.subscribers.unsubscribe(subscription)
    }

    pub fn subscriber_count(&self, kind: &EventKind) -> usize {
        self.inner.subscribers.subscriber_count(kind)
    }

    /// Requests still waiting for a reply or a deadline.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("initialized", &self.is_initialized())
            .field("pending", &self.pending_count())
            .field("config", &self.inner.config)
            .finish()
    }
}
