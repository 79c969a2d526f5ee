//! Host Events
//!
//! Events are pushed by the host without a matching request. Known events
//! have typed payloads; any other event name lands in [`EventKind::Custom`]
//! so new host events can be consumed before the bridge learns about them.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, trace, warn};

use crate::session::Theme;

/// Event names understood by the bridge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The host's back button was pressed
    BackButtonPressed,
    /// The host switched color scheme
    ThemeChanged,
    /// The mini-app window gained or lost focus
    ActiveChanged,
    /// The user linked, changed or unlinked a wallet
    WalletChanged,
    /// Any event name not listed above
    Custom(String),
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "backButtonPressed" => EventKind::BackButtonPressed,
            "themeChanged" => EventKind::ThemeChanged,
            "activeChanged" => EventKind::ActiveChanged,
            "walletChanged" => EventKind::WalletChanged,
            other => EventKind::Custom(other.to_string()),
        }
    }

    /// Wire name of the event
    pub fn name(&self) -> &str {
        match self {
            EventKind::BackButtonPressed => "backButtonPressed",
            EventKind::ThemeChanged => "themeChanged",
            EventKind::ActiveChanged => "activeChanged",
            EventKind::WalletChanged => "walletChanged",
            EventKind::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed event payload bound to one [`EventKind`].
pub trait HostEvent: DeserializeOwned + Send + 'static {
    fn kind() -> EventKind;

    /// Decode the raw payload. A `null` payload decodes as `{}`.
    fn decode(payload: &Value) -> Result<Self, serde_json::Error> {
        match payload {
            Value::Null => serde_json::from_value(Value::Object(Default::default())),
            other => serde_json::from_value(other.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackButtonPressed {}

impl HostEvent for BackButtonPressed {
    fn kind() -> EventKind {
        EventKind::BackButtonPressed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeChanged {
    pub theme: Theme,
}

impl HostEvent for ThemeChanged {
    fn kind() -> EventKind {
        EventKind::ThemeChanged
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveChanged {
    pub active: bool,
}

impl HostEvent for ActiveChanged {
    fn kind() -> EventKind {
        EventKind::ActiveChanged
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletChanged {
    #[serde(default)]
    pub address: Option<String>,
}

impl HostEvent for WalletChanged {
    fn kind() -> EventKind {
        EventKind::WalletChanged
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriber registry
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) type EventHandler = Arc<dyn Fn(&Value) + Send + Sync + 'static>;

/// Handle returned by a subscription; pass it back to unsubscribe.
///
/// A handle only matches the bridge that issued it. Passing it to another
/// bridge's `off` removes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    registry: u64,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }
}

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(0);

/// Event name → subscribers in registration order
pub(crate) struct SubscriberRegistry {
    registry: u64,
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<EventKind, Vec<(u64, EventHandler)>>>,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self {
            registry: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(HashMap::new()),
        }
    }
}

impl SubscriberRegistry {
    pub(crate) fn subscribe(&self, kind: EventKind, handler: EventHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .entry(kind.clone())
            .or_default()
            .push((id, handler));

        trace!("Subscribed #{} to '{}'", id, kind);
        Subscription {
            registry: self.registry,
            kind,
            id,
        }
    }

    /// Typed subscription; payloads that fail to decode are skipped.
    pub(crate) fn subscribe_typed<E, F>(&self, handler: F) -> Subscription
    where
        E: HostEvent,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let kind = E::kind();
        let name = kind.name().to_string();
        self.subscribe(
            kind,
            Arc::new(move |payload: &Value| match E::decode(payload) {
                Ok(event) => handler(&event),
                Err(e) => warn!("Dropping malformed '{}' event payload: {}", name, e),
            }),
        )
    }

    /// Remove exactly one subscription. Unknown handles are a no-op.
    pub(crate) fn unsubscribe(&self, subscription: &Subscription) -> bool {
        if subscription.registry != self.registry {
            trace!("Ignoring subscription handle from another bridge");
            return false;
        }

        let mut subscribers = self.subscribers.lock();
        let Some(list) = subscribers.get_mut(&subscription.kind) else {
            return false;
        };

        let before = list.len();
        list.retain(|(id, _)| *id != subscription.id);
        let removed = list.len() != before;

        if list.is_empty() {
            subscribers.remove(&subscription.kind);
        }
        removed
    }

    /// Invoke every subscriber of `kind` in registration order.
    ///
    /// Handlers run outside the lock, so they may subscribe or unsubscribe;
    /// such changes apply from the next dispatch on. A panicking handler is
    /// logged and the remaining handlers still run. Returns how many
    /// handlers completed normally.
    pub(crate) fn dispatch(&self, kind: &EventKind, payload: &Value) -> usize {
        let handlers: Vec<EventHandler> = match self.subscribers.lock().get(kind) {
            Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => {
                trace!("No subscribers for '{}'", kind);
                return 0;
            }
        };

        let mut delivered = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(()) => delivered += 1,
                Err(_) => error!("Subscriber for '{}' panicked", kind),
            }
        }
        delivered
    }

    pub(crate) fn subscriber_count(&self, kind: &EventKind) -> usize {
        self.subscribers.lock().get(kind).map_or(0, Vec::len)
    }
}
