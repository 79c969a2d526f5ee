//! Naji SDK
//!
//! Typed mini-app API on top of [`naji_bridge`]. Each operation is a thin
//! mapping from a method call to one host message type (see [`catalog`]);
//! the correlation, timeout and dispatch logic all live in the bridge.
//!
//! Request-style operations post their frame as soon as they are called; the
//! returned future only waits for the reply.

pub mod catalog;
mod navigation;
mod payments;
mod storage;
mod ui;
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
mod wasm;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

pub use naji_bridge::{
    ActiveChanged, BackButtonPressed, Bridge, BridgeConfig, BridgeError, EventKind, HostEvent,
    Result, Session, Subscription, Theme, ThemeChanged, Transport, UserProfile, WalletChanged,
    WalletInfo,
};
pub use payments::{Invoice, NftSpec, PaymentRequest, TokenSpec, whole_units};
pub use ui::Alert;
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub use wasm::NajiSdk;

/// A connected mini-app.
#[derive(Debug, Clone)]
pub struct NajiApp {
    bridge: Bridge,
}

impl NajiApp {
    pub fn new(bridge: Bridge) -> Self {
        Self { bridge }
    }

    /// Connect a bridge over `transport` and wrap it.
    pub fn connect<T: Transport>(transport: T, config: BridgeConfig) -> Result<Self> {
        Ok(Self::new(Bridge::connect(transport, config)?))
    }

    /// The underlying bridge, for message types not covered here.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User info
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `callback` once the host has delivered session data.
    pub fn on_init<F>(&self, callback: F)
    where
        F: FnOnce(&Session) + Send + 'static,
    {
        self.bridge.on_init(callback);
    }

    pub fn is_initialized(&self) -> bool {
        self.bridge.is_initialized()
    }

    pub fn session(&self) -> Session {
        self.bridge.session()
    }

    /// Username, e.g. "durov"
    pub fn nickname(&self) -> Option<String> {
        self.session().nickname().map(str::to_string)
    }

    pub fn name(&self) -> Option<String> {
        self.session().first_name().map(str::to_string)
    }

    pub fn surname(&self) -> Option<String> {
        self.session().last_name().map(str::to_string)
    }

    pub fn full_name(&self) -> Option<String> {
        self.session().full_name()
    }

    /// Avatar URL
    pub fn avatar(&self) -> Option<String> {
        self.session().avatar().map(str::to_string)
    }

    pub fn theme(&self) -> Theme {
        self.session().theme()
    }

    pub fn platform(&self) -> String {
        self.session().platform().to_string()
    }

    pub fn permissions(&self) -> Vec<String> {
        self.session().permissions().to_vec()
    }

    pub fn wallet(&self) -> Option<WalletInfo> {
        self.session().wallet().cloned()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    pub fn on_back_button<F>(&self, handler: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.bridge.on(move |_: &BackButtonPressed| handler())
    }

    pub fn on_theme_changed<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Theme) + Send + Sync + 'static,
    {
        self.bridge.on(move |event: &ThemeChanged| handler(event.theme))
    }

    /// Called with `true` when the mini-app window gains focus.
    pub fn on_active_changed<F>(&self, handler: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.bridge.on(move |event: &ActiveChanged| handler(event.active))
    }

    /// Called with the new address, or `None` when the wallet is unlinked.
    pub fn on_wallet_changed<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        self.bridge
            .on(move |event: &WalletChanged| handler(event.address.as_deref()))
    }

    pub fn off(&self, subscription: &Subscription) -> bool {
        self.bridge.off(subscription)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reply decoding
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn decode<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        warn!("Unexpected {} reply: {}", kind, e);
        BridgeError::Decode {
            kind: kind.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Host confirmations follow JavaScript truthiness.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}


#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::test_support::app;
    use super::*;

    #[test]
    fn test_user_info_before_and_after_init() {
        let (app, host) = app();
        assert!(!app.is_initialized());
        assert_eq!(app.nickname(), None);
        assert_eq!(app.full_name(), None);
        assert_eq!(app.theme(), Theme::Light);

        host.send_init(json!({
            "user": {
                "username": "durov",
                "first_name": "Pavel",
                "last_name": "Durov",
                "avatar": "https://cdn.naji.me/a.png"
            },
            "theme": "dark",
            "platform": "ios",
            "permissions": ["storage"],
            "wallet": {"address": "So1ana"}
        }));

        assert!(app.is_initialized());
        assert_eq!(app.nickname().as_deref(), Some("durov"));
        assert_eq!(app.name().as_deref(), Some("Pavel"));
        assert_eq!(app.surname().as_deref(), Some("Durov"));
        assert_eq!(app.full_name().as_deref(), Some("Pavel Durov"));
        assert_eq!(app.avatar().as_deref(), Some("https://cdn.naji.me/a.png"));
        assert_eq!(app.theme(), Theme::Dark);
        assert_eq!(app.platform(), "ios");
        assert_eq!(app.permissions(), vec!["storage".to_string()]);
        assert_eq!(app.wallet().and_then(|w| w.address).as_deref(), Some("So1ana"));
    }

    #[test]
    fn test_event_helpers() {
        let (app, host) = app();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = Arc::clone(&log);
        let back = app.on_back_button(move || l.lock().unwrap().push("back".to_string()));
        let l = Arc::clone(&log);
        app.on_theme_changed(move |theme| l.lock().unwrap().push(theme.as_str().to_string()));
        let l = Arc::clone(&log);
        app.on_active_changed(move |active| l.lock().unwrap().push(format!("active={}", active)));
        let l = Arc::clone(&log);
        app.on_wallet_changed(move |address| {
            l.lock().unwrap().push(format!("wallet={}", address.unwrap_or("none")))
        });

        host.emit("backButtonPressed", Value::Null);
        host.emit("themeChanged", json!({"theme": "dark"}));
        host.emit("activeChanged", json!({"active": false}));
        host.emit("walletChanged", json!({}));

        assert!(app.off(&back));
        host.emit("backButtonPressed", Value::Null);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["back", "dark", "active=false", "wallet=none"]
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!truthy(&Value::Null));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("ok")));
        assert!(truthy(&json!({})));
    }

    #[test]
    fn test_decode_failure_names_kind() {
        let err = decode::<f64>("GET_SOLANA_BALANCE", json!("lots")).unwrap_err();
        assert!(matches!(err, BridgeError::Decode { ref kind, .. } if kind == "GET_SOLANA_BALANCE"));
    }
}
