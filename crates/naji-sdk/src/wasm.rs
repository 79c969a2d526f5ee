//! JavaScript bindings
//!
//! Exposes [`NajiApp`] to JavaScript as the `NajiSdk` class. Requests return
//! Promises that reject with an `Error` carrying the bridge error message.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;

use js_sys::{Function, Promise};
use naji_bridge::WindowTransport;
use serde::Serialize;
use serde_json::Value;
use tracing::error;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::{
    Alert, BridgeConfig, BridgeError, EventKind, Invoice, NajiApp, NftSpec, PaymentRequest,
    Subscription, TokenSpec, whole_units,
};

/// JS function registered with the bridge.
struct JsCallback(Function);

// SAFETY: wasm32 runs the bridge on a single thread, so the function is
// never touched from another one.
unsafe impl Send for JsCallback {}
unsafe impl Sync for JsCallback {}

impl JsCallback {
    fn call(&self, arg: &JsValue) {
        if let Err(e) = self.0.call1(&JsValue::NULL, arg) {
            error!("JavaScript callback threw: {:?}", e);
        }
    }
}

fn js_error(message: &str) -> JsValue {
    js_sys::Error::new(message).into()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| js_error(&e.to_string()))
}

/// Promise rejected up front, before anything is sent to the host.
fn rejected(message: &str) -> Promise {
    Promise::reject(&js_error(message))
}

fn from_js(value: JsValue) -> Result<Value, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| js_error(&e.to_string()))
}

fn promise<T, F>(reply: F) -> Promise
where
    T: Serialize,
    F: Future<Output = Result<T, BridgeError>> + 'static,
{
    future_to_promise(async move {
        let value = reply.await.map_err(|e| js_error(&e.to_string()))?;
        to_js(&value)
    })
}

#[wasm_bindgen]
pub struct NajiSdk {
    app: NajiApp,
    subscriptions: RefCell<HashMap<u32, Subscription>>,
    next_handle: Cell<u32>,
}

#[wasm_bindgen]
impl NajiSdk {
    /// Connect to `window.parent`. `targetOrigin` defaults to `"*"`.
    #[wasm_bindgen(constructor)]
    pub fn new(target_origin: Option<String>) -> Result<NajiSdk, JsValue> {
        let mut config = BridgeConfig::default();
        if let Some(origin) = target_origin {
            config = config.with_target_origin(origin);
        }

        let transport = WindowTransport::from_config(&config).map_err(|e| js_error(&e.to_string()))?;
        let app = NajiApp::connect(transport, config).map_err(|e| js_error(&e.to_string()))?;

        Ok(Self {
            app,
            subscriptions: RefCell::new(HashMap::new()),
            next_handle: Cell::new(1),
        })
    }

    // User info

    /// `callback(user)` once session data has arrived.
    #[wasm_bindgen(js_name = onInit)]
    pub fn on_init(&self, callback: Function) {
        let callback = JsCallback(callback);
        self.app.on_init(move |session| {
            let user = to_js(&session.user()).unwrap_or(JsValue::NULL);
            callback.call(&user);
        });
    }

    #[wasm_bindgen(js_name = isInitialized)]
    pub fn is_initialized(&self) -> bool {
        self.app.is_initialized()
    }

    #[wasm_bindgen(js_name = getNickname)]
    pub fn nickname(&self) -> Option<String> {
        self.app.nickname()
    }

    #[wasm_bindgen(js_name = getName)]
    pub fn name(&self) -> Option<String> {
        self.app.name()
    }

    #[wasm_bindgen(js_name = getSurname)]
    pub fn surname(&self) -> Option<String> {
        self.app.surname()
    }

    #[wasm_bindgen(js_name = getFullName)]
    pub fn full_name(&self) -> Option<String> {
        self.app.full_name()
    }

    #[wasm_bindgen(js_name = getUserAvatar)]
    pub fn avatar(&self) -> Option<String> {
        self.app.avatar()
    }

    #[wasm_bindgen(js_name = getTheme)]
    pub fn theme(&self) -> String {
        self.app.theme().as_str().to_string()
    }

    #[wasm_bindgen(js_name = getPlatform)]
    pub fn platform(&self) -> String {
        self.app.platform()
    }

    // Storage

    #[wasm_bindgen(js_name = setItem)]
    pub fn set_item(&self, key: String, value: JsValue) -> Result<Promise, JsValue> {
        let value = from_js(value)?;
        let app = self.app.clone();
        Ok(promise(async move { app.set_item(&key, value).await }))
    }

    #[wasm_bindgen(js_name = getItem)]
    pub fn get_item(&self, key: String) -> Promise {
        let app = self.app.clone();
        promise(async move { app.get_item(&key).await })
    }

    #[wasm_bindgen(js_name = changeItem)]
    pub fn change_item(&self, key: String, value: JsValue) -> Result<Promise, JsValue> {
        self.set_item(key, value)
    }

    #[wasm_bindgen(js_name = deleteItem)]
    pub fn delete_item(&self, key: String) -> Promise {
        let app = self.app.clone();
        promise(async move { app.delete_item(&key).await })
    }

    // Payments

    #[wasm_bindgen(js_name = createInvoice)]
    pub fn create_invoice(&self, title: String, amount: f64, description: Option<String>) -> Promise {
        let Some(amount) = whole_units(amount) else {
            return rejected(&format!("Invoice amount must be a whole number of sparks, got {}", amount));
        };
        let mut invoice = Invoice::new(title, amount);
        invoice.description = description;
        let app = self.app.clone();
        promise(async move { app.create_invoice(invoice).await })
    }

    #[wasm_bindgen(js_name = getSolanaAddress)]
    pub fn solana_address(&self) -> Promise {
        let app = self.app.clone();
        promise(async move { app.solana_address().await })
    }

    #[wasm_bindgen(js_name = getSolanaBalance)]
    pub fn solana_balance(&self) -> Promise {
        let app = self.app.clone();
        promise(async move { app.solana_balance().await })
    }

    #[wasm_bindgen(js_name = getTokenBalance)]
    pub fn token_balance(&self, token_mint: String) -> Promise {
        let app = self.app.clone();
        promise(async move { app.token_balance(&token_mint).await })
    }

    #[wasm_bindgen(js_name = paymentRequest)]
    pub fn payment_request(
        &self,
        recipient: String,
        amount: f64,
        token_mint: Option<String>,
        memo: Option<String>,
    ) -> Promise {
        let request = PaymentRequest {
            recipient,
            amount,
            token_mint,
            memo,
        };
        let app = self.app.clone();
        promise(async move { app.payment_request(request).await })
    }

    #[wasm_bindgen(js_name = createToken)]
    pub fn create_token(
        &self,
        name: String,
        symbol: String,
        decimals: u8,
        supply: f64,
        uri: String,
    ) -> Promise {
        let Some(supply) = whole_units(supply) else {
            return rejected(&format!("Token supply must be a whole number, got {}", supply));
        };
        let spec = TokenSpec {
            name,
            symbol,
            decimals,
            supply,
            uri,
        };
        let app = self.app.clone();
        promise(async move { app.create_token(spec).await })
    }

    #[wasm_bindgen(js_name = mintNft)]
    pub fn mint_nft(&self, name: String, symbol: String, uri: String) -> Promise {
        let spec = NftSpec { name, symbol, uri };
        let app = self.app.clone();
        promise(async move { app.mint_nft(spec).await })
    }

    #[wasm_bindgen(js_name = signMessage)]
    pub fn sign_message(&self, message: String) -> Promise {
        let app = self.app.clone();
        promise(async move { app.sign_message(&message).await })
    }

    #[wasm_bindgen(js_name = executeContract)]
    pub fn execute_contract(&self, payload: JsValue) -> Result<Promise, JsValue> {
        let payload = from_js(payload)?;
        let app = self.app.clone();
        Ok(promise(async move { app.execute_contract(payload).await }))
    }

    // UI

    #[wasm_bindgen(js_name = isReady)]
    pub fn ready(&self) {
        self.app.ready();
    }

    #[wasm_bindgen(js_name = showAlert)]
    pub fn show_alert(&self, message: String, title: Option<String>, kind: Option<String>) {
        let mut alert = Alert::new(message);
        alert.title = title;
        alert.kind = kind;
        self.app.show_alert(alert);
    }

    #[wasm_bindgen(js_name = setHeaderColor)]
    pub fn set_header_color(&self, color: String) {
        self.app.set_header_color(&color);
    }

    #[wasm_bindgen(js_name = setFullscreen)]
    pub fn set_fullscreen(&self) {
        self.app.set_fullscreen();
    }

    #[wasm_bindgen(js_name = exitFullscreen)]
    pub fn exit_fullscreen(&self) {
        self.app.exit_fullscreen();
    }

    #[wasm_bindgen(js_name = setBackButtonVisible)]
    pub fn set_back_button_visible(&self, visible: bool) {
        self.app.set_back_button_visible(visible);
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> Promise {
        let app = self.app.clone();
        promise(async move { app.is_active().await })
    }

    // Navigation

    #[wasm_bindgen(js_name = openLink)]
    pub fn open_link(&self, url: String) {
        self.app.open_link(&url);
    }

    #[wasm_bindgen(js_name = openNMLink)]
    pub fn open_nm_link(&self, path: String) {
        self.app.open_nm_link(&path);
    }

    #[wasm_bindgen(js_name = downloadFile)]
    pub fn download_file(&self, url: String, filename: Option<String>) {
        self.app.download_file(&url, filename.as_deref());
    }

    // Events

    /// Subscribe to a host event by name. Returns a handle for `off`.
    pub fn on(&self, event_name: String, callback: Function) -> u32 {
        let callback = JsCallback(callback);
        let subscription = self
            .app
            .bridge()
            .on_event(EventKind::from_name(&event_name), move |payload| {
                match to_js(payload) {
                    Ok(arg) => callback.call(&arg),
                    Err(e) => error!("Cannot pass event payload to JavaScript: {:?}", e),
                }
            });

        let handle = self.next_handle.get();
        self.next_handle.set(handle.wrapping_add(1));
        self.subscriptions.borrow_mut().insert(handle, subscription);
        handle
    }

    /// Remove a subscription. Unknown handles are ignored.
    pub fn off(&self, handle: u32) -> bool {
        match self.subscriptions.borrow_mut().remove(&handle) {
            Some(subscription) => self.app.off(&subscription),
            None => false,
        }
    }
}
