//! Session State
//!
//! User and environment metadata delivered by the host's init frame, plus the
//! queue of callbacks waiting for it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, ThreadId};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::error;

use crate::frame::InitData;

/// Profile of the user running the mini-app
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Fields the bridge does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Read a profile from host data, ignoring fields of the wrong type.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let mut profile = UserProfile::default();

        for (key, value) in map {
            let text = value.as_str().map(str::to_string);
            match key.as_str() {
                "username" => profile.username = text,
                "first_name" => profile.first_name = text,
                "last_name" => profile.last_name = text,
                "avatar" => profile.avatar = text,
                _ => {
                    profile.extra.insert(key.clone(), value.clone());
                }
            }
        }

        Some(profile)
    }
}

/// Host color scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Parse a theme name case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Wallet linked to the user's account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletInfo {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WalletInfo {
    /// Accepts either `{address, ...}` or a bare address string.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(address) => Some(Self {
                address: Some(address.clone()),
                extra: Map::new(),
            }),
            Value::Object(map) => {
                let mut extra = map.clone();
                let address = extra
                    .remove("address")
                    .and_then(|v| v.as_str().map(str::to_string));
                Some(Self { address, extra })
            }
            _ => None,
        }
    }
}

const DEFAULT_PLATFORM: &str = "unknown";

/// Snapshot of what the host told us about the session.
///
/// Every accessor is safe to call before initialization; it returns the
/// documented default.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    initialized: bool,
    user: Option<UserProfile>,
    theme: Theme,
    platform: String,
    permissions: Vec<String>,
    wallet: Option<WalletInfo>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            initialized: false,
            user: None,
            theme: Theme::default(),
            platform: DEFAULT_PLATFORM.to_string(),
            permissions: Vec::new(),
            wallet: None,
        }
    }
}

impl Session {
    /// Overwrite all metadata from an init frame and mark initialized.
    pub(crate) fn apply_init(&mut self, init: InitData) {
        self.user = init.user;
        self.theme = init.theme.unwrap_or_default();
        self.platform = init.platform.unwrap_or_else(|| DEFAULT_PLATFORM.to_string());
        self.permissions = init.permissions.unwrap_or_default();
        self.wallet = init.wallet;
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// Username, e.g. "durov"
    pub fn nickname(&self) -> Option<&str> {
        self.user.as_ref()?.username.as_deref()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.user.as_ref()?.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.user.as_ref()?.last_name.as_deref()
    }

    /// First and last name joined by a space. `None` without a user or when both are empty.
    pub fn full_name(&self) -> Option<String> {
        let user = self.user.as_ref()?;
        let full = format!(
            "{} {}",
            user.first_name.as_deref().unwrap_or(""),
            user.last_name.as_deref().unwrap_or("")
        );
        let full = full.trim();
        if full.is_empty() {
            None
        } else {
            Some(full.to_string())
        }
    }

    pub fn avatar(&self) -> Option<&str> {
        self.user.as_ref()?.avatar.as_deref()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn wallet(&self) -> Option<&WalletInfo> {
        self.wallet.as_ref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Init waiters
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) type InitCallback = Box<dyn FnOnce(&Session) + Send + 'static>;

/// Callbacks registered before the session was initialized.
#[derive(Default)]
pub(crate) struct InitQueue {
    waiters: Vec<InitCallback>,
    /// One entry per drain in progress, naming the thread running it.
    /// Registrations made on such a thread wait for the next init frame.
    draining: Vec<ThreadId>,
}

impl InitQueue {
    pub(crate) fn push(&mut self, callback: InitCallback) {
        self.waiters.push(callback);
    }

    pub(crate) fn is_draining_on_current_thread(&self) -> bool {
        self.draining.contains(&thread::current().id())
    }

    /// Take every queued waiter and mark the current thread as draining.
    pub(crate) fn begin_drain(&mut self) -> Vec<InitCallback> {
        self.draining.push(thread::current().id());
        std::mem::take(&mut self.waiters)
    }

    pub(crate) fn end_drain(&mut self) {
        let current = thread::current().id();
        if let Some(pos) = self.draining.iter().rposition(|id| *id == current) {
            self.draining.remove(pos);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }
}

/// Run one init callback, containing any panic it raises.
pub(crate) fn run_init_callback(callback: InitCallback, session: &Session) {
    if catch_unwind(AssertUnwindSafe(|| callback(session))).is_err() {
        error!("onInit callback panicked");
    }
}
