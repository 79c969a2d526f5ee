//! Host window chrome and alerts.

use std::future::Future;

use serde::Serialize;

use crate::catalog::{
    APP_READY, BACK_BUTTON_UPDATE, CHECK_IS_ACTIVE, SET_FULLSCREEN_APP, SET_HEADER_COLOR,
    SHOW_ALERT,
};
use crate::{NajiApp, Result, truthy};

/// In-messenger alert popup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Host-defined style, e.g. "error"
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Alert {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            title: None,
            kind: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

impl From<&str> for Alert {
    fn from(message: &str) -> Self {
        Alert::new(message)
    }
}

impl From<String> for Alert {
    fn from(message: String) -> Self {
        Alert::new(message)
    }
}

#[derive(Serialize)]
struct ColorPayload<'a> {
    color: &'a str,
}

#[derive(Serialize)]
struct FullscreenPayload {
    value: bool,
}

#[derive(Serialize)]
struct BackButtonPayload {
    visible: bool,
}

impl NajiApp {
    /// Tell the host the app has loaded so it can hide its loader.
    pub fn ready(&self) {
        self.bridge.notify(APP_READY, ());
    }

    pub fn show_alert(&self, alert: impl Into<Alert>) {
        self.bridge.notify(SHOW_ALERT, alert.into());
    }

    /// `color` is a hex code such as `#ff0000` or any CSS color.
    pub fn set_header_color(&self, color: &str) {
        self.bridge.notify(SET_HEADER_COLOR, ColorPayload { color });
    }

    /// Expand to the full screen, hiding the messenger header.
    pub fn set_fullscreen(&self) {
        self.bridge
            .notify(SET_FULLSCREEN_APP, FullscreenPayload { value: true });
    }

    pub fn exit_fullscreen(&self) {
        self.bridge
            .notify(SET_FULLSCREEN_APP, FullscreenPayload { value: false });
    }

    pub fn set_back_button_visible(&self, visible: bool) {
        self.bridge
            .notify(BACK_BUTTON_UPDATE, BackButtonPayload { visible });
    }

    /// Whether the app window currently has focus.
    pub fn is_active(&self) -> impl Future<Output = Result<bool>> {
        let reply = self.bridge.request(CHECK_IS_ACTIVE, ());
        async move { Ok(truthy(&reply.await?)) }
    }
}
