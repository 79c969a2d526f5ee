//! Platform time, randomness and scheduled deadline timers.
//!
//! Native builds use tokio timers and `rand`; wasm32 builds use the browser
//! clock through `js-sys` and `gloo-timers`.

use std::time::Duration;

/// Scheduled one-shot callback. Cancelling before it fires means it never runs.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) struct Timer(tokio::task::JoinHandle<()>);

#[cfg(not(target_arch = "wasm32"))]
impl Timer {
    pub(crate) fn cancel(self) {
        self.0.abort();
    }
}

/// Run `callback` once `duration` has elapsed, on its own runtime task.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn schedule<F>(duration: Duration, callback: F) -> Timer
where
    F: FnOnce() + Send + 'static,
{
    Timer(tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        callback();
    }))
}

#[cfg(target_arch = "wasm32")]
pub(crate) struct Timer(gloo_timers::callback::Timeout);

// SAFETY: wasm32 runs the bridge on a single thread.
#[cfg(target_arch = "wasm32")]
unsafe impl Send for Timer {}
#[cfg(target_arch = "wasm32")]
unsafe impl Sync for Timer {}

#[cfg(target_arch = "wasm32")]
impl Timer {
    pub(crate) fn cancel(self) {
        self.0.cancel();
    }
}

/// Run `callback` once `duration` has elapsed, from a browser `setTimeout`.
#[cfg(target_arch = "wasm32")]
pub(crate) fn schedule<F>(duration: Duration, callback: F) -> Timer
where
    F: FnOnce() + Send + 'static,
{
    let millis = duration.as_millis().min(u32::MAX as u128) as u32;
    Timer(gloo_timers::callback::Timeout::new(millis, callback))
}

/// Milliseconds since the Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn unix_millis() -> u64 {
    js_sys::Date::now() as u64
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn random_u64() -> u64 {
    rand::random()
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn random_u64() -> u64 {
    // Math.random yields 52 bits of entropy at most; two draws fill the word.
    let hi = (js_sys::Math::random() * u32::MAX as f64) as u64;
    let lo = (js_sys::Math::random() * u32::MAX as f64) as u64;
    (hi << 32) | lo
}
