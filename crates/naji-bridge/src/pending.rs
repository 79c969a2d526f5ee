//! Pending Requests
//!
//! Every request owns one entry in the [`PendingTable`] keyed by its `reqId`,
//! plus a scheduled deadline task. The entry is removed exactly once: by the
//! matching reply or by the deadline firing, whichever gets there first. The
//! loser finds the entry gone and does nothing. A reply cancels the deadline.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::clock::{self, Timer};
use crate::error::BridgeError;

type Outcome = Result<Value, BridgeError>;

/// Generate a correlation id: base36 clock component followed by a base36
/// random component.
pub fn generate_request_id() -> String {
    let mut id = to_base36(clock::unix_millis());
    id.push_str(&to_base36(clock::random_u64()));
    id
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

struct PendingEntry {
    kind: String,
    reply: oneshot::Sender<Outcome>,
    deadline: Option<Timer>,
}

impl PendingEntry {
    fn cancel_deadline(&mut self) {
        if let Some(timer) = self.deadline.take() {
            timer.cancel();
        }
    }
}

/// Outstanding requests keyed by correlation id
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: DashMap<String, PendingEntry>,
}

impl PendingTable {
    /// Insert a new entry under an id unique among outstanding requests.
    pub(crate) fn register(&self, kind: &str) -> (String, oneshot::Receiver<Outcome>) {
        self.register_with(kind, generate_request_id)
    }

    pub(crate) fn register_with(
        &self,
        kind: &str,
        mut next_id: impl FnMut() -> String,
    ) -> (String, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let entry = PendingEntry {
            kind: kind.to_string(),
            reply: tx,
            deadline: None,
        };

        loop {
            let id = next_id();
            match self.entries.entry(id.clone()) {
                Entry::Occupied(_) => {
                    warn!("Request id collision on {}, regenerating", id);
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(entry);
                    return (id, rx);
                }
            }
        }
    }

    /// Schedule the deadline for a registered request. When it fires the
    /// entry is retired and its caller receives [`BridgeError::Timeout`],
    /// whether or not anyone is polling the reply.
    pub(crate) fn arm_deadline(self: &Arc<Self>, req_id: &str, timeout: Duration) {
        let table = Arc::downgrade(self);
        let id = req_id.to_string();
        let timer = clock::schedule(timeout, move || {
            if let Some(table) = table.upgrade() {
                table.time_out(&id, timeout);
            }
        });

        match self.entries.get_mut(req_id) {
            Some(mut entry) => entry.deadline = Some(timer),
            None => timer.cancel(),
        }
    }

    /// Deliver a reply. Returns `false` if the id is unknown or already retired.
    pub(crate) fn resolve(&self, req_id: &str, outcome: Result<Value, String>) -> bool {
        let Some((_, mut entry)) = self.entries.remove(req_id) else {
            trace!("Discarding reply for unknown request {}", req_id);
            return false;
        };
        entry.cancel_deadline();

        let outcome = outcome.map_err(|message| {
            debug!("Host rejected {} ({}): {}", entry.kind, req_id, message);
            BridgeError::Host {
                kind: entry.kind.clone(),
                message,
            }
        });
        // The receiver may already be gone if the caller dropped its future.
        let _ = entry.reply.send(outcome);
        true
    }

    /// Retire an entry without a reply. Returns `false` if it was already gone.
    pub(crate) fn expire(&self, req_id: &str) -> bool {
        match self.entries.remove(req_id) {
            Some((_, mut entry)) => {
                entry.cancel_deadline();
                true
            }
            None => false,
        }
    }

    fn time_out(&self, req_id: &str, timeout: Duration) {
        // The firing timer is the one stored in the entry; dropping it detaches.
        let Some((_, entry)) = self.entries.remove(req_id) else {
            return;
        };
        warn!("Request {} ({}) timed out after {:?}", entry.kind, req_id, timeout);
        let _ = entry.reply.send(Err(BridgeError::Timeout {
            kind: entry.kind,
            timeout,
        }));
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, req_id: &str) -> bool {
        self.entries.contains_key(req_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reply future
// ─────────────────────────────────────────────────────────────────────────────

/// Future resolving to the host's reply for one request.
///
/// Resolves with the reply's `result`, fails with [`BridgeError::Host`] when
/// the reply carries an `error`, or with [`BridgeError::Timeout`] once the
/// deadline passes. Dropping it before completion retires the request and
/// cancels its deadline.
#[must_use = "a request does nothing useful unless its reply is awaited"]
pub struct PendingReply {
    state: ReplyState,
}

enum ReplyState {
    Waiting(Waiting),
    Failed(Option<BridgeError>),
}

struct Waiting {
    req_id: String,
    rx: oneshot::Receiver<Outcome>,
    table: Arc<PendingTable>,
    done: bool,
}

impl PendingReply {
    pub(crate) fn waiting(
        table: Arc<PendingTable>,
        req_id: String,
        rx: oneshot::Receiver<Outcome>,
    ) -> Self {
        Self {
            state: ReplyState::Waiting(Waiting {
                req_id,
                rx,
                table,
                done: false,
            }),
        }
    }

    /// A reply that fails immediately without touching the transport.
    pub(crate) fn failed(error: BridgeError) -> Self {
        Self {
            state: ReplyState::Failed(Some(error)),
        }
    }

    /// Correlation id carried in the outbound frame, if the request was sent.
    pub fn request_id(&self) -> Option<&str> {
        match &self.state {
            ReplyState::Waiting(waiting) => Some(&waiting.req_id),
            ReplyState::Failed(_) => None,
        }
    }
}

impl Future for PendingReply {
    type Output = Result<Value, BridgeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let waiting = match &mut self.get_mut().state {
            ReplyState::Waiting(waiting) => waiting,
            ReplyState::Failed(error) => {
                return Poll::Ready(Err(error.take().unwrap_or(BridgeError::Closed)));
            }
        };

        if waiting.done {
            return Poll::Ready(Err(BridgeError::Closed));
        }

        match Pin::new(&mut waiting.rx).poll(cx) {
            Poll::Ready(outcome) => {
                waiting.done = true;
                // A dropped sender means the table went away without an outcome.
                Poll::Ready(outcome.unwrap_or(Err(BridgeError::Closed)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if let ReplyState::Waiting(waiting) = &self.state {
            if !waiting.done && waiting.table.expire(&waiting.req_id) {
                debug!("Request {} abandoned by caller", waiting.req_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::task;
    use tokio_test::{assert_pending, assert_ready};

    fn pending(table: &Arc<PendingTable>, kind: &str, timeout: Duration) -> PendingReply {
        let (id, rx) = table.register(kind);
        table.arm_deadline(&id, timeout);
        PendingReply::waiting(Arc::clone(table), id, rx)
    }

    #[test]
    fn test_request_id_shape() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_register_regenerates_on_collision() {
        let table = PendingTable::default();
        let (first, _rx1) = table.register_with("A", || "dup".to_string());

        let mut candidates = vec!["fresh".to_string(), "dup".to_string()];
        let (second, _rx2) = table.register_with("B", || candidates.pop().unwrap());

        assert_eq!(first, "dup");
        assert_eq!(second, "fresh");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_resolve_and_expire_are_exclusive() {
        let table = PendingTable::default();
        let (id, mut rx) = table.register("STORAGE_GET");

        assert!(table.resolve(&id, Ok(json!(1))));
        assert!(!table.expire(&id));
        assert!(!table.resolve(&id, Ok(json!(2))));
        assert_eq!(rx.try_recv().unwrap(), Ok(json!(1)));

        let (id, _rx) = table.register("STORAGE_GET");
        assert!(table.expire(&id));
        assert!(!table.resolve(&id, Ok(json!(3))));
        assert!(!table.contains(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_resolves_future() {
        let table = Arc::new(PendingTable::default());
        let mut reply = task::spawn(pending(&table, "STORAGE_GET", Duration::from_secs(30)));
        assert_pending!(reply.poll());

        let id = reply.request_id().unwrap().to_string();
        assert!(table.resolve(&id, Ok(json!(42))));
        assert!(reply.is_woken());
        assert_eq!(assert_ready!(reply.poll()), Ok(json!(42)));
        assert_eq!(table.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_reply_rejects() {
        let table = Arc::new(PendingTable::default());
        let reply = pending(&table, "SOLANA_SIGN_MESSAGE", Duration::from_secs(30));
        let id = reply.request_id().unwrap().to_string();

        table.resolve(&id, Err("User rejected".to_string()));
        let err = reply.await.unwrap_err();
        assert_eq!(err.host_message(), Some("User rejected"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_times_out_once() {
        let table = Arc::new(PendingTable::default());
        let reply = pending(&table, "GET_SOLANA_BALANCE", Duration::from_millis(50));
        let id = reply.request_id().unwrap().to_string();

        let started = tokio::time::Instant::now();
        let err = reply.await.unwrap_err();
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(
            err,
            BridgeError::Timeout {
                kind: "GET_SOLANA_BALANCE".to_string(),
                timeout: Duration::from_millis(50),
            }
        );

        // Late reply is a no-op
        assert!(!table.resolve(&id, Ok(json!(1.5))));
        assert_eq!(table.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_without_polling() {
        let table = Arc::new(PendingTable::default());
        let mut reply = task::spawn(pending(&table, "CHECK_IS_ACTIVE", Duration::from_millis(10)));
        let id = reply.request_id().unwrap().to_string();

        // Nobody polls the reply while the deadline passes.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!table.contains(&id));
        assert!(!table.resolve(&id, Ok(json!(true))));

        let err = assert_ready!(reply.poll()).unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_cancels_deadline() {
        let table = Arc::new(PendingTable::default());
        let reply = pending(&table, "STORAGE_GET", Duration::from_millis(10));
        let id = reply.request_id().unwrap().to_string();

        assert!(table.resolve(&id, Ok(json!("v"))));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(reply.await, Ok(json!("v")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_retires_entry() {
        let table = Arc::new(PendingTable::default());
        let reply = pending(&table, "STORAGE_GET", Duration::from_secs(30));
        let id = reply.request_id().unwrap().to_string();
        assert!(table.contains(&id));

        drop(reply);
        assert!(!table.contains(&id));
        assert!(!table.resolve(&id, Ok(json!(null))));

        // The cancelled deadline never fires.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_failed_reply_is_immediate() {
        let reply = PendingReply::failed(BridgeError::InvalidPayload {
            kind: "SHOW_ALERT".to_string(),
            reason: "payload must be an object".to_string(),
        });
        assert_eq!(reply.request_id(), None);
        assert!(matches!(reply.await, Err(BridgeError::InvalidPayload { .. })));
    }
}
