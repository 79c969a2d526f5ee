//! Cloud storage scoped to the current user and mini-app.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::catalog::{STORAGE_GET, STORAGE_REMOVE, STORAGE_SET};
use crate::{NajiApp, Result, decode, truthy};

#[derive(Serialize)]
struct KeyPayload<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct SetPayload<'a, V> {
    key: &'a str,
    value: V,
}

impl NajiApp {
    /// Store `value` under `key`. Resolves to the host's confirmation.
    pub fn set_item(
        &self,
        key: &str,
        value: impl Serialize,
    ) -> impl Future<Output = Result<bool>> {
        let reply = self.bridge.request(STORAGE_SET, SetPayload { key, value });
        async move { Ok(truthy(&reply.await?)) }
    }

    /// Raw stored value; `null` when the key is absent.
    pub fn get_item(&self, key: &str) -> impl Future<Output = Result<Value>> {
        self.bridge.request(STORAGE_GET, KeyPayload { key })
    }

    /// Stored value decoded as `T`; `None` when the key is absent.
    pub fn get_item_as<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<T>>> {
        let reply = self.bridge.request(STORAGE_GET, KeyPayload { key });
        async move {
            match reply.await? {
                Value::Null => Ok(None),
                value => decode(STORAGE_GET, value).map(Some),
            }
        }
    }

    /// Same as [`NajiApp::set_item`].
    pub fn change_item(
        &self,
        key: &str,
        value: impl Serialize,
    ) -> impl Future<Output = Result<bool>> {
        self.set_item(key, value)
    }

    pub fn delete_item(&self, key: &str) -> impl Future<Output = Result<bool>> {
        let reply = self.bridge.request(STORAGE_REMOVE, KeyPayload { key });
        async move { Ok(truthy(&reply.await?)) }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use crate::BridgeError;
    use crate::test_support::app;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Progress {
        level: u32,
        stars: Vec<u8>,
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_item_payload() {
        let (app, host) = app();

        let reply = app.set_item("progress", json!({"level": 3, "stars": [1, 2]}));
        let frame = host.requests_of(STORAGE_SET).remove(0);
        assert_eq!(frame.payload["key"], "progress");
        assert_eq!(frame.payload["value"]["level"], 3);

        host.reply(frame.request_id().unwrap(), json!(true));
        assert_eq!(reply.await, Ok(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_item_typed() {
        let (app, host) = app();

        let reply = app.get_item_as::<Progress>("progress");
        let id = host.last_request_id(STORAGE_GET).unwrap();
        host.reply(&id, json!({"level": 3, "stars": [1, 2]}));
        assert_eq!(
            reply.await,
            Ok(Some(Progress {
                level: 3,
                stars: vec![1, 2]
            }))
        );

        let missing = app.get_item_as::<Progress>("nothing");
        host.reply(&host.last_request_id(STORAGE_GET).unwrap(), Value::Null);
        assert_eq!(missing.await, Ok(None));

        let wrong = app.get_item_as::<Progress>("progress");
        host.reply(&host.last_request_id(STORAGE_GET).unwrap(), json!("corrupt"));
        assert!(matches!(wrong.await, Err(BridgeError::Decode { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_item_raw() {
        let (app, host) = app();
        let reply = app.get_item("score");
        host.reply(&host.last_request_id(STORAGE_GET).unwrap(), json!(42));
        assert_eq!(reply.await, Ok(json!(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_and_delete() {
        let (app, host) = app();

        let changed = app.change_item("score", 7);
        host.reply(&host.last_request_id(STORAGE_SET).unwrap(), json!(true));
        assert_eq!(changed.await, Ok(true));

        let deleted = app.delete_item("score");
        let frame = host.requests_of(STORAGE_REMOVE).remove(0);
        assert_eq!(frame.payload["key"], "score");
        host.reply(frame.request_id().unwrap(), Value::Null);
        assert_eq!(deleted.await, Ok(false));
    }
}
