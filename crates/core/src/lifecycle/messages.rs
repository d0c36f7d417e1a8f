//! Page-to-worker message protocol.
//!
//! Messages are JSON objects of the form `{"action": "...", "data": ...}`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    SkipWaiting,
    ClearCache,
    GetCacheSize,
    GetVersion,
    CacheUrls { urls: Vec<String> },
}

impl WorkerMessage {
    /// Decode a message posted by a page.
    pub fn from_json(value: serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value).map_err(|e| Error::InvalidMessage(e.to_string()))
    }

    pub fn action(&self) -> &'static str {
        match self {
            WorkerMessage::SkipWaiting => "SKIP_WAITING",
            WorkerMessage::ClearCache => "CLEAR_CACHE",
            WorkerMessage::GetCacheSize => "GET_CACHE_SIZE",
            WorkerMessage::GetVersion => "GET_VERSION",
            WorkerMessage::CacheUrls { .. } => "CACHE_URLS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VersionReply {
    pub version: String,
    pub static_cache: String,
    pub dynamic_cache: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheSizeReply {
    pub cache_size: u64,
}

/// Reply posted back to the page, for the queries that have one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum MessageReply {
    Version(VersionReply),
    CacheSize(CacheSizeReply),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_messages_without_data() {
        assert_eq!(WorkerMessage::from_json(json!({"action": "SKIP_WAITING"})).unwrap(), WorkerMessage::SkipWaiting);
        assert_eq!(WorkerMessage::from_json(json!({"action": "CLEAR_CACHE"})).unwrap(), WorkerMessage::ClearCache);
        assert_eq!(
            WorkerMessage::from_json(json!({"action": "GET_CACHE_SIZE"})).unwrap(),
            WorkerMessage::GetCacheSize
        );
    }

    #[test]
    fn test_cache_urls_payload() {
        let msg = WorkerMessage::from_json(json!({
            "action": "CACHE_URLS",
            "data": {"urls": ["/api/categories/", "/static/img/logo.svg"]}
        }))
        .unwrap();
        assert_eq!(
            msg,
            WorkerMessage::CacheUrls { urls: vec!["/api/categories/".into(), "/static/img/logo.svg".into()] }
        );
        assert_eq!(msg.action(), "CACHE_URLS");
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = WorkerMessage::from_json(json!({"action": "REBOOT"})).unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));

        let err = WorkerMessage::from_json(json!({"type": "GET_VERSION"})).unwrap_err();
        assert!(err.to_string().starts_with("INVALID_MESSAGE"));
    }

    #[test]
    fn test_replies_serialize_camel_case() {
        let version = MessageReply::Version(VersionReply {
            version: "3.0.0".into(),
            static_cache: "arca-static-v3.0.0".into(),
            dynamic_cache: "arca-dynamic-v3.0.0".into(),
        });
        assert_eq!(
            serde_json::to_value(&version).unwrap(),
            json!({"version": "3.0.0", "staticCache": "arca-static-v3.0.0", "dynamicCache": "arca-dynamic-v3.0.0"})
        );

        let size = MessageReply::CacheSize(CacheSizeReply { cache_size: 40 });
        assert_eq!(serde_json::to_value(&size).unwrap(), json!({"cacheSize": 40}));
    }
}
