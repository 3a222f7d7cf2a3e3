//! REST key-value service client
//!
//! Each command is sent as a JSON array (`["SET", "k", "v", "EX", "60"]`)
//! POSTed to the service base URL with a bearer token. The service answers
//! `{"result": ...}` on success and `{"error": "..."}` on failure.

use crate::cache::types::CacheValue;
use crate::error::{CacheError, Result};
use crate::store::{ttl_seconds, KeyValueStore};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Reply envelope of the REST service
#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl CommandReply {
    fn into_result(self, command: &str) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(CacheError::StoreError(format!("{}: {}", command, error)));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Client for a REST-accessed key-value service
pub struct RestStore {
    client: Client,
    url: String,
    token: String,
    timeout: Duration,
}

impl RestStore {
    /// Create a client for the service at `url`, authenticating with `token`.
    ///
    /// No request is made until the first command.
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(CacheError::ConfigError("REST store URL is empty".to_string()));
        }

        info!("Configuring REST key-value store at {}", url);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout,
        })
    }

    async fn command(&self, args: &[&str]) -> Result<Value> {
        let name = args.first().copied().unwrap_or("");
        debug!("REST store command: {}", name);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await
            .map_err(|e| self.transport_error(e, name))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, name))?;

        decode_reply(status, &body, name)
    }

    fn transport_error(&self, error: reqwest::Error, command: &str) -> CacheError {
        if error.is_timeout() {
            CacheError::TimeoutError {
                timeout_ms: self.timeout.as_millis() as u64,
                context: command.to_string(),
            }
        } else if error.is_connect() {
            CacheError::ConnectionError(error.to_string())
        } else if error.is_decode() {
            CacheError::SerializationError(error.to_string())
        } else {
            CacheError::Http(error)
        }
    }
}

/// Decode a reply body. Failed statuses are judged before the body, since
/// gateways in front of the service answer with HTML error pages.
fn decode_reply(status: StatusCode, body: &str, command: &str) -> Result<Value> {
    let reply = match serde_json::from_str::<CommandReply>(body) {
        Ok(reply) => reply,
        Err(_) if !status.is_success() => return Err(status_error(status, command)),
        Err(e) => {
            return Err(CacheError::SerializationError(format!(
                "{}: undecodable reply: {}",
                command, e
            )))
        }
    };

    if !status.is_success() && reply.error.is_none() {
        return Err(status_error(status, command));
    }
    reply.into_result(command)
}

/// 5xx means the service (or its gateway) is down; anything else is a
/// rejected request
fn status_error(status: StatusCode, command: &str) -> CacheError {
    if status.is_server_error() {
        CacheError::ConnectionError(format!("{}: HTTP {}", command, status))
    } else {
        CacheError::StoreError(format!("{}: HTTP {}", command, status))
    }
}

/// GET replies carry strings, but numeric counters may come back as numbers
fn value_to_cache_value(value: Value) -> Option<CacheValue> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn value_to_integer(value: &Value, command: &str) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| CacheError::StoreError(format!("{}: non-integer reply {}", command, value)))
}

#[async_trait]
impl KeyValueStore for RestStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let value = self.command(&["GET", key]).await?;
        Ok(value_to_cache_value(value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let seconds = ttl_seconds(ttl).to_string();
        self.command(&["SET", key, value, "EX", &seconds]).await?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let value = self.command(&["INCR", key]).await?;
        value_to_integer(&value, "INCR")
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let seconds = ttl_seconds(ttl).to_string();
        self.command(&["EXPIRE", key, &seconds]).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.command(&["PING"]).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_with_result() {
        let reply: CommandReply = serde_json::from_value(json!({"result": "OK"})).unwrap();
        assert_eq!(reply.into_result("SET").unwrap(), json!("OK"));
    }

    #[test]
    fn test_reply_with_null_result() {
        let reply: CommandReply = serde_json::from_value(json!({"result": null})).unwrap();
        let value = reply.into_result("GET").unwrap();
        assert_eq!(value_to_cache_value(value), None);
    }

    #[test]
    fn test_reply_with_error() {
        let reply: CommandReply = serde_json::from_value(
            json!({"error": "ERR value is not an integer or out of range"}),
        )
        .unwrap();
        let err = reply.into_result("INCR").unwrap_err();
        assert!(matches!(err, CacheError::StoreError(_)));
        assert!(err.to_string().contains("INCR"));
    }

    #[test]
    fn test_integer_replies() {
        assert_eq!(value_to_integer(&json!(3), "INCR").unwrap(), 3);
        assert_eq!(value_to_integer(&json!("7"), "INCR").unwrap(), 7);
        assert!(value_to_integer(&json!("seven"), "INCR").is_err());
    }

    #[test]
    fn test_non_string_get_reply() {
        assert_eq!(value_to_cache_value(json!(12)), Some("12".to_string()));
        assert_eq!(
            value_to_cache_value(json!("{\"sku\":\"A\"}")),
            Some("{\"sku\":\"A\"}".to_string())
        );
    }

    #[test]
    fn test_gateway_error_page_is_unavailable() {
        let html = "<html><body><h1>502 Bad Gateway</h1></body></html>";
        let err = decode_reply(StatusCode::BAD_GATEWAY, html, "GET").unwrap_err();

        assert!(matches!(err, CacheError::ConnectionError(_)));
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_failed_status_replies() {
        let err = decode_reply(StatusCode::UNAUTHORIZED, "Unauthorized", "GET").unwrap_err();
        assert!(matches!(err, CacheError::StoreError(_)));
        assert!(!err.is_unavailable());

        let err = decode_reply(StatusCode::BAD_REQUEST, r#"{"error":"ERR syntax error"}"#, "SET")
            .unwrap_err();
        assert!(err.to_string().contains("ERR syntax error"));

        let err = decode_reply(StatusCode::SERVICE_UNAVAILABLE, r#"{"result":null}"#, "GET")
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_success_replies() {
        assert_eq!(decode_reply(StatusCode::OK, r#"{"result":"OK"}"#, "SET").unwrap(), json!("OK"));

        let err = decode_reply(StatusCode::OK, "not json", "GET").unwrap_err();
        assert!(matches!(err, CacheError::SerializationError(_)));
    }

    #[test]
    fn test_empty_url_rejected() {
        let result = RestStore::new("  ", "token", Duration::from_secs(1));
        assert!(matches!(result, Err(CacheError::ConfigError(_))));
    }
}
