//! *TokenExchange* variant: fetch a short-lived bearer token, then dial.
//! `get_status`/`end_call` extend the same host with the conventional REST
//! shape the dial step implies, since their exact wire format is otherwise
//! unconstrained.

use crate::error::{ProviderError, Result};
use crate::types::{normalize_digits, InitiateCallResult, StatusResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::time::Duration;

const PROVIDER_HTTP_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct TokenExchangeCredentials {
    pub token_endpoint: String,
    pub dial_endpoint: String,
    pub access_token: String,
    pub access_key: String,
    pub app_id: i64,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    api_token: String,
    expiry: DateTime<Utc>,
}

pub struct TokenExchangeDriver {
    credentials: TokenExchangeCredentials,
    client: reqwest::Client,
    cached_token: Mutex<Option<CachedToken>>,
}

impl TokenExchangeDriver {
    pub fn new(credentials: TokenExchangeCredentials) -> Self {
        Self {
            credentials,
            client: reqwest::Client::new(),
            cached_token: Mutex::new(None),
        }
    }

    /// Fetch a fresh bearer token, or reuse the cached one if still valid.
    async fn api_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.lock();
            if let Some(token) = cached.as_ref() {
                if token.expiry > Utc::now() {
                    return Ok(token.api_token.clone());
                }
            }
        }

        let response = self
            .client
            .post(&self.credentials.token_endpoint)
            .header("Accesstoken", &self.credentials.access_token)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header("Content-Type", "application/json")
            .json(&json!({ "access_key": self.credentials.access_key }))
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::AuthFailed);
        }

        let body: serde_json::Value = response.json().await?;
        let ok = body.get("status").and_then(|v| v.as_str()) == Some("success");
        if !ok {
            return Err(ProviderError::AuthFailed);
        }

        let api_token = body
            .get("Apitoken")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::UnknownProviderError("missing Apitoken".into()))?
            .to_string();
        let expiry = body
            .get("expiry_time")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc::now() + chrono::Duration::minutes(5));

        *self.cached_token.lock() = Some(CachedToken { api_token: api_token.clone(), expiry });

        Ok(api_token)
    }

    pub async fn initiate_call(
        &self,
        to_e164: &str,
        from_e164: &str,
        media_callback_url: &str,
        status_callback_url: &str,
    ) -> Result<InitiateCallResult> {
        let api_token = self.api_token().await?;
        let record_id = format!("call_{}", Utc::now().timestamp_millis());

        let response = self
            .client
            .post(&self.credentials.dial_endpoint)
            .header("Apitoken", &api_token)
            .header("Content-Type", "application/json")
            .json(&json!({
                "appid": self.credentials.app_id,
                "call_to": normalize_digits(to_e164),
                "caller_id": normalize_digits(from_e164),
                "custom_field": {
                    "callback_url": media_callback_url,
                    "status_callback": status_callback_url,
                    "record_id": record_id,
                }
            }))
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(ProviderError::UnknownProviderError(format!(
                "dial failed with http {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        let status = body.get("status").and_then(|v| v.as_str()).unwrap_or("unknown");
        if status != "success" {
            return Err(ProviderError::UnknownProviderError(format!("dial status: {status}")));
        }

        let provider_call_id = ["call_id", "id", "Callid"]
            .iter()
            .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
            .ok_or_else(|| ProviderError::UnknownProviderError("no call id in response".into()))?
            .to_string();

        Ok(InitiateCallResult { provider_call_id, initial_status: status.to_string() })
    }

    pub async fn get_status(&self, provider_call_id: &str) -> Result<StatusResult> {
        let api_token = self.api_token().await?;
        let url = format!("{}/status/{provider_call_id}", self.credentials.dial_endpoint);

        let response = self
            .client
            .get(&url)
            .header("Apitoken", &api_token)
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::UnknownProviderError(format!("http {}", response.status())));
        }

        let body: serde_json::Value = response.json().await?;
        Ok(StatusResult {
            status: body.get("status").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
            duration_sec: body.get("duration").and_then(|v| v.as_u64()).map(|d| d as u32),
            started_at: None,
            ended_at: None,
            answered_by: None,
        })
    }

    pub async fn end_call(&self, provider_call_id: &str) -> Result<bool> {
        let api_token = self.api_token().await?;
        let url = format!("{}/hangup/{provider_call_id}", self.credentials.dial_endpoint);

        let response = self
            .client
            .post(&url)
            .header("Apitoken", &api_token)
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .send()
            .await?;

        Ok(response.status().is_success())
    }

    pub async fn validate_credentials(&self) -> Result<()> {
        self.api_token().await.map(|_| ())
    }

    pub fn answer_script(&self, call_id: &str, public_ws_base: &str) -> Vec<u8> {
        json!({
            "actions": [{
                "type": "connect_websocket",
                "url": format!("{public_ws_base}/media-stream/{call_id}"),
                "parameters": { "callSid": call_id }
            }]
        })
        .to_string()
        .into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_script_is_valid_json_with_call_sid() {
        let driver = TokenExchangeDriver::new(TokenExchangeCredentials {
            token_endpoint: "https://example.com/token".into(),
            dial_endpoint: "https://example.com/dial".into(),
            access_token: "at".into(),
            access_key: "ak".into(),
            app_id: 1,
            username: "u".into(),
            password: "p".into(),
        });
        let script = driver.answer_script("call-9", "wss://voxloop.example");
        let parsed: serde_json::Value = serde_json::from_slice(&script).unwrap();
        assert_eq!(parsed["actions"][0]["parameters"]["callSid"], "call-9");
    }
}
