//! *Generic* variant: signed HTTP against a user-supplied endpoint. The only
//! variant whose wire shape is not a specific carrier's API, so the signing
//! scheme is ours: `X-Api-Key: <apiKey>` plus `X-Signature: hex(HMAC-SHA256(
//! secretKey, body))`, giving the endpoint owner a way to authenticate the
//! request without us hardcoding a third-party carrier's conventions.

use crate::error::{ProviderError, Result};
use crate::types::{InitiateCallResult, StatusResult};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const PROVIDER_HTTP_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct GenericCredentials {
    pub endpoint_url: String,
    pub http_method: String,
    pub api_key: String,
    pub secret_key: String,
    pub headers: BTreeMap<String, String>,
}

pub struct GenericDriver {
    credentials: GenericCredentials,
    client: reqwest::Client,
}

impl GenericDriver {
    pub fn new(credentials: GenericCredentials) -> Self {
        Self { credentials, client: reqwest::Client::new() }
    }

    fn sign(&self, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.credentials.secret_key.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn request(&self, url: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let body_str = body.to_string();
        let signature = self.sign(&body_str);

        let method = match self.credentials.http_method.to_uppercase().as_str() {
            "PUT" => reqwest::Method::PUT,
            _ => reqwest::Method::POST,
        };

        let mut builder = self
            .client
            .request(method, url)
            .header("X-Api-Key", &self.credentials.api_key)
            .header("X-Signature", signature)
            .header("Content-Type", "application/json")
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .body(body_str);

        for (name, value) in &self.credentials.headers {
            builder = builder.header(name, value);
        }

        builder
    }

    pub async fn initiate_call(
        &self,
        to_e164: &str,
        from_e164: &str,
        media_callback_url: &str,
        status_callback_url: &str,
    ) -> Result<InitiateCallResult> {
        let body = json!({
            "to": to_e164,
            "from": from_e164,
            "callback_url": media_callback_url,
            "status_callback": status_callback_url,
        });

        let response = self.request(&self.credentials.endpoint_url, &body).send().await?;
        classify_http_status(response.status().as_u16())?;

        let body: serde_json::Value = response.json().await?;
        let provider_call_id = ["provider_call_id", "call_id", "id"]
            .iter()
            .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
            .ok_or_else(|| ProviderError::UnknownProviderError("no call id in response".into()))?
            .to_string();
        let initial_status =
            body.get("status").and_then(|v| v.as_str()).unwrap_or("initiated").to_string();

        Ok(InitiateCallResult { provider_call_id, initial_status })
    }

    pub async fn get_status(&self, provider_call_id: &str) -> Result<StatusResult> {
        let url = format!("{}/status/{provider_call_id}", self.credentials.endpoint_url);
        let response = self.request(&url, &json!({})).send().await?;
        classify_http_status(response.status().as_u16())?;

        let body: serde_json::Value = response.json().await?;
        Ok(StatusResult {
            status: body.get("status").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
            duration_sec: body.get("duration_sec").and_then(|v| v.as_u64()).map(|d| d as u32),
            started_at: None,
            ended_at: None,
            answered_by: None,
        })
    }

    pub async fn end_call(&self, provider_call_id: &str) -> Result<bool> {
        let url = format!("{}/end/{provider_call_id}", self.credentials.endpoint_url);
        let response = self.request(&url, &json!({})).send().await?;
        Ok(response.status().is_success())
    }

    /// `GET endpointUrl` returns 2xx (spec §4.6).
    pub async fn validate_credentials(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.credentials.endpoint_url)
            .header("X-Api-Key", &self.credentials.api_key)
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .send()
            .await?;

        classify_http_status(response.status().as_u16())
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

fn classify_http_status(status: u16) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(ProviderError::AuthFailed),
        429 => Err(ProviderError::RateLimited),
        400 => Err(ProviderError::InvalidTo("rejected by endpoint".into())),
        _ => Err(ProviderError::UnknownProviderError(format!("http {status}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> GenericDriver {
        GenericDriver::new(GenericCredentials {
            endpoint_url: "https://example.com/dial".into(),
            http_method: "POST".into(),
            api_key: "key".into(),
            secret_key: "secret".into(),
            headers: BTreeMap::new(),
        })
    }

    #[test]
    fn signature_is_deterministic_for_same_body() {
        let d = driver();
        assert_eq!(d.sign("body"), d.sign("body"));
        assert_ne!(d.sign("body-a"), d.sign("body-b"));
    }

    #[test]
    fn answer_script_embeds_call_id() {
        let d = driver();
        let script = d.answer_script("call-7", "wss://voxloop.example");
        let parsed: serde_json::Value = serde_json::from_slice(&script).unwrap();
        assert_eq!(parsed["actions"][0]["parameters"]["callSid"], "call-7");
    }

    #[test]
    fn classifies_http_statuses() {
        assert_eq!(classify_http_status(403), Err(ProviderError::AuthFailed));
        assert!(classify_http_status(204).is_ok());
    }
}
