//! *Hosted* variant: account-id + auth-token credentials against a
//! Twilio-shaped REST API, using the native HTTP Basic auth account model.

use crate::error::{ProviderError, Result};
use crate::types::{AnsweredBy, InitiateCallResult, StatusResult};
use std::time::Duration;

const PROVIDER_HTTP_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct HostedCredentials {
    pub account_id: String,
    pub auth_token: String,
}

#[derive(Clone)]
pub struct HostedDriver {
    credentials: HostedCredentials,
    base_url: String,
    client: reqwest::Client,
}

impl HostedDriver {
    pub fn new(credentials: HostedCredentials, base_url: impl Into<String>) -> Self {
        Self {
            credentials,
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn initiate_call(
        &self,
        to_e164: &str,
        from_e164: &str,
        media_callback_url: &str,
        status_callback_url: &str,
    ) -> Result<InitiateCallResult> {
        let url = format!(
            "{}/Accounts/{}/Calls.json",
            self.base_url, self.credentials.account_id
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.account_id, Some(&self.credentials.auth_token))
            .form(&[
                ("To", to_e164),
                ("From", from_e164),
                ("Url", media_callback_url),
                ("StatusCallback", status_callback_url),
            ])
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .send()
            .await?;

        classify_http_status(response.status().as_u16())?;

        let body: serde_json::Value = response.json().await?;
        let provider_call_id = body
            .get("sid")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::UnknownProviderError("missing sid in response".into()))?
            .to_string();
        let initial_status = body
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("queued")
            .to_string();

        Ok(InitiateCallResult { provider_call_id, initial_status })
    }

    pub async fn get_status(&self, provider_call_id: &str) -> Result<StatusResult> {
        let url = format!(
            "{}/Accounts/{}/Calls/{}.json",
            self.base_url, self.credentials.account_id, provider_call_id
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.account_id, Some(&self.credentials.auth_token))
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .send()
            .await?;

        classify_http_status(response.status().as_u16())?;

        let body: serde_json::Value = response.json().await?;
        let status = body.get("status").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
        let duration_sec = body.get("duration").and_then(|v| v.as_str()).and_then(|s| s.parse().ok());
        let answered_by = body.get("answered_by").and_then(|v| v.as_str()).map(|s| match s {
            "human" => AnsweredBy::Human,
            "machine_start" | "machine_end_beep" | "machine_end_silence" => AnsweredBy::Machine,
            _ => AnsweredBy::Unknown,
        });

        Ok(StatusResult {
            status,
            duration_sec,
            started_at: None,
            ended_at: None,
            answered_by,
        })
    }

    pub async fn end_call(&self, provider_call_id: &str) -> Result<bool> {
        let url = format!(
            "{}/Accounts/{}/Calls/{}.json",
            self.base_url, self.credentials.account_id, provider_call_id
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.account_id, Some(&self.credentials.auth_token))
            .form(&[("Status", "completed")])
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .send()
            .await?;

        Ok(response.status().is_success())
    }

    pub async fn validate_credentials(&self) -> Result<()> {
        let url = format!("{}/Accounts/{}.json", self.base_url, self.credentials.account_id);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.credentials.account_id, Some(&self.credentials.auth_token))
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .send()
            .await?;

        classify_http_status(response.status().as_u16())
    }

    pub fn answer_script(&self, call_id: &str, public_ws_base: &str) -> Vec<u8> {
        format!(
            r#"<Response><Connect><Stream url="{public_ws_base}/media-stream/{call_id}"><Parameter name="callSid" value="{call_id}"/></Stream></Connect></Response>"#
        )
        .into_bytes()
    }
}

fn classify_http_status(status: u16) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(ProviderError::AuthFailed),
        429 => Err(ProviderError::RateLimited),
        400 => Err(ProviderError::InvalidTo("rejected by carrier".into())),
        _ => Err(ProviderError::UnknownProviderError(format!("http {status}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_script_embeds_call_id_and_ws_base() {
        let driver = HostedDriver::new(
            HostedCredentials { account_id: "AC1".into(), auth_token: "tok".into() },
            "https://api.example.com",
        );
        let script = String::from_utf8(driver.answer_script("call-123", "wss://voxloop.example")).unwrap();
        assert!(script.contains("wss://voxloop.example/media-stream/call-123"));
        assert!(script.contains(r#"value="call-123""#));
    }

    #[test]
    fn classifies_auth_failure() {
        assert_eq!(classify_http_status(401), Err(ProviderError::AuthFailed));
        assert_eq!(classify_http_status(429), Err(ProviderError::RateLimited));
        assert!(classify_http_status(200).is_ok());
    }
}
