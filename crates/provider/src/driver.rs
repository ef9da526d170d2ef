//! `ProviderDriver`: the common operation contract every carrier variant
//! implements (spec §4.6). Expressed as a trait object rather than an enum
//! match so the factory can hand callers a single `Arc<dyn ProviderDriver>`
//! regardless of which variant backs it — no runtime credential-shape
//! discovery past construction time.

use crate::error::Result;
use crate::types::{InitiateCallResult, StatusResult};
use async_trait::async_trait;

#[async_trait]
pub trait ProviderDriver: Send + Sync {
    async fn initiate_call(
        &self,
        to_e164: &str,
        from_e164: &str,
        media_callback_url: &str,
        status_callback_url: &str,
    ) -> Result<InitiateCallResult>;

    async fn get_status(&self, provider_call_id: &str) -> Result<StatusResult>;

    async fn end_call(&self, provider_call_id: &str) -> Result<bool>;

    async fn validate_credentials(&self) -> Result<()>;

    /// Carrier-specific payload instructing it to open a media WebSocket at
    /// `<public_ws_base>/media-stream/<call_id>`.
    fn answer_script(&self, call_id: &str, public_ws_base: &str) -> Vec<u8>;
}

#[async_trait]
impl ProviderDriver for crate::hosted::HostedDriver {
    async fn initiate_call(
        &self,
        to_e164: &str,
        from_e164: &str,
        media_callback_url: &str,
        status_callback_url: &str,
    ) -> Result<InitiateCallResult> {
        self.initiate_call(to_e164, from_e164, media_callback_url, status_callback_url).await
    }

    async fn get_status(&self, provider_call_id: &str) -> Result<StatusResult> {
        self.get_status(provider_call_id).await
    }

    async fn end_call(&self, provider_call_id: &str) -> Result<bool> {
        self.end_call(provider_call_id).await
    }

    async fn validate_credentials(&self) -> Result<()> {
        self.validate_credentials().await
    }

    fn answer_script(&self, call_id: &str, public_ws_base: &str) -> Vec<u8> {
        self.answer_script(call_id, public_ws_base)
    }
}

#[async_trait]
impl ProviderDriver for crate::token_exchange::TokenExchangeDriver {
    async fn initiate_call(
        &self,
        to_e164: &str,
        from_e164: &str,
        media_callback_url: &str,
        status_callback_url: &str,
    ) -> Result<InitiateCallResult> {
        self.initiate_call(to_e164, from_e164, media_callback_url, status_callback_url).await
    }

    async fn get_status(&self, provider_call_id: &str) -> Result<StatusResult> {
        self.get_status(provider_call_id).await
    }

    async fn end_call(&self, provider_call_id: &str) -> Result<bool> {
        self.end_call(provider_call_id).await
    }

    async fn validate_credentials(&self) -> Result<()> {
        self.validate_credentials().await
    }

    fn answer_script(&self, call_id: &str, public_ws_base: &str) -> Vec<u8> {
        self.answer_script(call_id, public_ws_base)
    }
}

#[async_trait]
impl ProviderDriver for crate::generic::GenericDriver {
    async fn initiate_call(
        &self,
        to_e164: &str,
        from_e164: &str,
        media_callback_url: &str,
        status_callback_url: &str,
    ) -> Result<InitiateCallResult> {
        self.initiate_call(to_e164, from_e164, media_callback_url, status_callback_url).await
    }

    async fn get_status(&self, provider_call_id: &str) -> Result<StatusResult> {
        self.get_status(provider_call_id).await
    }

    async fn end_call(&self, provider_call_id: &str) -> Result<bool> {
        self.end_call(provider_call_id).await
    }

    async fn validate_credentials(&self) -> Result<()> {
        self.validate_credentials().await
    }

    fn answer_script(&self, call_id: &str, public_ws_base: &str) -> Vec<u8> {
        self.answer_script(call_id, public_ws_base)
    }
}
