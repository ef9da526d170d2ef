//! Layered settings: `config/default.yaml` < `config/{env}.yaml` < environment
//! variables (`VOXLOOP__section__field`).

use crate::constants::{fsm, media, timeouts, vad};
use crate::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `PUBLIC_BASE_URL`: https base the SignalingRouter advertises to carriers.
    pub public_base_url: String,
    /// `PUBLIC_WS_BASE`: wss base for media-stream upgrade URLs.
    pub public_ws_base: String,
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_base_url: "https://localhost:8080".to_string(),
            public_ws_base: "wss://localhost:8080".to_string(),
            metrics_port: 9090,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// `VOIP_ENCRYPTION_KEY`: process-wide AES-256 key, must be >= 32 bytes.
    pub encryption_key: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self { encryption_key: String::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadSettings {
    pub energy_threshold_db: f32,
    pub silence_hangover_ms: u64,
    pub min_speech_ms: u64,
    pub frame_ms: u64,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            energy_threshold_db: vad::ENERGY_THRESHOLD_DB,
            silence_hangover_ms: vad::SILENCE_HANGOVER_MS,
            min_speech_ms: vad::MIN_SPEECH_MS,
            frame_ms: vad::FRAME_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub provider_http_secs: u64,
    pub llm_connect_secs: u64,
    pub db_write_secs: u64,
    pub manual_hangup_cleanup_secs: u64,
    pub llm_dead_session_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            provider_http_secs: timeouts::PROVIDER_HTTP_SECS,
            llm_connect_secs: timeouts::LLM_CONNECT_SECS,
            db_write_secs: timeouts::DB_WRITE_SECS,
            manual_hangup_cleanup_secs: timeouts::MANUAL_HANGUP_CLEANUP_SECS,
            llm_dead_session_secs: timeouts::LLM_DEAD_SESSION_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FsmTimerSettings {
    pub init_setup_secs: u64,
    pub welcome_max_secs: u64,
    pub human_speaking_max_secs: u64,
    pub thinking_timeout_secs: u64,
    pub responding_max_secs: u64,
    pub response_complete_grace_ms: u64,
    pub filler_grace_ms: u64,
    pub llm_reconnect_deadline_secs: u64,
}

impl Default for FsmTimerSettings {
    fn default() -> Self {
        Self {
            init_setup_secs: fsm::INIT_SETUP_SECS,
            welcome_max_secs: fsm::WELCOME_MAX_SECS,
            human_speaking_max_secs: fsm::HUMAN_SPEAKING_MAX_SECS,
            thinking_timeout_secs: fsm::THINKING_TIMEOUT_SECS,
            responding_max_secs: fsm::RESPONDING_MAX_SECS,
            response_complete_grace_ms: fsm::RESPONSE_COMPLETE_GRACE_MS,
            filler_grace_ms: fsm::FILLER_GRACE_MS,
            llm_reconnect_deadline_secs: fsm::LLM_RECONNECT_DEADLINE_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaBridgeSettings {
    pub outbound_queue_max_ms: u64,
    pub inbound_queue_max_ms: u64,
    pub outbound_frame_ms: u64,
}

impl Default for MediaBridgeSettings {
    fn default() -> Self {
        Self {
            outbound_queue_max_ms: media::OUTBOUND_QUEUE_MAX_MS,
            inbound_queue_max_ms: media::INBOUND_QUEUE_MAX_MS,
            outbound_frame_ms: media::OUTBOUND_FRAME_MS,
        }
    }
}

/// Per-call pipeline tuning: VAD, FSM timers, media-bridge backpressure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub vad: VadSettings,
    pub timeouts: TimeoutSettings,
    pub fsm: FsmTimerSettings,
    pub media: MediaBridgeSettings,
    pub hedge_prewarm_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Media-socket messages allowed per second, per connection.
    pub messages_per_sec: u32,
    /// Media-socket bytes allowed per second, per connection.
    pub bytes_per_sec: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            messages_per_sec: 100,
            bytes_per_sec: 256_000,
            burst: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub json_logs: bool,
    pub metrics_enabled: bool,
    /// Enables the OTLP tracing pipeline when built with the `telemetry`
    /// feature. Ignored otherwise.
    pub tracing_enabled: bool,
    pub otlp_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            tracing_enabled: false,
            otlp_endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `STORE_URL`: comma-separated ScyllaDB contact points.
    pub url: String,
    pub keyspace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:9042".to_string(),
            keyspace: "voxloop".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Base URL for the Hosted carrier variant's REST API (spec §4.6); an
    /// operator-level deployment constant, not a per-provider credential, so
    /// it lives here rather than in `ProviderConfig`.
    pub hosted_base_url: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self { hosted_base_url: "https://api.hostedcarrier.example.com".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `LLM_API_KEY`.
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "wss://generativelanguage.googleapis.com/ws".to_string(),
            model: "gemini-2.0-flash-live".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub environment: RuntimeEnvironment,
    pub server: ServerConfig,
    pub vault: VaultConfig,
    pub pipeline: PipelineConfig,
    pub rate_limit: RateLimitConfig,
    pub observability: ObservabilityConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub provider: ProviderSettings,
}

impl Settings {
    /// Bounds/shape checks that can't be expressed as serde defaults: vault
    /// key length, non-zero ports, sane timer ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vault.encryption_key.len() < 32 {
            return Err(ConfigError::InvalidValue {
                field: "vault.encryption_key".to_string(),
                message: format!(
                    "must be at least 32 bytes, got {}",
                    self.vault.encryption_key.len()
                ),
            });
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.pipeline.vad.silence_hangover_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.vad.silence_hangover_ms".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if !self.server.public_base_url.starts_with("https://")
            && !self.server.public_base_url.starts_with("http://")
        {
            return Err(ConfigError::InvalidValue {
                field: "server.public_base_url".to_string(),
                message: "must be an http(s) URL".to_string(),
            });
        }
        Ok(())
    }
}

/// Load `config/default.yaml`, then `config/{env}.yaml` if present, then
/// environment variables prefixed `VOXLOOP` with `__` as the nesting
/// separator (e.g. `VOXLOOP__SERVER__PORT=9000`). A handful of well-known
/// top-level env vars are mapped onto their nested field afterward so
/// operators don't need the `VOXLOOP__` prefix for them.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false));

    if let Some(env) = env {
        builder = builder.add_source(
            config::File::with_name(&format!("config/{env}")).required(false),
        );
    }

    builder = builder.add_source(
        config::Environment::with_prefix("VOXLOOP")
            .separator("__")
            .try_parsing(true),
    );

    let raw = builder.build()?;
    let mut settings: Settings = raw.try_deserialize()?;

    if let Ok(key) = std::env::var("VOIP_ENCRYPTION_KEY") {
        settings.vault.encryption_key = key;
    }
    if let Ok(url) = std::env::var("PUBLIC_BASE_URL") {
        settings.server.public_base_url = url;
    }
    if let Ok(url) = std::env::var("PUBLIC_WS_BASE") {
        settings.server.public_ws_base = url;
    }
    if let Ok(key) = std::env::var("LLM_API_KEY") {
        settings.llm.api_key = key;
    }
    if let Ok(url) = std::env::var("STORE_URL") {
        settings.store.url = url;
    }
    if let Ok(port) = std::env::var("PORT") {
        if let Ok(port) = port.parse() {
            settings.server.port = port;
        }
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let settings = Settings::default();
        assert_eq!(settings.pipeline.vad.energy_threshold_db, -40.0);
        assert_eq!(settings.pipeline.fsm.thinking_timeout_secs, 15);
    }

    #[test]
    fn validate_rejects_short_vault_key() {
        let mut settings = Settings::default();
        settings.vault.encryption_key = "too-short".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_accepts_full_length_key() {
        let mut settings = Settings::default();
        settings.vault.encryption_key = "a".repeat(32);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_port() {
        let mut settings = Settings::default();
        settings.vault.encryption_key = "a".repeat(32);
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }
}
