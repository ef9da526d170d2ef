//! Shared application state threaded through every HTTP/WS handler
//! (spec §4.10 SignalingRouter). One `AppState` per process, cloned (cheaply
//! — everything inside is an `Arc`) into each handler by axum's `State`
//! extractor.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use voxloop_config::{ConfigError, Settings};
use voxloop_core::{AgentConfig, PhoneNumber, ProviderConfig};
use voxloop_intelligence::HedgeEngine;
use voxloop_provider::FactoryConfig;
use voxloop_store::CallStore;
use voxloop_vault::CredentialVault;

use crate::session::CallSessionHandle;

/// Operator-managed agent/provider/number registry. A full CRM/admin surface
/// is out of scope; this is the minimal in-memory seam `/call/outbound`
/// needs to resolve `agentId` to a prompt, a carrier, and a caller-id.
#[derive(Default)]
pub struct Directory {
    pub agents: DashMap<String, AgentConfig>,
    pub providers: DashMap<String, ProviderConfig>,
    /// Keyed by `agent_id`: the one outbound caller-id currently assigned.
    pub phone_numbers: DashMap<String, PhoneNumber>,
}

impl Directory {
    pub fn register_agent(&self, agent: AgentConfig) {
        self.agents.insert(agent.id.clone(), agent);
    }

    pub fn register_provider(&self, provider: ProviderConfig) {
        self.providers.insert(provider.id.clone(), provider);
    }

    pub fn assign_phone_number(&self, agent_id: impl Into<String>, number: PhoneNumber) {
        self.phone_numbers.insert(agent_id.into(), number);
    }
}

#[derive(Clone)]
pub struct AppState {
    /// `RwLock` rather than a bare `Settings` so `/admin/reload-config` can
    /// swap in a freshly loaded copy without restarting the process.
    pub settings: Arc<RwLock<Settings>>,
    pub call_store: Arc<dyn CallStore>,
    pub vault: Arc<CredentialVault>,
    pub hedge_engine: Arc<HedgeEngine>,
    pub factory_config: Arc<FactoryConfig>,
    pub directory: Arc<Directory>,
    /// Running per-call sessions, keyed by `call_id`. Populated when the
    /// carrier's media WebSocket attaches, removed once the call ends.
    pub sessions: Arc<DashMap<String, Arc<CallSessionHandle>>>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        call_store: Arc<dyn CallStore>,
        vault: Arc<CredentialVault>,
        hedge_engine: Arc<HedgeEngine>,
        factory_config: FactoryConfig,
    ) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            call_store,
            vault,
            hedge_engine,
            factory_config: Arc::new(factory_config),
            directory: Arc::new(Directory::default()),
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Re-reads layered config from disk/env and swaps it in if valid.
    /// Pipeline/timer settings already in flight for an active call are
    /// unaffected; only new calls pick up the change.
    pub fn reload_settings(&self, env: Option<&str>) -> Result<(), ConfigError> {
        let fresh = voxloop_config::load_settings(env)?;
        fresh.validate()?;
        *self.settings.write() = fresh;
        tracing::info!("settings reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxloop_provider::FactoryConfig;
    use voxloop_store::InMemoryCallStore;

    fn state() -> AppState {
        AppState::new(
            Settings::default(),
            Arc::new(InMemoryCallStore::new()),
            Arc::new(CredentialVault::new(&[7u8; 32]).unwrap()),
            Arc::new(HedgeEngine::new(Vec::new(), 0)),
            FactoryConfig { hosted_base_url: String::new() },
        )
    }

    #[test]
    fn directory_resolves_registered_agent() {
        let s = state();
        s.directory.register_agent(AgentConfig {
            id: "a1".into(),
            name: "n".into(),
            prompt: "p".into(),
            welcome_message: "w".into(),
            characteristics: vec![],
            voice_profile: voxloop_core::VoiceProfile { voice_id: "v".into(), language_code: "en".into() },
            speech: voxloop_core::SpeechConfig::new(1.0, 0.5, 0.5, 0.5, voxloop_core::BackgroundNoise::Quiet),
            limits: voxloop_core::CallLimits {
                max_call_duration_sec: 600,
                silence_detection_ms: 5000,
                voicemail_detection: false,
                voicemail_action: voxloop_core::VoicemailAction::HangUp,
                voicemail_message: None,
            },
            start_behavior: voxloop_core::StartBehavior::WaitForHuman,
            knowledge_base: vec![],
        });
        assert!(s.directory.agents.contains_key("a1"));
    }
}
