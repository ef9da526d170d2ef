//! `ProviderConfig`: per-user carrier credentials, at rest encrypted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    HostedCarrier,
    TokenExchange,
    Generic,
}

/// Credential values are stored as `CredentialVault`-encrypted `hex(iv):hex(ct)`
/// strings keyed by field name (e.g. `"accountId"`, `"authToken"`). The
/// kind-specific shape is interpreted by the provider crate, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub credentials: BTreeMap<String, String>,
    pub custom_script: Option<String>,
}
