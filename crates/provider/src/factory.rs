//! Builds a validated `Arc<dyn ProviderDriver>` from a `ProviderConfig` and
//! the vault that decrypts its credentials. Credential shape is decided once
//! here, at construction time, matching `kind` to its field set — callers
//! downstream only ever see the trait object, never the kind-specific
//! credential struct.

use crate::driver::ProviderDriver;
use crate::error::{ProviderError, Result};
use crate::generic::{GenericCredentials, GenericDriver};
use crate::hosted::{HostedCredentials, HostedDriver};
use crate::token_exchange::{TokenExchangeCredentials, TokenExchangeDriver};
use std::collections::BTreeMap;
use std::sync::Arc;
use voxloop_core::{ProviderConfig, ProviderKind};
use voxloop_vault::CredentialVault;

/// Base URL for the Hosted variant's REST API. Not part of `ProviderConfig`
/// since it is an operator-level deployment constant, not a per-user
/// credential.
pub struct FactoryConfig {
    pub hosted_base_url: String,
}

fn decrypt_field(
    vault: &CredentialVault,
    credentials: &BTreeMap<String, String>,
    field: &str,
) -> Result<String> {
    let encrypted = credentials
        .get(field)
        .ok_or_else(|| ProviderError::UnknownProviderError(format!("missing credential field `{field}`")))?;
    vault
        .decrypt_str(encrypted)
        .map_err(|e| ProviderError::UnknownProviderError(format!("failed to decrypt `{field}`: {e}")))
}

fn decrypt_field_opt(
    vault: &CredentialVault,
    credentials: &BTreeMap<String, String>,
    field: &str,
) -> Result<Option<String>> {
    match credentials.get(field) {
        Some(encrypted) => vault
            .decrypt_str(encrypted)
            .map(Some)
            .map_err(|e| ProviderError::UnknownProviderError(format!("failed to decrypt `{field}`: {e}"))),
        None => Ok(None),
    }
}

pub fn build_driver(
    config: &ProviderConfig,
    vault: &CredentialVault,
    factory_config: &FactoryConfig,
) -> Result<Arc<dyn ProviderDriver>> {
    match config.kind {
        ProviderKind::HostedCarrier => {
            let credentials = HostedCredentials {
                account_id: decrypt_field(vault, &config.credentials, "accountId")?,
                auth_token: decrypt_field(vault, &config.credentials, "authToken")?,
            };
            Ok(Arc::new(HostedDriver::new(credentials, factory_config.hosted_base_url.clone())))
        }
        ProviderKind::TokenExchange => {
            let credentials = TokenExchangeCredentials {
                token_endpoint: decrypt_field(vault, &config.credentials, "tokenEndpoint")?,
                dial_endpoint: decrypt_field(vault, &config.credentials, "dialEndpoint")?,
                access_token: decrypt_field(vault, &config.credentials, "accessToken")?,
                access_key: decrypt_field(vault, &config.credentials, "accessKey")?,
                app_id: decrypt_field(vault, &config.credentials, "appId")?
                    .parse()
                    .map_err(|_| ProviderError::UnknownProviderError("appId is not a number".into()))?,
                username: decrypt_field(vault, &config.credentials, "username")?,
                password: decrypt_field(vault, &config.credentials, "password")?,
            };
            Ok(Arc::new(TokenExchangeDriver::new(credentials)))
        }
        ProviderKind::Generic => {
            let headers = decrypt_field_opt(vault, &config.credentials, "headers")?
                .map(|raw| serde_json::from_str::<BTreeMap<String, String>>(&raw))
                .transpose()
                .map_err(|e| ProviderError::UnknownProviderError(format!("malformed headers: {e}")))?
                .unwrap_or_default();

            let credentials = GenericCredentials {
                endpoint_url: decrypt_field(vault, &config.credentials, "endpointUrl")?,
                http_method: decrypt_field_opt(vault, &config.credentials, "httpMethod")?
                    .unwrap_or_else(|| "POST".to_string()),
                api_key: decrypt_field(vault, &config.credentials, "apiKey")?,
                secret_key: decrypt_field(vault, &config.credentials, "secretKey")?,
                headers,
            };
            Ok(Arc::new(GenericDriver::new(credentials)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CredentialVault {
        CredentialVault::new(&[9u8; 32]).unwrap()
    }

    fn config_with(kind: ProviderKind, vault: &CredentialVault, fields: &[(&str, &str)]) -> ProviderConfig {
        let mut credentials = BTreeMap::new();
        for (key, value) in fields {
            credentials.insert(key.to_string(), vault.encrypt_str(value));
        }
        ProviderConfig { id: "p1".into(), kind, credentials, custom_script: None }
    }

    #[test]
    fn builds_hosted_driver_from_decrypted_fields() {
        let vault = vault();
        let config = config_with(
            ProviderKind::HostedCarrier,
            &vault,
            &[("accountId", "AC1"), ("authToken", "secret")],
        );
        let factory_config = FactoryConfig { hosted_base_url: "https://api.example.com".into() };
        assert!(build_driver(&config, &vault, &factory_config).is_ok());
    }

    #[test]
    fn builds_generic_driver_with_default_http_method() {
        let vault = vault();
        let config = config_with(
            ProviderKind::Generic,
            &vault,
            &[
                ("endpointUrl", "https://dialer.example.com/dial"),
                ("apiKey", "key"),
                ("secretKey", "secret"),
            ],
        );
        let factory_config = FactoryConfig { hosted_base_url: String::new() };
        assert!(build_driver(&config, &vault, &factory_config).is_ok());
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let vault = vault();
        let config = config_with(ProviderKind::HostedCarrier, &vault, &[("accountId", "AC1")]);
        let factory_config = FactoryConfig { hosted_base_url: "https://api.example.com".into() };
        assert!(build_driver(&config, &vault, &factory_config).is_err());
    }

    #[test]
    fn wrong_vault_key_fails_to_decrypt() {
        let vault_a = vault();
        let vault_b = CredentialVault::new(&[1u8; 32]).unwrap();
        let config = config_with(
            ProviderKind::HostedCarrier,
            &vault_a,
            &[("accountId", "AC1"), ("authToken", "secret")],
        );
        let factory_config = FactoryConfig { hosted_base_url: "https://api.example.com".into() };
        assert!(build_driver(&config, &vault_b, &factory_config).is_err());
    }
}
