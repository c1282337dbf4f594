//! Fills settings that the environment left unset from the secret vault.

use crate::core::config::{ConfigError, Environment, SecretSetting, SecretsConfig};
use crate::modules::vault::SecretVault;

/// Vault secret name -> setting it populates
pub const SECRET_MAPPINGS: [(&str, SecretSetting); 8] = [
    ("SqlOpsConnectionString", SecretSetting::DatabaseUrlOps),
    ("SqlAnalyticsConnectionString", SecretSetting::DatabaseUrlAnalytics),
    ("BlobStorageConnectionString", SecretSetting::BlobStorageConnectionString),
    ("JwtSecretKey", SecretSetting::SecretKey),
    ("ServiceBusConnectionString", SecretSetting::ServiceBusConnectionString),
    ("SpeechServiceKey", SecretSetting::SpeechServiceKey),
    ("AzureMlEndpoint", SecretSetting::AzureMlEndpoint),
    ("AzureMlApiKey", SecretSetting::AzureMlApiKey),
];

/// Query the vault for every mapped setting that is still unset.
///
/// Values supplied by the environment are never overwritten. In production a
/// secret that cannot be loaded is fatal; elsewhere it is logged and left unset.
pub async fn load_missing_secrets(
    secrets: &mut SecretsConfig,
    vault: &dyn SecretVault,
    environment: Environment,
) -> Result<(), ConfigError> {
    for (vault_name, setting) in SECRET_MAPPINGS {
        if secrets.get(setting).is_some() {
            continue;
        }

        match vault.get_secret(vault_name).await {
            Ok(value) => {
                *secrets.slot_mut(setting) = Some(value);
                tracing::info!("Loaded secret: {}", vault_name);
            }
            Err(e) => {
                tracing::error!("Failed to load secret '{}': {}", vault_name, e);
                if environment.is_production() {
                    return Err(ConfigError::MissingSecret(vault_name));
                }
                tracing::warn!(
                    "Continuing without {} in {} environment",
                    setting.env_key(),
                    environment
                );
            }
        }
    }

    Ok(())
}
