use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::config::VaultConfig;

const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const VAULT_SCOPE: &str = "https://vault.azure.net/.default";
const VAULT_RESOURCE: &str = "https://vault.azure.net";
const MANAGED_IDENTITY_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const KEY_VAULT_API_VERSION: &str = "7.4";

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Failed to fetch vault access token: {0}")]
    Token(String),

    #[error("Secret '{0}' not found in vault")]
    NotFound(String),

    #[error("Vault request failed: {0}")]
    Request(String),

    #[error("Failed to parse vault response: {0}")]
    Parse(String),
}

/// Read access to a managed secret store
#[async_trait]
pub trait SecretVault: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<String, VaultError>;
}

enum Credential {
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    /// Token from the host's managed identity endpoint
    ManagedIdentity,
}

struct TokenCache {
    access_token: String,
    expires_in: Duration,
    fetched_at: Instant,
}

#[derive(Debug, Deserialize)]
struct SecretBundle {
    value: String,
}

/// Azure Key Vault client using the REST API
pub struct KeyVaultClient {
    vault_url: String,
    credential: Credential,
    client: reqwest::Client,
    cache: RwLock<Option<TokenCache>>,
    /// Refresh token this many seconds before expiration
    refresh_margin: Duration,
}

impl KeyVaultClient {
    pub fn new(config: &VaultConfig) -> Self {
        let credential = match config.client_credentials() {
            Some((tenant_id, client_id, client_secret)) => Credential::ClientSecret {
                tenant_id: tenant_id.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            },
            None => Credential::ManagedIdentity,
        };

        Self {
            vault_url: config.vault_url(),
            credential,
            client: reqwest::Client::new(),
            cache: RwLock::new(None),
            refresh_margin: Duration::from_secs(60),
        }
    }

    /// Get a valid access token, fetching a new one if necessary
    async fn access_token(&self) -> Result<String, VaultError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.fetched_at.elapsed() + self.refresh_margin < cached.expires_in {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let body = self.fetch_token().await?;
        let access_token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| VaultError::Token("response has no access_token".to_string()))?
            .to_string();
        let expires_in = Duration::from_secs(expires_in_secs(&body));

        tracing::debug!(
            "Fetched vault access token, expires in {} seconds",
            expires_in.as_secs()
        );

        let mut cache = self.cache.write().await;
        *cache = Some(TokenCache {
            access_token: access_token.clone(),
            expires_in,
            fetched_at: Instant::now(),
        });

        Ok(access_token)
    }

    async fn fetch_token(&self) -> Result<Value, VaultError> {
        let request = match &self.credential {
            Credential::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => self
                .client
                .post(format!("{}/{}/oauth2/v2.0/token", AUTHORITY_HOST, tenant_id))
                .form(&[
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("scope", VAULT_SCOPE),
                ]),
            Credential::ManagedIdentity => self
                .client
                .get(MANAGED_IDENTITY_ENDPOINT)
                .header("Metadata", "true")
                .query(&[("api-version", "2018-02-01"), ("resource", VAULT_RESOURCE)]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| VaultError::Token(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::Token(format!("HTTP {} - {}", status, body)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| VaultError::Parse(e.to_string()))
    }
}

/// `expires_in` is a number from the token endpoint but a string from the managed identity endpoint
fn expires_in_secs(body: &Value) -> u64 {
    match body.get("expires_in") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

#[async_trait]
impl SecretVault for KeyVaultClient {
    async fn get_secret(&self, name: &str) -> Result<String, VaultError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/secrets/{}?api-version={}",
            self.vault_url,
            urlencoding::encode(name),
            KEY_VAULT_API_VERSION
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| VaultError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(VaultError::NotFound(name.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::Request(format!("HTTP {} - {}", status, body)));
        }

        let bundle: SecretBundle = response
            .json()
            .await
            .map_err(|e| VaultError::Parse(e.to_string()))?;

        Ok(bundle.value)
    }
}
