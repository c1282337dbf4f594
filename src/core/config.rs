use std::env;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Critical secret '{0}' missing in production")]
    MissingSecret(&'static str),
}

/// Deployment environment the process runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "staging" => Environment::Staging,
            "test" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub vault: VaultConfig,
    pub secrets: SecretsConfig,
    pub storage: StorageConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub debug: bool,
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Requests per client per minute, 0 disables limiting
    pub rate_limit_per_minute: u32,
}

/// Pool tuning shared by the operational and analytics pools.
/// Connection URLs live in [`SecretsConfig`] because they may come from the vault.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Managed secret vault location and credentials
#[derive(Clone)]
pub struct VaultConfig {
    pub name: String,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Settings that may be supplied by the environment or fetched from the vault
#[derive(Clone, Default)]
pub struct SecretsConfig {
    pub database_url_ops: Option<String>,
    pub database_url_analytics: Option<String>,
    pub blob_storage_connection_string: Option<String>,
    pub secret_key: Option<String>,
    pub service_bus_connection_string: Option<String>,
    pub speech_service_key: Option<String>,
    pub azure_ml_endpoint: Option<String>,
    pub azure_ml_api_key: Option<String>,
}

/// A setting that can be filled from the vault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSetting {
    DatabaseUrlOps,
    DatabaseUrlAnalytics,
    BlobStorageConnectionString,
    SecretKey,
    ServiceBusConnectionString,
    SpeechServiceKey,
    AzureMlEndpoint,
    AzureMlApiKey,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub container_name: String,
}

/// Token settings of the auth layer in front of this service.
/// Read for the startup log only; tokens are not verified here.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub algorithm: String,
    pub access_token_expire_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(
    vars: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match vars(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Self::from_vars(&read_env)
    }

    /// Build configuration from any key lookup (environment in production, a map in tests)
    pub fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig::from_vars(vars)?,
            database: DatabaseConfig::from_vars(vars)?,
            vault: VaultConfig::from_vars(vars)?,
            secrets: SecretsConfig::from_vars(vars),
            storage: StorageConfig::from_vars(vars),
            security: SecurityConfig::from_vars(vars)?,
            swagger: SwaggerConfig::from_vars(vars),
        })
    }
}

impl AppConfig {
    const DEFAULT_ALLOWED_ORIGINS: &'static str =
        "http://localhost:3000,http://localhost:8080,capacitor://localhost";
    const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

    pub fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = vars("ENVIRONMENT")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);

        let debug = vars("DEBUG")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let host = vars("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(vars, "PORT", 8000u16)?;

        let cors_allowed_origins = vars("ALLOWED_ORIGINS")
            .unwrap_or_else(|| Self::DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let rate_limit_per_minute = parse_or(
            vars,
            "RATE_LIMIT_PER_MINUTE",
            Self::DEFAULT_RATE_LIMIT_PER_MINUTE,
        )?;

        Ok(Self {
            environment,
            debug,
            host,
            port,
            cors_allowed_origins,
            rate_limit_per_minute,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            max_connections: parse_or(vars, "DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_or(vars, "DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_or(
                vars,
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_or(
                vars,
                "DB_IDLE_TIMEOUT_SECS",
                Self::DEFAULT_IDLE_TIMEOUT_SECS,
            )?,
            max_lifetime_secs: parse_or(
                vars,
                "DB_MAX_LIFETIME_SECS",
                Self::DEFAULT_MAX_LIFETIME_SECS,
            )?,
        })
    }
}

impl VaultConfig {
    pub fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let name = vars("AZURE_KEY_VAULT_NAME").ok_or(ConfigError::Missing("AZURE_KEY_VAULT_NAME"))?;

        Ok(Self {
            name,
            tenant_id: vars("AZURE_TENANT_ID"),
            client_id: vars("AZURE_CLIENT_ID"),
            client_secret: vars("AZURE_CLIENT_SECRET"),
        })
    }

    pub fn vault_url(&self) -> String {
        format!("https://{}.vault.azure.net", self.name)
    }

    /// Client-secret credentials, only when all three parts are present
    pub fn client_credentials(&self) -> Option<(&str, &str, &str)> {
        match (&self.tenant_id, &self.client_id, &self.client_secret) {
            (Some(tenant), Some(client), Some(secret)) => Some((tenant, client, secret)),
            _ => None,
        }
    }
}

impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig")
            .field("name", &self.name)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

impl SecretSetting {
    pub const ALL: [SecretSetting; 8] = [
        SecretSetting::DatabaseUrlOps,
        SecretSetting::DatabaseUrlAnalytics,
        SecretSetting::BlobStorageConnectionString,
        SecretSetting::SecretKey,
        SecretSetting::ServiceBusConnectionString,
        SecretSetting::SpeechServiceKey,
        SecretSetting::AzureMlEndpoint,
        SecretSetting::AzureMlApiKey,
    ];

    /// Environment variable that supplies this setting directly
    pub fn env_key(&self) -> &'static str {
        match self {
            SecretSetting::DatabaseUrlOps => "DATABASE_URL_OPS",
            SecretSetting::DatabaseUrlAnalytics => "DATABASE_URL_ANALYTICS",
            SecretSetting::BlobStorageConnectionString => "BLOB_STORAGE_CONNECTION_STRING",
            SecretSetting::SecretKey => "SECRET_KEY",
            SecretSetting::ServiceBusConnectionString => "SERVICE_BUS_CONNECTION_STRING",
            SecretSetting::SpeechServiceKey => "SPEECH_SERVICE_KEY",
            SecretSetting::AzureMlEndpoint => "AZURE_ML_ENDPOINT",
            SecretSetting::AzureMlApiKey => "AZURE_ML_API_KEY",
        }
    }
}

impl SecretsConfig {
    pub fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Self {
        let mut secrets = Self::default();
        for setting in SecretSetting::ALL {
            *secrets.slot_mut(setting) = vars(setting.env_key());
        }
        secrets
    }

    pub fn get(&self, setting: SecretSetting) -> Option<&str> {
        match setting {
            SecretSetting::DatabaseUrlOps => self.database_url_ops.as_deref(),
            SecretSetting::DatabaseUrlAnalytics => self.database_url_analytics.as_deref(),
            SecretSetting::BlobStorageConnectionString => {
                self.blob_storage_connection_string.as_deref()
            }
            SecretSetting::SecretKey => self.secret_key.as_deref(),
            SecretSetting::ServiceBusConnectionString => {
                self.service_bus_connection_string.as_deref()
            }
            SecretSetting::SpeechServiceKey => self.speech_service_key.as_deref(),
            SecretSetting::AzureMlEndpoint => self.azure_ml_endpoint.as_deref(),
            SecretSetting::AzureMlApiKey => self.azure_ml_api_key.as_deref(),
        }
    }

    pub fn slot_mut(&mut self, setting: SecretSetting) -> &mut Option<String> {
        match setting {
            SecretSetting::DatabaseUrlOps => &mut self.database_url_ops,
            SecretSetting::DatabaseUrlAnalytics => &mut self.database_url_analytics,
            SecretSetting::BlobStorageConnectionString => &mut self.blob_storage_connection_string,
            SecretSetting::SecretKey => &mut self.secret_key,
            SecretSetting::ServiceBusConnectionString => &mut self.service_bus_connection_string,
            SecretSetting::SpeechServiceKey => &mut self.speech_service_key,
            SecretSetting::AzureMlEndpoint => &mut self.azure_ml_endpoint,
            SecretSetting::AzureMlApiKey => &mut self.azure_ml_api_key,
        }
    }
}

// Never print secret values, only whether they are present
impl fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SecretsConfig");
        for setting in SecretSetting::ALL {
            let state = if self.get(setting).is_some() {
                "set"
            } else {
                "unset"
            };
            s.field(setting.env_key(), &state);
        }
        s.finish()
    }
}

impl StorageConfig {
    pub fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            container_name: vars("BLOB_CONTAINER_NAME")
                .unwrap_or_else(|| "report-attachments".to_string()),
        }
    }
}

impl SecurityConfig {
    pub fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            algorithm: vars("JWT_ALGORITHM").unwrap_or_else(|| "HS256".to_string()),
            access_token_expire_minutes: parse_or(vars, "ACCESS_TOKEN_EXPIRE_MINUTES", 30u32)?,
        })
    }
}

impl SwaggerConfig {
    pub fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            username: vars("SWAGGER_USERNAME"),
            password: vars("SWAGGER_PASSWORD"),
            title: vars("SWAGGER_TITLE").unwrap_or_else(|| "Civic Report API".to_string()),
            version: vars("SWAGGER_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            description: vars("SWAGGER_DESCRIPTION")
                .unwrap_or_else(|| "Citizen incident reporting API".to_string()),
        }
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}
