use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_ssm::Client as SsmClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const ENV_PREFIX: &str = "FOODLOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Parameter not found: {name}")]
    ParameterNotFound { name: String },

    #[error("AWS SDK error: {source}")]
    AwsSdk {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub observability: ObservabilityConfig,
    /// Present only for the DynamoDB backend
    pub aws: Option<AwsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: u64,
}

/// Where food data lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    DynamoDb,
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::DynamoDb => write!(f, "dynamodb"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_users_table")]
    pub users_table_name: String,
    #[serde(default = "default_foods_table")]
    pub foods_table_name: String,
    #[serde(default = "default_foods_eaten_table")]
    pub foods_eaten_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub storage_backend: StorageBackend,
    /// SSM path holding table name overrides, e.g. `/foodlog/prod`
    #[serde(default)]
    pub parameter_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub dynamodb_client: DynamoDbClient,
    pub parameter_store: Arc<ParameterStoreConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

/// SSM Parameter Store reader with a per-parameter TTL cache
pub struct ParameterStoreConfig {
    ssm_client: SsmClient,
    cache: Arc<RwLock<HashMap<String, (String, Instant)>>>,
    cache_ttl: Duration,
}

impl fmt::Debug for ParameterStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterStoreConfig")
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_size", &"<runtime>")
            .finish()
    }
}

impl Config {
    pub async fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let server = ServerConfig::from_env()?;
        let mut database = DatabaseConfig::from_env()?;
        let observability = ObservabilityConfig::from_env()?;

        let aws = match database.storage_backend {
            StorageBackend::Memory => None,
            StorageBackend::DynamoDb => {
                let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                    .region(aws_config::Region::new(database.region.clone()))
                    .load()
                    .await;

                let parameter_store = Arc::new(ParameterStoreConfig::new(
                    SsmClient::new(&sdk_config),
                    Duration::from_secs(5 * 60),
                ));

                if let Some(prefix) = database.parameter_prefix.clone() {
                    database
                        .apply_parameter_overrides(&parameter_store, &prefix)
                        .await;
                }

                Some(AwsConfig {
                    region: database.region.clone(),
                    dynamodb_client: DynamoDbClient::new(&sdk_config),
                    parameter_store,
                })
            }
        };

        let config = Config {
            server,
            database,
            observability,
            aws,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }

        self.database.validate()
    }
}

/// Deserialize one section from the `FOODLOG_*` environment
fn load_section<T: DeserializeOwned>(section: &str) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section("server")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section("database")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, name) in [
            ("Users", &self.users_table_name),
            ("Foods", &self.foods_table_name),
            ("Foods eaten", &self.foods_eaten_table_name),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: format!("{} table name cannot be empty", label),
                });
            }
        }
        Ok(())
    }

    /// Replace table names with `{prefix}/users-table`, `{prefix}/foods-table`
    /// and `{prefix}/foods-eaten-table` where those parameters exist
    pub async fn apply_parameter_overrides(
        &mut self,
        parameter_store: &ParameterStoreConfig,
        prefix: &str,
    ) {
        let prefix = prefix.trim_end_matches('/');
        info!("Reading table names from Parameter Store under {}", prefix);

        self.users_table_name = parameter_store
            .get_parameter_with_default(&format!("{}/users-table", prefix), &self.users_table_name)
            .await;
        self.foods_table_name = parameter_store
            .get_parameter_with_default(&format!("{}/foods-table", prefix), &self.foods_table_name)
            .await;
        self.foods_eaten_table_name = parameter_store
            .get_parameter_with_default(
                &format!("{}/foods-eaten-table", prefix),
                &self.foods_eaten_table_name,
            )
            .await;
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section("observability")
    }
}

impl ParameterStoreConfig {
    pub fn new(ssm_client: SsmClient, cache_ttl: Duration) -> Self {
        Self {
            ssm_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl,
        }
    }

    pub async fn get_parameter(&self, name: &str) -> Result<String, ConfigError> {
        {
            let cache = self.cache.read().await;
            if let Some((value, fetched_at)) = cache.get(name) {
                if fetched_at.elapsed() < self.cache_ttl {
                    debug!("Parameter found in cache: {}", name);
                    return Ok(value.clone());
                }
                debug!("Parameter cache expired: {}", name);
            }
        }

        debug!("Fetching parameter from AWS SSM: {}", name);
        let result = self
            .ssm_client
            .get_parameter()
            .name(name)
            .with_decryption(false)
            .send()
            .await
            .map_err(|e| ConfigError::AwsSdk {
                source: Box::new(e),
            })?;

        let value = result
            .parameter()
            .and_then(|p| p.value())
            .ok_or_else(|| ConfigError::ParameterNotFound {
                name: name.to_string(),
            })?
            .to_string();

        self.cache
            .write()
            .await
            .insert(name.to_string(), (value.clone(), Instant::now()));

        Ok(value)
    }

    pub async fn get_parameter_with_default(&self, name: &str, default: &str) -> String {
        match self.get_parameter(name).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to get parameter {}, using default: {}", name, e);
                default.to_string()
            }
        }
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
        info!("Parameter store cache cleared");
    }

    pub async fn cache_size(&self) -> usize {
        self.cache.read().await.len()
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> u64 {
    1024 * 1024
}

pub(crate) fn default_users_table() -> String {
    "FoodlogUsers".to_string()
}

pub(crate) fn default_foods_table() -> String {
    "FoodlogFoods".to_string()
}

pub(crate) fn default_foods_eaten_table() -> String {
    "FoodlogFoodsEaten".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_service_name() -> String {
    "foodlog-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_metrics_port() -> u16 {
    9090
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
