// Configuration management

use crate::core::errors::GatewayError;
use crate::core::models::AuthMode;
use crate::loader::resolve_rbac_acl;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

const PORT_VAR: &str = "HAWTIO_ONLINE_GATEWAY_APP_PORT";

/// Application configuration loaded from environment variables
///
/// All configuration is validated on load with clear error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Cluster API base address
    pub cluster_address: String,

    // RBAC: ACL file to enforce, `None` when RBAC is disabled
    pub rbac_acl_path: Option<PathBuf>,
    pub auth_mode: AuthMode,
    pub mask_ip_addresses: bool,

    // TLS material for outbound calls
    pub ssl_certificate_ca: Option<PathBuf>,
    pub ssl_proxy_key: Option<PathBuf>,
    pub ssl_proxy_certificate: Option<PathBuf>,

    // Middleware configuration
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, GatewayError> {
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok();
        }

        let default_acl = PathBuf::from(Self::get_env_or_default("HAWTIO_ONLINE_RBAC_ACL_DEFAULT", "ACL.yaml"));
        let rbac_value = env::var("HAWTIO_ONLINE_RBAC_ACL").ok();

        let config = Self {
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0"),
            port: Self::parse_port()?,
            cluster_address: Self::get_env_or_default("CLUSTER_ADDRESS", "https://kubernetes.default"),
            rbac_acl_path: resolve_rbac_acl(&default_acl, rbac_value.as_deref()),
            auth_mode: AuthMode::from_env_value(Self::get_optional_env("HAWTIO_ONLINE_AUTH").as_deref()),
            mask_ip_addresses: Self::parse_flag("HAWTIO_ONLINE_MASK_IP_ADDRESSES"),
            ssl_certificate_ca: Self::get_optional_path("HAWTIO_ONLINE_GATEWAY_SSL_CERTIFICATE_CA"),
            ssl_proxy_key: Self::get_optional_path("HAWTIO_ONLINE_GATEWAY_SSL_PROXY_KEY"),
            ssl_proxy_certificate: Self::get_optional_path("HAWTIO_ONLINE_GATEWAY_SSL_PROXY_CERTIFICATE"),
            body_size_limit_bytes: Self::parse_usize_or_default("BODY_SIZE_LIMIT_BYTES", 50 * 1024 * 1024)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "json"),
        };

        config.validate()?;

        Ok(config)
    }

    fn get_env_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    fn get_optional_env(key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn get_optional_path(key: &str) -> Option<PathBuf> {
        Self::get_optional_env(key).map(PathBuf::from)
    }

    /// Only a case-insensitive `true` switches a flag on
    fn parse_flag(key: &str) -> bool {
        env::var(key)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Parse port from HAWTIO_ONLINE_GATEWAY_APP_PORT environment variable
    fn parse_port() -> Result<u16, GatewayError> {
        let port_str = env::var(PORT_VAR).unwrap_or_else(|_| "3000".to_string());
        let port = port_str.parse::<u16>().map_err(|e| {
            GatewayError::Configuration(format!("Invalid {} value '{}': {}", PORT_VAR, port_str, e))
        })?;

        if port == 0 {
            return Err(GatewayError::Configuration(format!(
                "{} must be between 1 and 65535",
                PORT_VAR
            )));
        }

        Ok(port)
    }

    /// Parse usize from environment variable or return default
    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, GatewayError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<usize>().map_err(|e| {
                    GatewayError::Configuration(format!("Invalid {} value '{}': {}", key, value, e))
                })?;

                if parsed == 0 {
                    return Err(GatewayError::Configuration(format!("{} must be greater than 0", key)));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), GatewayError> {
        Self::validate_url(&self.cluster_address, "Cluster address")?;

        if let Some(ref path) = self.ssl_certificate_ca {
            Self::validate_file_path(path, "SSL certificate authority")?;
        }
        if let Some(ref path) = self.ssl_proxy_key {
            Self::validate_file_path(path, "SSL proxy certificate key")?;
        }
        if let Some(ref path) = self.ssl_proxy_certificate {
            Self::validate_file_path(path, "SSL proxy certificate")?;
        }
        if self.ssl_proxy_key.is_some() != self.ssl_proxy_certificate.is_some() {
            return Err(GatewayError::Configuration(
                "HAWTIO_ONLINE_GATEWAY_SSL_PROXY_KEY and HAWTIO_ONLINE_GATEWAY_SSL_PROXY_CERTIFICATE must be set together"
                    .to_string(),
            ));
        }

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate that a file path exists and is readable
    fn validate_file_path(path: &Path, description: &str) -> Result<(), GatewayError> {
        if !path.exists() {
            return Err(GatewayError::Configuration(format!(
                "The {} assigned at {:?} does not exist",
                description, path
            )));
        }

        if !path.is_file() {
            return Err(GatewayError::Configuration(format!(
                "The {} assigned at {:?} is not a file",
                description, path
            )));
        }

        std::fs::File::open(path).map_err(|e| {
            GatewayError::Configuration(format!("Cannot read {} at {:?}: {}", description, path, e))
        })?;

        Ok(())
    }

    fn validate_url(url: &str, description: &str) -> Result<(), GatewayError> {
        url::Url::parse(url).map_err(|e| {
            GatewayError::Configuration(format!("Invalid {} URL '{}': {}", description, url, e))
        })?;
        Ok(())
    }

    fn validate_log_level(level: &str) -> Result<(), GatewayError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(GatewayError::Configuration(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_log_format(format: &str) -> Result<(), GatewayError> {
        if format != "json" && format != "text" {
            return Err(GatewayError::Configuration(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Create a test configuration
    ///
    /// Bypasses environment variable loading and file validation.
    pub fn test_config() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            cluster_address: "https://kubernetes.default".to_string(),
            rbac_acl_path: Some(PathBuf::from("ACL.yaml")),
            auth_mode: AuthMode::Platform,
            mask_ip_addresses: false,
            ssl_certificate_ca: None,
            ssl_proxy_key: None,
            ssl_proxy_certificate: None,
            body_size_limit_bytes: 50 * 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}
