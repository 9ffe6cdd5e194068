//! Configuration management for the loan fund server
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::loan_fund::TopUpPolicy;

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }
}

impl Environment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Which route groups demand a bearer token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteAuth {
    pub loan_funds: bool,
    pub loans: bool,
    pub users: bool,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Postgres URL; the in-memory store is used when absent
    pub database_url: Option<String>,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,

    /// CORS allowed origins, comma separated
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// JWT secret for token signing
    pub jwt_secret: String,

    /// Access token TTL in seconds (default: 3600)
    pub jwt_ttl_seconds: i64,

    /// bcrypt work factor
    pub bcrypt_cost: u32,

    /// Balances a fund top-up may produce
    pub top_up_policy: TopUpPolicy,

    pub route_auth: RouteAuth,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "127.0.0.1".to_string(),
            port: 8000,
            database_url: None,
            db_max_connections: 5,
            run_migrations: true,
            cors_allowed_origins: None,
            log_level: "info".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl_seconds: 3600,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            top_up_policy: TopUpPolicy::default(),
            route_auth: RouteAuth::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let environment = lookup("ENVIRONMENT")
            .map(|s| s.parse::<Environment>())
            .transpose()?
            .unwrap_or_default();

        let host = lookup("HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?,
            None => defaults.port,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if database_url.is_none() && environment.is_production() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }

        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.db_max_connections);

        let run_migrations = flag(&lookup, "RUN_MIGRATIONS", defaults.run_migrations)?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").filter(|s| !s.is_empty());

        let log_level = lookup("RUST_LOG").unwrap_or(defaults.log_level);

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()))
            }
            None => defaults.jwt_secret,
        };

        let jwt_ttl_seconds = lookup("JWT_TTL_SECONDS")
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|ttl| *ttl > 0)
            .unwrap_or(defaults.jwt_ttl_seconds);

        let bcrypt_cost = match lookup("BCRYPT_COST") {
            Some(cost) => cost
                .parse::<u32>()
                .ok()
                .filter(|c| (4..=31).contains(c))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(format!(
                        "Invalid BCRYPT_COST: '{}'. Expected 4 to 31",
                        cost
                    ))
                })?,
            None => defaults.bcrypt_cost,
        };

        let top_up_policy = lookup("TOP_UP_POLICY")
            .map(|s| s.parse::<TopUpPolicy>())
            .transpose()
            .map_err(ConfigError::InvalidValue)?
            .unwrap_or_default();

        let route_auth = RouteAuth {
            loan_funds: flag(&lookup, "REQUIRE_AUTH_LOAN_FUNDS", false)?,
            loans: flag(&lookup, "REQUIRE_AUTH_LOANS", false)?,
            users: flag(&lookup, "REQUIRE_AUTH_USERS", false)?,
        };

        Ok(Config {
            environment,
            host,
            port,
            database_url,
            db_max_connections,
            run_migrations,
            cors_allowed_origins,
            log_level,
            jwt_secret,
            jwt_ttl_seconds,
            bcrypt_cost,
            top_up_policy,
            route_auth,
        })
    }

    /// Get database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> String {
        let Some(url) = &self.database_url else {
            return "<memory>".to_string();
        };
        if let Some(at_pos) = url.find('@') {
            if let Some(colon_pos) = url[..at_pos].rfind(':') {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        url.clone()
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "Invalid {}: '{}'. Expected true or false",
            key, value
        ))),
    }
}
