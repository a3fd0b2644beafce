//! Process configuration read from the environment.

use std::{net::IpAddr, path::PathBuf, str::FromStr, time::Duration};

use services::services::config::ServiceConfig;
use thiserror::Error;
use utils::jwt::{JwtConfig, parse_expires_in};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub app_env: String,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub password_cost: u32,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub report_output_dir: PathBuf,
    pub seed_defaults: bool,
    pub default_admin_password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset variables take their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let expires_in = var("JWT_EXPIRES_IN", "1d");
        let jwt = JwtConfig::new(
            var("JWT_SECRET", "secret"),
            parse_expires_in(&expires_in).ok_or(ConfigError::Invalid {
                name: "JWT_EXPIRES_IN",
                value: expires_in,
            })?,
        );

        let password_cost: u32 = parse("PASSWORD_HASH_COST", var("PASSWORD_HASH_COST", "10"))?;
        if !(4..=31).contains(&password_cost) {
            return Err(ConfigError::Invalid {
                name: "PASSWORD_HASH_COST",
                value: password_cost.to_string(),
            });
        }

        Ok(Self {
            host: parse("HOST", var("HOST", "0.0.0.0"))?,
            port: parse("PORT", var("PORT", "3333"))?,
            app_env: var("APP_ENV", "development"),
            database_url: var("DATABASE_URL", "sqlite://admin.db?mode=rwc"),
            jwt,
            password_cost,
            rate_limit_max: parse("RATE_LIMIT_MAX", var("RATE_LIMIT_MAX", "100"))?,
            rate_limit_window: Duration::from_secs(parse(
                "RATE_LIMIT_WINDOW",
                var("RATE_LIMIT_WINDOW", "3600"),
            )?),
            report_output_dir: PathBuf::from(var("REPORT_OUTPUT_DIR", "public/reports")),
            seed_defaults: parse_bool("SEED_DEFAULTS", var("SEED_DEFAULTS", "true"))?,
            default_admin_password: var("DEFAULT_ADMIN_PASSWORD", "1234"),
        })
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            password_cost: self.password_cost,
            jwt: self.jwt.clone(),
            report_output_dir: self.report_output_dir.clone(),
        }
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 3333);
        assert_eq!(config.host.to_string(), "0.0.0.0");
        assert_eq!(config.jwt.expires_in, Duration::from_secs(86_400));
        assert_eq!(config.password_cost, 10);
        assert_eq!(config.rate_limit_max, 100);
        assert_eq!(config.rate_limit_window, Duration::from_secs(3600));
        assert!(config.seed_defaults);
        assert_eq!(config.default_admin_password, "1234");
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "8080"),
            ("JWT_EXPIRES_IN", "2h"),
            ("SEED_DEFAULTS", "false"),
            ("PASSWORD_HASH_COST", "12"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt.expires_in, Duration::from_secs(7200));
        assert!(!config.seed_defaults);
        assert_eq!(config.password_cost, 12);
        assert_eq!(config.service_config().password_cost, 12);
    }

    #[test]
    fn test_invalid_value_names_variable() {
        let err = config(&[("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        let err = config(&[("PASSWORD_HASH_COST", "2")]).unwrap_err();
        assert!(err.to_string().contains("PASSWORD_HASH_COST"));
        let err = config(&[("PASSWORD_HASH_COST", "-1")]).unwrap_err();
        assert!(err.to_string().contains("PASSWORD_HASH_COST"));
        let err = config(&[("JWT_EXPIRES_IN", "1w")]).unwrap_err();
        assert!(err.to_string().contains("JWT_EXPIRES_IN"));
    }
}
