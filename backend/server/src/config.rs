use std::{env, fmt::Display, fs::read_to_string, path::Path, str::FromStr, time::Duration};

use catalog::normalize::parse_bool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::ServiceAccount;

const SECRETS_DIR: &str = "/run/secrets";
const SERVICE_ACCOUNT_SECRET: &str = "FIREBASE_SERVICE_ACCOUNT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unreadable service account {path}: {reason}")]
    ServiceAccount { path: String, reason: String },
}

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub feed_base_url: String,
    pub feed_timeout: Duration,
    pub firebase_project_id: String,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub public_reads: bool,
    pub service_account: Option<ServiceAccount>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_database: "jewel".to_string(),
            feed_base_url: "http://localhost:8080/data".to_string(),
            feed_timeout: Duration::from_secs(15),
            firebase_project_id: String::new(),
            cors_origins: Vec::new(),
            public_reads: false,
            service_account: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| var(key).ok())?;
        config.service_account = load_service_account()?;

        if config.service_account.is_none() {
            warn!("No Firebase service account found, /admin/set-claim is disabled");
        }

        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let firebase_project_id = lookup("FIREBASE_PROJECT_ID")
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::Missing("FIREBASE_PROJECT_ID"))?;

        let public_reads: String = try_load(&lookup, "PUBLIC_READS", "false")?;
        let public_reads = parse_bool(&public_reads).ok_or_else(|| ConfigError::Invalid {
            key: "PUBLIC_READS",
            value: public_reads.clone(),
            reason: "expected true or false".to_string(),
        })?;

        let cors_origins: String = try_load(&lookup, "CORS_ORIGINS", "*")?;

        Ok(Self {
            port: try_load(&lookup, "RUST_PORT", "5000")?,
            mongodb_uri: try_load(&lookup, "MONGODB_URI", "mongodb://localhost:27017")?,
            mongodb_database: try_load(&lookup, "MONGODB_DATABASE", "jewel")?,
            feed_base_url: try_load(&lookup, "FEED_BASE_URL", "http://localhost:8080/data")?,
            feed_timeout: Duration::from_secs(try_load(&lookup, "FEED_TIMEOUT_SECS", "15")?),
            firebase_project_id,
            cors_origins: parse_origins(&cors_origins),
            public_reads,
            service_account: None,
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        debug!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            value: value.clone(),
            reason: e.to_string(),
        }
    })
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .map(str::to_string)
        .collect()
}

fn load_service_account() -> Result<Option<ServiceAccount>, ConfigError> {
    service_account_at(var("GOOGLE_APPLICATION_CREDENTIALS").ok())
}

/// An explicit credentials path must exist; the mounted secret is optional.
fn service_account_at(credentials: Option<String>) -> Result<Option<ServiceAccount>, ConfigError> {
    match credentials {
        Some(path) => read_secret(&path).map(Some),
        None => {
            let path = format!("{SECRETS_DIR}/{SERVICE_ACCOUNT_SECRET}");
            if !Path::new(&path).exists() {
                return Ok(None);
            }

            read_secret(&path).map(Some)
        }
    }
}

fn read_secret(path: &str) -> Result<ServiceAccount, ConfigError> {
    let invalid = |reason: String| {
        warn!("Failed to read service account from {path}: {reason}");
        ConfigError::ServiceAccount {
            path: path.to_string(),
            reason,
        }
    };

    let json = read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    ServiceAccount::from_json(json.trim()).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("FIREBASE_PROJECT_ID", "jewel-prod")])).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.mongodb_database, "jewel");
        assert_eq!(config.feed_timeout, Duration::from_secs(15));
        assert!(config.cors_origins.is_empty());
        assert!(!config.public_reads);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("FIREBASE_PROJECT_ID", "jewel-prod"),
            ("RUST_PORT", "8081"),
            ("PUBLIC_READS", "yes"),
            ("CORS_ORIGINS", "https://shop.example, https://admin.example"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8081);
        assert!(config.public_reads);
        assert_eq!(
            config.cors_origins,
            vec!["https://shop.example", "https://admin.example"]
        );
    }

    #[test]
    fn test_missing_project_id() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("FIREBASE_PROJECT_ID"))
        ));
    }

    #[test]
    fn test_invalid_port() {
        let result = Config::from_lookup(lookup(&[
            ("FIREBASE_PROJECT_ID", "p"),
            ("RUST_PORT", "eighty"),
        ]));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "RUST_PORT", .. })
        ));
    }

    #[test]
    fn test_read_service_account_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sa.json");
        std::fs::write(
            &path,
            r#"{ "client_email": "svc@p.iam.gserviceaccount.com", "private_key": "pem" }"#,
        )
        .unwrap();

        let account = read_secret(path.to_str().unwrap()).unwrap();
        assert_eq!(account.client_email, "svc@p.iam.gserviceaccount.com");

        let missing = dir.path().join("missing.json");
        assert!(read_secret(missing.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_explicit_credentials_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");

        let result = service_account_at(Some(missing.to_string_lossy().into_owned()));
        match result {
            Err(ConfigError::ServiceAccount { path, .. }) => assert!(path.ends_with("missing.json")),
            other => panic!("expected service account error, got {other:?}"),
        }

        let path = dir.path().join("sa.json");
        std::fs::write(
            &path,
            r#"{ "client_email": "svc@p.iam.gserviceaccount.com", "private_key": "pem" }"#,
        )
        .unwrap();
        let account = service_account_at(Some(path.to_string_lossy().into_owned())).unwrap();
        assert!(account.is_some());
    }
}
