//! Console configuration.
//!
//! Sources are applied in order, later ones winning:
//!
//! 1. built-in defaults
//! 2. a JSON file (`--config`, or `<config_dir>/coffer/config.json` when present)
//! 3. environment variables
//! 4. command-line flags (see [`CofferCli::apply`](crate::CofferCli::apply))
//!
//! ```json
//! {
//!   "endpoint": "https://s3.us-east-1.amazonaws.com",
//!   "region": "us-east-1",
//!   "bucket": "photos",
//!   "issuer": { "type": "endpoint", "url": "https://example.com/credentials" }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use coffer_credentials::{DEFAULT_EXPIRES, TemporaryCredentials};
use coffer_session::{CachePolicy, EndpointIssuer, Identity, SessionProvider, StaticIssuer};
use coffer_storage::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_KEYS, DEFAULT_REGION, Gateway, GatewaySettings,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::Console;

/// Longest presigned URL lifetime SigV4 accepts: 7 days.
const MAX_EXPIRES: u64 = 604_800;

/// Cached endpoint credentials are refreshed this long before they expire.
const EXPIRY_SKEW_SECS: i64 = 60;

/// User id reported for configured keys without one.
const DEFAULT_USER_ID: &str = "unknown";

/// Errors loading or applying configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(
        "no credential source configured; set COFFER_CREDENTIALS_URL or AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY"
    )]
    MissingIssuer,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where temporary credentials come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IssuerConfig {
    /// Fixed keys, for local stores and development.
    Static {
        access_key_id: String,
        secret_access_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_label: Option<String>,
    },
    /// An HTTP credential endpoint.
    Endpoint {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        authorization: Option<String>,
    },
}

/// Console configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub max_keys: usize,
    pub expires: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<IssuerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            region: DEFAULT_REGION.to_string(),
            bucket: String::new(),
            max_keys: DEFAULT_MAX_KEYS,
            expires: DEFAULT_EXPIRES,
            timeout_secs: None,
            issuer: None,
        }
    }
}

impl Config {
    /// `<config_dir>/coffer/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("coffer").join("config.json"))
    }

    /// Load defaults, the config file and the process environment.
    ///
    /// An explicit `path` must exist. The default path is only read when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|path| path.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded config file");

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// `COFFER_CREDENTIALS_URL` takes precedence over `AWS_ACCESS_KEY_ID` and
    /// `AWS_SECRET_ACCESS_KEY` when both are set.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(endpoint) = lookup("COFFER_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(region) = lookup("COFFER_REGION") {
            self.region = region;
        }
        if let Some(bucket) = lookup("COFFER_BUCKET") {
            self.bucket = bucket;
        }

        if let (Some(access_key_id), Some(secret_access_key)) =
            (lookup("AWS_ACCESS_KEY_ID"), lookup("AWS_SECRET_ACCESS_KEY"))
        {
            self.issuer = Some(IssuerConfig::Static {
                access_key_id,
                secret_access_key,
                session_token: lookup("AWS_SESSION_TOKEN"),
                user_id: None,
                display_label: None,
            });
        }

        if let Some(url) = lookup("COFFER_CREDENTIALS_URL") {
            self.issuer = Some(IssuerConfig::Endpoint {
                url,
                authorization: None,
            });
        }

        if let Some(value) = lookup("COFFER_CREDENTIALS_AUTHORIZATION") {
            if let Some(IssuerConfig::Endpoint { authorization, .. }) = &mut self.issuer {
                *authorization = Some(value);
            }
        }
    }

    /// Check the values that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.endpoint)
            .map_err(|e| ConfigError::Invalid(format!("endpoint {}: {}", self.endpoint, e)))?;

        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("region is empty".into()));
        }
        if self.max_keys == 0 {
            return Err(ConfigError::Invalid("max_keys must be at least 1".into()));
        }
        if self.expires == 0 || self.expires > MAX_EXPIRES {
            return Err(ConfigError::Invalid(format!(
                "expires must be between 1 and {} seconds",
                MAX_EXPIRES
            )));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            expires: self.expires,
            timeout: self.timeout(),
        }
    }

    /// Build the session provider for the configured issuer.
    ///
    /// Endpoint credentials are cached until shortly before they expire.
    /// Static keys are handed out as-is on every call.
    pub fn session_provider(&self) -> Result<SessionProvider, ConfigError> {
        match &self.issuer {
            None => Err(ConfigError::MissingIssuer),
            Some(IssuerConfig::Static {
                access_key_id,
                secret_access_key,
                session_token,
                user_id,
                display_label,
            }) => {
                let mut credentials = TemporaryCredentials::new(access_key_id, secret_access_key);
                if let Some(token) = session_token {
                    credentials = credentials.with_session_token(token);
                }

                let mut identity =
                    Identity::new(user_id.as_deref().unwrap_or(DEFAULT_USER_ID));
                if let Some(label) = display_label {
                    identity = identity.with_display_label(label);
                }

                Ok(SessionProvider::new(StaticIssuer::new(identity, credentials)))
            }
            Some(IssuerConfig::Endpoint { url, authorization }) => {
                let mut issuer =
                    EndpointIssuer::new(url).map_err(|e| ConfigError::Invalid(e.to_string()))?;
                if let Some(authorization) = authorization {
                    issuer = issuer.with_authorization(authorization);
                }
                if let Some(timeout) = self.timeout() {
                    let client = reqwest::Client::builder()
                        .timeout(timeout)
                        .build()
                        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                    issuer = issuer.with_client(client);
                }

                Ok(SessionProvider::new(issuer).with_cache_policy(CachePolicy::UntilExpiry {
                    skew: chrono::Duration::seconds(EXPIRY_SKEW_SECS),
                }))
            }
        }
    }

    /// Build a console with the configured bucket set.
    pub fn console(&self) -> Result<Console, ConfigError> {
        self.validate()?;

        let provider = Arc::new(self.session_provider()?);
        let gateway = Gateway::new(self.gateway_settings())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let console = Console::new(provider, gateway).with_max_keys(self.max_keys);
        console.set_bucket(&self.bucket);
        Ok(console)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn it_has_defaults() {
        let config = Config::default();

        assert_eq!(config.endpoint, "https://s3.us-east-1.amazonaws.com");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.max_keys, 10);
        assert_eq!(config.expires, 3600);
        assert!(config.bucket.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn it_reads_partial_config_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"bucket": "photos", "issuer": {{"type": "endpoint", "url": "http://localhost:8080/creds"}}}}"#
        )?;

        let config = Config::from_file(file.path())?;

        assert_eq!(config.bucket, "photos");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(
            config.issuer,
            Some(IssuerConfig::Endpoint {
                url: "http://localhost:8080/creds".into(),
                authorization: None,
            })
        );
        Ok(())
    }

    #[test]
    fn it_reports_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/definitely/not/here.json")));

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn it_reports_unparseable_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "not json")?;

        assert!(matches!(
            Config::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
        Ok(())
    }

    #[test]
    fn it_applies_environment_overrides() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("COFFER_ENDPOINT", "http://127.0.0.1:9000"),
            ("COFFER_REGION", "eu-west-1"),
            ("COFFER_BUCKET", "photos"),
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_SESSION_TOKEN", "token"),
        ]));

        assert_eq!(config.endpoint, "http://127.0.0.1:9000");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.bucket, "photos");
        assert_eq!(
            config.issuer,
            Some(IssuerConfig::Static {
                access_key_id: "AKIA".into(),
                secret_access_key: "secret".into(),
                session_token: Some("token".into()),
                user_id: None,
                display_label: None,
            })
        );
    }

    #[test]
    fn it_prefers_credential_endpoint_over_keys() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("COFFER_CREDENTIALS_URL", "http://localhost:8080/creds"),
            ("COFFER_CREDENTIALS_AUTHORIZATION", "Bearer token"),
        ]));

        assert_eq!(
            config.issuer,
            Some(IssuerConfig::Endpoint {
                url: "http://localhost:8080/creds".into(),
                authorization: Some("Bearer token".into()),
            })
        );
    }

    #[test]
    fn it_ignores_incomplete_key_pair() {
        let mut config = Config::default();
        config.apply_env(env(&[("AWS_ACCESS_KEY_ID", "AKIA")]));

        assert_eq!(config.issuer, None);
        assert!(matches!(
            config.session_provider(),
            Err(ConfigError::MissingIssuer)
        ));
    }

    #[test]
    fn it_rejects_invalid_values() {
        let invalid = [
            Config {
                endpoint: "not a url".into(),
                ..Default::default()
            },
            Config {
                max_keys: 0,
                ..Default::default()
            },
            Config {
                expires: MAX_EXPIRES + 1,
                ..Default::default()
            },
            Config {
                region: " ".into(),
                ..Default::default()
            },
        ];

        for config in invalid {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn it_caches_endpoint_sessions() -> anyhow::Result<()> {
        let config = Config {
            issuer: Some(IssuerConfig::Endpoint {
                url: "http://localhost:8080/creds".into(),
                authorization: None,
            }),
            timeout_secs: Some(5),
            ..Default::default()
        };

        let provider = config.session_provider()?;
        assert!(matches!(
            provider.cache_policy(),
            CachePolicy::UntilExpiry { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn it_builds_static_session() -> anyhow::Result<()> {
        let config = Config {
            issuer: Some(IssuerConfig::Static {
                access_key_id: "AKIA".into(),
                secret_access_key: "secret".into(),
                session_token: None,
                user_id: Some("user-1".into()),
                display_label: Some("user@example.com".into()),
            }),
            ..Default::default()
        };

        let provider = config.session_provider()?;
        assert_eq!(provider.cache_policy(), CachePolicy::Never);

        let identity = provider.identity().await?;
        assert_eq!(identity.user_id(), "user-1");
        assert_eq!(identity.display_label(), Some("user@example.com"));
        Ok(())
    }
}
