use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

/// Global (non-namespaced) setting naming which inverse functional identifier
/// the actor mapper emits: `mbox`, `mbox_sha1sum`, `openid` or `account`.
pub const IDENTIFIER_PROPERTY: &str = "lrs.inverse.functional.identifier";

/// Global setting holding this server's own base URL, used as the fallback
/// `homePage` for account identifiers.
pub const SERVER_URL_PROPERTY: &str = "server.url";

/// Key/value lookup over the host's configuration store.
///
/// The provider only ever performs string lookups; how the values are stored
/// (files, environment, database) is the host's concern.
pub trait ConfigSource: Send + Sync {
    /// Return the raw value for `key`, or `None` when the key is unset.
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for config::Config {
    fn get(&self, key: &str) -> Option<String> {
        self.get_string(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Errors that make the provider unable to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LRS provider id must not be empty")]
    EmptyId,

    #[error("invalid LRS endpoint url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no authentication configured for LRS provider '{id}': set basicAuthUserPass or all of consumer.key, consumer.secret and realm")]
    IncompleteAuth { id: String },

    #[error("failed to construct HTTP transport: {0}")]
    Transport(String),
}

/// Which single identifying field the actor mapper emits.
///
/// Exactly one identifier kind goes onto the wire per actor; mixing kinds is
/// structurally impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActorIdentifier {
    Mbox,
    MboxSha1Sum,
    Openid,
    #[default]
    Account,
}

impl ActorIdentifier {
    /// Parse the configured preference, case-insensitively.
    /// Unknown or missing values fall back to `Account`.
    pub fn from_setting(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "mbox" => Self::Mbox,
            "mbox_sha1sum" => Self::MboxSha1Sum,
            "openid" => Self::Openid,
            _ => Self::Account,
        }
    }
}

/// The subset of configuration the statement mapper needs, passed in
/// explicitly so the mapper stays pure and testable.
#[derive(Debug, Clone, Default)]
pub struct MappingSettings {
    pub identifier: ActorIdentifier,

    /// This server's own base URL, the fallback account `homePage`.
    pub server_url: String,
}

/// Immutable-after-init configuration bundle for one provider instance.
///
/// Values are read once from the configuration source under the namespace
/// `lrs.<id>.`; non-empty configured values override any defaults supplied
/// through the provider's pre-init setters.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// Destination LRS endpoint.
    pub url: String,

    /// Request timeout. Zero means "use the transport default".
    pub timeout: Duration,

    /// `user:pass` credential for Basic auth. Takes precedence over OAuth.
    pub basic_auth: Option<String>,

    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub realm: Option<String>,

    pub identifier: ActorIdentifier,
    pub server_url: String,
}

impl ProviderConfig {
    /// Read and validate the configuration for the provider named `id`.
    ///
    /// `defaults` carries values supplied through setters before
    /// initialization; a non-empty configured value always wins over them.
    pub fn read(
        source: &dyn ConfigSource,
        id: &str,
        defaults: &ProviderConfig,
    ) -> Result<Self, ConfigError> {
        if id.trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }

        let prefix = format!("lrs.{id}.");

        let mut url =
            non_empty(source, &format!("{prefix}url")).unwrap_or_else(|| defaults.url.clone());
        validate_url(&url)?;

        // Some receivers reject the trailing-slash form, so normalization is
        // strictly opt-in.
        let normalize = non_empty(source, &format!("{prefix}normalize.url"))
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if normalize && !url.ends_with('/') {
            url.push('/');
        }

        let timeout = match non_empty(source, &format!("{prefix}request.timeout")) {
            Some(value) => match value.parse::<u64>() {
                Ok(millis) => Duration::from_millis(millis),
                Err(e) => {
                    debug!(
                        key = %format!("{prefix}request.timeout"),
                        error = %e,
                        "request.timeout must be an integer value - using default setting"
                    );
                    Duration::ZERO
                }
            },
            None => defaults.timeout,
        };

        let basic_auth = non_empty(source, &format!("{prefix}basicAuthUserPass"))
            .or_else(|| defaults.basic_auth.clone());
        let consumer_key = non_empty(source, &format!("{prefix}consumer.key"))
            .or_else(|| defaults.consumer_key.clone());
        let consumer_secret = non_empty(source, &format!("{prefix}consumer.secret"))
            .or_else(|| defaults.consumer_secret.clone());
        let realm =
            non_empty(source, &format!("{prefix}realm")).or_else(|| defaults.realm.clone());

        let identifier = non_empty(source, IDENTIFIER_PROPERTY)
            .map(|v| ActorIdentifier::from_setting(&v))
            .unwrap_or(defaults.identifier);
        let server_url = non_empty(source, SERVER_URL_PROPERTY)
            .unwrap_or_else(|| defaults.server_url.clone());

        Ok(Self {
            url,
            timeout,
            basic_auth,
            consumer_key,
            consumer_secret,
            realm,
            identifier,
            server_url,
        })
    }

    /// The settings slice the statement mapper needs.
    pub fn mapping_settings(&self) -> MappingSettings {
        MappingSettings {
            identifier: self.identifier,
            server_url: self.server_url.clone(),
        }
    }
}

/// Look up a key, treating empty values the same as missing ones.
fn non_empty(source: &dyn ConfigSource, key: &str) -> Option<String> {
    source.get(key).filter(|v| !v.trim().is_empty())
}

/// Reject endpoint URLs that are not well-formed http(s) URLs.
fn validate_url(url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(())
}
