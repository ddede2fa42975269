use std::sync::{Arc, RwLock};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ConfigSource, MappingSettings, ProviderConfig};
use crate::domain::Statement;
use crate::outbound::tincan::http_client::{DeliveryClient, HttpClientError, LrsResponse};
use crate::outbound::tincan::mapper::{MappingError, map_statement};
use crate::outbound::tincan::signer::{RequestSigner, SignError};

/// Protocol version reported on every request. Reported, never negotiated,
/// so it is deliberately not configurable.
const API_VERSION: &str = "1.0.0";
const VERSION_HEADER: &str = "X-Experience-API-Version";

/// Canonical statement POSTed once at startup to probe connectivity.
const TEST_CONNECTION_STATEMENT: &str = r#"{"actor": {"mbox": "mailto:no-reply@example.com","name": "LRS startup connection test","objectType": "Agent"},"verb": {"id": "http://adlnet.gov/expapi/verbs/interacted","display": {"en-US": "interacted"}},"object": {"id": "http://www.example.com/xapi/activities/connection-test","objectType": "Activity","definition": {"name": {"en-US": "Connection test"}}}}"#;

/// Per-call failures on the delivery path. These never escape
/// [`TincanProvider::handle_statement`]; they are logged and the statement is
/// dropped.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("failed to serialise statement payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    Transport(#[from] HttpClientError),
}

/// Lifecycle of one provider instance.
enum ProviderState {
    /// Built but `initialize()` has not run yet.
    Unconfigured,

    /// Configuration validated; statements are being delivered.
    Ready(Box<ReadyState>),

    /// Initialization failed fatally. Terminal for this instance, but the
    /// host process keeps running.
    FailedInit,

    /// Transport released.
    Shutdown,
}

/// Everything a delivery needs, frozen at initialization time.
struct ReadyState {
    url: String,
    headers: Vec<(String, String)>,
    settings: MappingSettings,
    signer: RequestSigner,
    client: DeliveryClient,
}

/// Best-effort statement delivery to one configured LRS endpoint.
///
/// State machine: `Unconfigured → Ready` (or `FailedInit`), `Ready → Shutdown`.
/// `handle_statement` is safe to call from many threads at once; each call
/// blocks its own thread for the duration of one HTTP POST and never raises,
/// whatever goes wrong.
pub struct TincanProvider {
    id: String,
    config_source: Arc<dyn ConfigSource>,
    defaults: ProviderConfig,
    state: RwLock<ProviderState>,
}

impl TincanProvider {
    /// Create an unconfigured provider reading its settings from `source`
    /// under the namespace `lrs.<id>.`.
    pub fn new(id: impl Into<String>, source: Arc<dyn ConfigSource>) -> Self {
        Self {
            id: id.into(),
            config_source: source,
            defaults: ProviderConfig::default(),
            state: RwLock::new(ProviderState::Unconfigured),
        }
    }

    /// Provider instance id; also the configuration namespace segment.
    pub fn id(&self) -> &str {
        &self.id
    }

    // ------------------------------------------------------------------
    // Pre-init setters. A non-empty configured value overrides these at
    // initialize() time.
    // ------------------------------------------------------------------

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.defaults.url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = timeout;
        self
    }

    pub fn with_basic_auth(mut self, credential: impl Into<String>) -> Self {
        self.defaults.basic_auth = Some(credential.into());
        self
    }

    pub fn with_consumer_key(mut self, key: impl Into<String>) -> Self {
        self.defaults.consumer_key = Some(key.into());
        self
    }

    pub fn with_consumer_secret(mut self, secret: impl Into<String>) -> Self {
        self.defaults.consumer_secret = Some(secret.into());
        self
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.defaults.realm = Some(realm.into());
        self
    }

    /// Read and validate configuration, then probe the endpoint.
    ///
    /// Configuration problems (malformed URL, incomplete auth material,
    /// transport construction failure) are fatal and leave the provider in
    /// `FailedInit`. The connectivity self-test is advisory only: a failure
    /// is logged but the provider still becomes `Ready` and keeps attempting
    /// real deliveries.
    pub fn initialize(&self) -> Result<(), ConfigError> {
        if matches!(*self.read_state(), ProviderState::Ready(_)) {
            return Ok(());
        }

        let ready = match self.build_ready() {
            Ok(ready) => ready,
            Err(e) => {
                error!(id = %self.id, error = %e, "LRS provider cannot start");
                *self.write_state() = ProviderState::FailedInit;
                return Err(e);
            }
        };

        info!(
            id = %self.id,
            version = API_VERSION,
            url = %ready.url,
            "LRS provider configured"
        );

        self.run_self_test(&ready);

        *self.write_state() = ProviderState::Ready(Box::new(ready));
        info!(id = %self.id, "LRS provider INIT complete");
        Ok(())
    }

    /// Deliver one statement, best effort.
    ///
    /// Payload priority: fully populated structured statement, then raw
    /// key/value map, then raw JSON text. Every failure on this path is
    /// caught, logged together with the attempted payload, and swallowed;
    /// the statement is dropped, never queued or retried.
    pub fn handle_statement(&self, statement: &Statement) {
        let state = self.read_state();
        let ready = match &*state {
            ProviderState::Ready(ready) => ready,
            _ => {
                warn!(
                    id = %self.id,
                    statement = ?statement,
                    "LRS provider not ready - statement dropped"
                );
                return;
            }
        };

        let data = if statement.is_populated() {
            match map_statement(statement, &ready.settings)
                .map_err(DeliveryError::from)
                .and_then(|doc| serde_json::to_string(&doc).map_err(DeliveryError::from))
            {
                Ok(json) => {
                    debug!(id = %self.id, payload = %json, "LRS using populated statement");
                    json
                }
                Err(e) => {
                    error!(
                        id = %self.id,
                        error = %e,
                        statement = ?statement,
                        "LRS provider could not map statement - dropped"
                    );
                    return;
                }
            }
        } else if let Some(map) = statement.raw_map.as_ref().filter(|m| !m.is_empty()) {
            match serde_json::to_string(map) {
                Ok(json) => {
                    debug!(id = %self.id, payload = %json, "LRS using raw map statement");
                    json
                }
                Err(e) => {
                    error!(
                        id = %self.id,
                        error = %e,
                        statement = ?statement,
                        "LRS provider could not serialise raw map - dropped"
                    );
                    return;
                }
            }
        } else if let Some(raw) = statement.raw_json.as_ref().filter(|j| !j.trim().is_empty()) {
            debug!(id = %self.id, payload = %raw, "LRS using raw JSON statement");
            raw.clone()
        } else {
            warn!(
                id = %self.id,
                statement = ?statement,
                "LRS statement carries no payload - dropped"
            );
            return;
        };

        match Self::post_data(ready, &data) {
            Ok(response) if response.is_success() => {
                debug!(
                    id = %self.id,
                    status = response.status,
                    payload = %data,
                    "LRS provider successfully sent statement"
                );
            }
            Ok(response) => {
                warn!(
                    id = %self.id,
                    status = response.status,
                    message = %response.message,
                    url = %ready.url,
                    body = %response.body,
                    payload = %data,
                    "LRS provider failed sending statement"
                );
            }
            Err(e) => {
                error!(
                    id = %self.id,
                    error = %e,
                    payload = %data,
                    "LRS provider exception: statement was not sent"
                );
            }
        }
    }

    /// Release the transport. Idempotent; safe to call before `initialize`.
    pub fn shutdown(&self) {
        let mut state = self.write_state();
        if !matches!(*state, ProviderState::Shutdown) {
            debug!(id = %self.id, "LRS provider shut down");
        }
        *state = ProviderState::Shutdown;
    }

    /// Whether the provider reached `Ready`.
    pub fn is_ready(&self) -> bool {
        matches!(*self.read_state(), ProviderState::Ready(_))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn build_ready(&self) -> Result<ReadyState, ConfigError> {
        let config = ProviderConfig::read(self.config_source.as_ref(), &self.id, &self.defaults)?;
        let signer = RequestSigner::from_config(&config, &self.id)?;
        let client = DeliveryClient::new(config.timeout)
            .map_err(|e| ConfigError::Transport(e.to_string()))?;

        let headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            (VERSION_HEADER.to_string(), API_VERSION.to_string()),
        ];

        Ok(ReadyState {
            url: config.url.clone(),
            settings: config.mapping_settings(),
            headers,
            signer,
            client,
        })
    }

    /// One POST of the canonical test statement. Failures are logged, never
    /// fatal: the endpoint may simply not be up yet.
    fn run_self_test(&self, ready: &ReadyState) {
        match Self::post_data(ready, TEST_CONNECTION_STATEMENT) {
            Ok(response) if response.status == 200 => {
                info!(id = %self.id, "LRS provider configured and ready");
            }
            Ok(response) => {
                error!(
                    id = %self.id,
                    status = response.status,
                    message = %response.message,
                    "LRS provider not configured properly OR LRS is offline - test message failed"
                );
            }
            Err(e) => {
                error!(
                    id = %self.id,
                    error = %e,
                    "LRS provider failure while trying to contact the LRS - initialization test failed"
                );
            }
        }
    }

    /// Compute headers (signed mode recomputes Authorization per call) and
    /// fire exactly one POST.
    fn post_data(ready: &ReadyState, data: &str) -> Result<LrsResponse, DeliveryError> {
        let auth = ready.signer.authorization_header("POST", &ready.url)?;

        let mut headers = ready.headers.clone();
        headers.push(("Authorization".to_string(), auth));

        Ok(ready.client.post(&ready.url, &headers, data)?)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ProviderState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, ProviderState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
