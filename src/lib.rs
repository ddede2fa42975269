//! Best-effort delivery adapter for learning-activity statements.
//!
//! Translates a domain [`Statement`](domain::Statement) into the JSON wire
//! format of an xAPI (Tin Can) learning record store, signs the request with
//! either static Basic credentials or per-request OAuth 1.0 signatures, and
//! POSTs it over HTTP. Delivery is fire-and-forget: a statement that cannot
//! be sent is logged and discarded, never retried or queued.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ActorIdentifier, ConfigError, ConfigSource, MappingSettings, ProviderConfig};
pub use domain::{Actor, ActorAccount, Context, LearningObject, Statement, StatementResult, Verb};
pub use outbound::tincan::{
    DeliveryClient, HttpClientError, LrsResponse, MappingError, RequestSigner, SignError,
    TincanProvider, map_statement,
};
