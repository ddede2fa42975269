// Tin Can (xAPI) statement delivery module
//
// Pure components (no I/O):
//   document  – insertion-ordered JSON document builder that suppresses
//               null/empty values
//   mapper    – domain statement → wire document transformation
//   signer    – Authorization header computation (Basic or OAuth 1.0)
//
// I/O components:
//   http_client – one blocking POST per call over a pooled transport
//   provider    – configuration, self-test and per-statement orchestration

pub mod document;
pub mod http_client;
pub mod mapper;
pub mod provider;
pub mod signer;

// Re-export commonly used types
pub use http_client::{DeliveryClient, HttpClientError, LrsResponse};
pub use mapper::{MappingError, map_statement};
pub use provider::{DeliveryError, TincanProvider};
pub use signer::{RequestSigner, SignError};
