//! daxchat Model Layer
//!
//! Reconciles four chat-completion wire protocols behind one client.
//!
//! Architecture:
//! - [ConfigurationResolver]: caches the active profile, swapped on reload
//! - [ProviderAdapter]: per-provider request building and response parsing
//! - [HttpTransport]: fetch-like network seam, [ReqwestTransport] in production
//! - [StreamAccumulator]: SSE and NDJSON delta accumulation
//! - [ApiClient]: compatibility fallback, deadlines and cancellation

pub mod client;
pub mod connection;
pub mod error;
pub mod provider;
pub mod providers;
pub mod resolver;
pub mod streaming;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use client::{ApiClient, CallOptions};
pub use error::{ChatError, ErrorCode, Result};
pub use provider::{
  HttpMethod, ParsedResponse, ProviderAdapter, ProviderKind, RequestContext, WireRequest,
};
pub use resolver::{ActiveConfiguration, ConfigurationResolver};
pub use streaming::{ProgressCallback, StreamAccumulator};
pub use transport::{ByteStream, HttpTransport, ReqwestTransport, TransportError, TransportResponse};
pub use types::*;
