//! Model layer error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a chat or connection-test call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
  /// No usable active configuration
  #[error("API client not configured. Please set up your API configuration in settings.")]
  NotConfigured,

  /// The profile cannot be turned into a request
  #[error("Invalid configuration: {0}")]
  InvalidConfiguration(String),

  /// Nothing is listening on the endpoint
  #[error("{message}")]
  ConnectionRefused { message: String },

  /// The endpoint host name does not resolve
  #[error("{message}")]
  DnsResolution { message: String },

  /// The call deadline elapsed
  #[error("{message}")]
  Timeout { message: String },

  /// The caller cancelled the call
  #[error("Request aborted")]
  Aborted,

  /// Any other transport failure
  #[error("Network error: {0}")]
  Network(String),

  /// Non-success HTTP status
  #[error("{message}")]
  Rejected { status: u16, message: String },

  /// The response body is not what the provider should send
  #[error("Invalid response: {0}")]
  MalformedResponse(String),
}

impl ChatError {
  /// Reason code for callers that branch on the error kind
  pub fn code(&self) -> ErrorCode {
    match self {
      ChatError::NotConfigured => ErrorCode::NotConfigured,
      ChatError::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
      ChatError::ConnectionRefused { .. } => ErrorCode::ConnectionRefused,
      ChatError::DnsResolution { .. } => ErrorCode::DnsResolution,
      ChatError::Timeout { .. } => ErrorCode::Timeout,
      ChatError::Aborted => ErrorCode::Aborted,
      ChatError::Network(_) => ErrorCode::Network,
      ChatError::Rejected { .. } => ErrorCode::Rejected,
      ChatError::MalformedResponse(_) => ErrorCode::MalformedResponse,
    }
  }

  /// HTTP status for protocol rejections
  pub fn status(&self) -> Option<u16> {
    match self {
      ChatError::Rejected { status, .. } => Some(*status),
      _ => None,
    }
  }
}

/// Serializable error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
  NotConfigured,
  InvalidConfiguration,
  ConnectionRefused,
  DnsResolution,
  Timeout,
  Aborted,
  Network,
  Rejected,
  MalformedResponse,
}

/// Alias for Result<T, ChatError>
pub type Result<T> = std::result::Result<T, ChatError>;
