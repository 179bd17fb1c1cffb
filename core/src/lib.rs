// daxchat Core Library
// Multi-provider chat-completion client

pub mod model;

pub use model::{
  ApiClient, CallOptions, ChatError, ChatOutcome, ChatResponse, ChatResult, ConnectionOutcome,
  ConnectionReport, ConversationTurn, ErrorCode, HttpTransport, ProviderKind, ReqwestTransport,
  Role,
};
