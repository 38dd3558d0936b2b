//! visolearn-core: client shim for the hosted VisoLearn Space, session model,
//! fallback engine, fragment rendering, and local session storage.
//!
//! The gateway add-on builds its HTTP surface on this crate. Nothing here
//! holds global state: the service value and the conversation state are
//! owned by the caller and passed through explicitly.

pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod fragments;
pub mod service;
pub mod session;
pub mod storage;

pub use client::{ChatReply, SpaceClient};
pub use config::{EnvToggles, GatewayConfig};
pub use error::{ClientError, ClientResult};
pub use service::{ChatExchange, GeneratedSession, LearningService, Outcome, ServiceStatus};
pub use session::{
    progress_percent, ActiveSession, AutismLevel, ChecklistItem, ConversationState,
    ConversationTurn, ImageData, ImageStyle, Role, SessionConfig, DEFAULT_DIFFICULTY,
};
pub use storage::SessionStore;
