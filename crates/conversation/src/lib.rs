//! Per-chat input collection: prompts for the four signup fields,
//! validates them, and hands the finished request to a registrar.

pub mod collector;
pub mod messages;
pub mod state;
pub mod validate;

pub use collector::{ChatOutbound, Collector, Input, MessageRef, SessionId};
pub use state::{Conversation, SessionState, Step};
pub use validate::Rejection;
