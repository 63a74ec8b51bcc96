//! Core logic of the conversation engine: the structured message, its wire
//! protocols, the tool registry and the turn loop.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod conversation;
mod engine;
mod error;
pub mod message;
mod model_client;
pub mod protocol;
pub mod tool;

pub use engine::{Engine, EngineBuilder};
pub use error::Error;
pub use message::{StructuredMessage, ToolArgs};
pub use protocol::{ConversationProtocol, ProtocolKind};
