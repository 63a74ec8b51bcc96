//! An abstraction layer for chat-completion backends.
//!
//! This crate establishes the contract between the conversation engine
//! and whatever transport reaches the language model, so that the engine
//! can switch backends without modifying the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
