//! An out-of-the-box agent that talks to a model in a structured format and
//! lets it use a set of built-in tools.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring agent functionality into your own host apps.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

pub mod config;
mod session;
pub mod tools;

pub use config::{CliConfig, ConfigError};
pub use session::{Session, SessionBuilder, builtin_registry};

/// Re-exports of [`parley_core`] crate.
pub mod core {
    pub use parley_core::*;
}
