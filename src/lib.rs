//! charchat is a terminal chat client for talking to fictional characters
//! through a hosted language model.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`character`] loads the character catalog (name to descriptor) from JSON.
//! - [`core`] owns the conversation store, the compose/dispatch/extract
//!   completion pipeline, per-session state, configuration, and credentials.
//! - [`ui`] renders the terminal interface and runs the interactive event loop.
//! - [`api`] defines the chat-completion payloads sent over the wire.
//! - [`utils`] holds the transcript log and diagnostics setup.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod character;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
