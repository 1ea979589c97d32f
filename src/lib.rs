//! mental-coach is a terminal chat client for a supportive coaching
//! conversation, plus the small relay that fronts the completion API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns conversation state, persistence, configuration and the
//!   streaming consumer that turns relay events into reply updates.
//! - [`server`] is the relay: an HTTP service that forwards messages to an
//!   OpenAI-compatible API and re-emits its stream as server-sent events.
//! - [`ui`] runs the interactive line-based chat loop.
//! - [`commands`] implements slash-command parsing and execution.
//! - [`api`] defines the payloads exchanged with the relay and upstream.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod logging;
pub mod server;
pub mod ui;
pub mod utils;
