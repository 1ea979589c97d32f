//! Terminal front end.
//!
//! - [`chat_loop`]: the interactive loop that dispatches input to
//!   [`crate::commands`] and applies updates from [`crate::core::chat_stream`].
//! - [`renderer`]: plain-text views of transcripts, history and streaming replies.
//!
//! This layer only presents and captures interaction; [`crate::core`] owns the
//! conversation state.

pub mod chat_loop;
pub mod renderer;
