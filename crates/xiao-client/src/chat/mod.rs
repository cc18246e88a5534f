//! Chat with the assistant backend.
//!
//! A reply travels `bytes -> decode -> lines -> accumulated text -> format ->
//! surface`. The whole accumulated text is re-formatted after every append, so
//! the surface always holds a complete rendering of what arrived so far.

pub mod client;
pub mod decode;
pub mod error;
pub mod format;
pub mod lines;
pub mod render;

pub use client::{ChatClient, ChatReply, RequestMode, SpeakOptions};
pub use error::ChatError;
pub use format::format_message;
pub use lines::LineMode;
pub use render::{MessageId, MessageSurface, Transcript};
