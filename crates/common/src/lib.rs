//! Common types shared across the skycast crates.
//!
//! This crate holds the error taxonomy and the chat message types that the
//! coordinator, the chat adapter and the tool server all speak.

pub mod error;
pub mod message;

pub use error::{Result, SkycastError};
pub use message::{InboundMessage, ReplyTarget};
