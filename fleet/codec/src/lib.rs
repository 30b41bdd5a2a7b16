#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Fleet codec: a message is a run of `(tag, fixed-size payload)` records.
//!
//! Decoding never fails. It stops at the first zero, unknown or truncated
//! record and keeps whatever was decoded before it. A civilian's distress
//! shout travels as a bare four-letter word instead of a tagged record.

/// Tag table shared by every agent.
#[path = "../tags.rs"]
pub mod tags;

/// Typed facts carried by a message.
#[path = "../parameter.rs"]
pub mod parameter;

/// Message assembly, encoding and decoding.
#[path = "../message.rs"]
pub mod message;

/// Error types.
#[path = "../error.rs"]
pub mod error;

pub use error::CodecError;
pub use message::Message;
pub use parameter::{Distress, Parameter, ParameterClass};
pub use tags::Tag;
