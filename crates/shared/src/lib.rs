//! Wire envelope and effect-grammar contracts exchanged between engine
//! services (spec.md §3 "Message envelope", §6 "External Interfaces").
//!
//! This crate knows the shape of what crosses the bus; it has no opinion
//! on *how* the bus is implemented (that's `taleforge-engine`'s message
//! bus module).

pub mod effects;
pub mod envelope;
pub mod session;

pub use effects::{parse_effect_line, parse_effect_lines, EffectLine, EffectParseError, EffectValue};
pub use envelope::{MessageEnvelope, MessageStatus, Stage};
pub use session::SessionId;
