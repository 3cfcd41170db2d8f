//! ScriptDev Types - Values exchanged between the host and the script runtime
//!
//! This crate holds the closed [`Variant`] tagged union and its conversion
//! rules. It has no knowledge of the scripting runtime or of the host's field
//! model; both sides only speak `Variant`.

mod error;
mod variant;

pub use error::*;
pub use variant::*;

/// Named arguments bound into the runtime before an evaluation.
pub type ScriptArgs = std::collections::HashMap<String, Variant>;
