//! Conversion errors raised by [`Variant`](crate::Variant) accessors.

use crate::VariantType;

/// Error when a stored value cannot be coerced into the requested type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error("Cannot convert {from} to {to}")]
    Mismatch { from: VariantType, to: &'static str },

    #[error("Cannot parse '{text}' as {to}")]
    Parse { text: String, to: &'static str },

    #[error("Value {value} out of range for {to}")]
    OutOfRange { value: String, to: &'static str },
}

impl ConvertError {
    /// The requested target type
    pub fn target(&self) -> &'static str {
        match self {
            ConvertError::Mismatch { to, .. }
            | ConvertError::Parse { to, .. }
            | ConvertError::OutOfRange { to, .. } => to,
        }
    }
}
