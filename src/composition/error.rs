//! Error types for sprite sheet composition

use thiserror::Error;

/// Error when an override image cannot be applied to a base sheet.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompositionError {
    /// Override dimensions differ from the base sheet
    #[error("Override image ({override_w}x{override_h}) does not match base sheet ({base_w}x{base_h})", override_w = override_size.0, override_h = override_size.1, base_w = base_size.0, base_h = base_size.1)]
    SizeMismatch { base_size: (u32, u32), override_size: (u32, u32) },
}
