//! Component identifiers.

/// Identifier of a simulation component.
pub type Id = u32;
