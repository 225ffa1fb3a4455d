//! Error types shared across the crate.

use thiserror::Error;

use crate::rng::GeneratorFamily;

/// Failures of the replay machinery.
///
/// None of these are fatal: callers treat any of them as "replay unavailable" and keep
/// drawing from the live generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// The live generator does not export its state.
    #[error("generator family is not supported for replay")]
    UnsupportedFamily,

    /// `rewind` was called before any successful `snapshot`.
    #[error("no snapshot has been taken")]
    NoSnapshot,

    /// A state was imported into a generator of a different family.
    #[error("cannot import {found:?} state into a {expected:?} generator")]
    FamilyMismatch {
        expected: GeneratorFamily,
        found: GeneratorFamily,
    },

    /// The state was written by an incompatible format version.
    #[error("unsupported generator state version {0}")]
    UnsupportedVersion(u32),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
