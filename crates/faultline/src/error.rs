//! Error types for faultline operations.

use std::io;
use thiserror::Error;

/// The error type for faultline operations.
///
/// Only structural mutations and collaborator I/O surface errors. Analysis
/// over a stale or partial graph degrades instead of failing; see
/// [`crate::impact::ImpactAnalysis::degraded`].
#[derive(Debug, Error)]
pub enum Error {
    /// A dependency referenced a system that is not in the graph.
    #[error("Unknown system: {system_id}")]
    UnknownSystem {
        /// The id that could not be resolved
        system_id: String,
    },

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Graph document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A health probe failed for a system.
    #[error("Health probe failed for {system_id}: {message}")]
    Probe {
        /// System being probed
        system_id: String,
        /// Probe-specific failure message
        message: String,
    },

    /// An alert could not be delivered.
    #[error("Alert delivery failed: {0}")]
    Alert(String),
}

impl Error {
    /// Shorthand for [`Error::UnknownSystem`].
    pub fn unknown_system(system_id: impl Into<String>) -> Self {
        Self::UnknownSystem {
            system_id: system_id.into(),
        }
    }
}

/// A specialized Result type for faultline operations.
pub type Result<T> = std::result::Result<T, Error>;
