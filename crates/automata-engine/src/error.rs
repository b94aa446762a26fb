//! Error types for the driver binary.
//!
//! [`DriverError`] wraps every failure mode between reading the
//! configuration and printing the final census.

/// Top-level error for the driver binary.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: automata_core::config::ConfigError,
    },

    /// The configured model could not be built, or a tick failed.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: automata_core::EngineError,
    },

    /// The run loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: automata_core::runner::RunnerError,
    },

    /// The final census could not be serialized.
    #[error("failed to serialize census: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// `AUTOMATA_SEED` is set but is not an unsigned integer.
    #[error("invalid AUTOMATA_SEED value {value:?}")]
    InvalidSeed {
        /// The raw environment value.
        value: String,
    },
}
