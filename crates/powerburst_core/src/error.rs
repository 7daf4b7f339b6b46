//! # Core Error Types
//!
//! Configuration errors are split on purpose: a color string the resolver
//! cannot read is a hard error (it is almost always a typo in the user's
//! settings), while a malformed numeric setting never reaches this module at
//! all. The settings store swallows those and falls back to defaults.

use thiserror::Error;

/// Errors raised while turning color strings into RGB triples.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    /// The string is not a CSS color keyword.
    #[error("unknown color name: {0:?}")]
    UnknownName(String),

    /// The string starts with `#` but is not a 3, 4, 6 or 8 digit hex color.
    #[error("invalid hex color: {0:?}")]
    InvalidHex(String),

    /// The string looks like `rgb(...)`/`rgba(...)` but cannot be parsed.
    #[error("invalid color function: {0:?}")]
    InvalidFunction(String),

    /// Cursor color mode is active but the host supplied no cursor color.
    #[error("color mode is `cursor` but no cursor color was supplied")]
    MissingCursorColor,
}

/// Errors raised by [`crate::ParticleSystem::spawn`] and palette resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// The palette has no entries (for example `colors = []` in custom mode).
    #[error("palette is empty, cannot color new particles")]
    EmptyPalette,

    /// A palette entry could not be resolved.
    #[error(transparent)]
    Color(#[from] ColorError),
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML document does not parse.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The effect section exists but is not a table.
    #[error("configuration section [{0}] must be a table")]
    InvalidSection(String),
}

/// Result type for color operations.
pub type ColorResult<T> = Result<T, ColorError>;

/// Result type for spawn operations.
pub type SpawnResult<T> = Result<T, SpawnError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
