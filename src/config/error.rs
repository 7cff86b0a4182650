//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    /// A required directory cannot be created, read or written.
    #[error("directory `{}` is not usable", .0.display())]
    Directory(PathBuf, #[source] std::io::Error),
}
