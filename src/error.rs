//! Error types for configuration, scanning and disposition.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with a retention policy string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The policy contained no tokens
    #[error("retention policy is empty")]
    Empty,

    /// A token named a unit we do not know
    #[error("invalid retention token \"{0}\": unknown time unit")]
    UnknownUnit(String),

    /// A count that is not a positive integer
    #[error("invalid retention token \"{0}\": count must be a positive integer")]
    InvalidCount(String),

    /// `all` does not take a count
    #[error("invalid retention token \"{0}\": \"all\" does not take a count")]
    CountOnAll(String),
}

/// Problems with a filename format template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("format \"{template}\" is missing the {placeholder} placeholder")]
    MissingPlaceholder {
        template: String,
        placeholder: &'static str,
    },

    #[error("format \"{template}\" uses the {placeholder} placeholder more than once")]
    DuplicatePlaceholder {
        template: String,
        placeholder: &'static str,
    },

    #[error("format \"{template}\" contains unknown placeholder \"{{{name}}}\"")]
    UnknownPlaceholder { template: String, name: String },

    #[error("format \"{0}\" has an unterminated '{{'")]
    Unterminated(String),

    #[error("format \"{0}\" must describe a single name, not a path")]
    PathSeparator(String),

    #[error("format \"{template}\" could not be compiled: {reason}")]
    Compile { template: String, reason: String },
}

/// Fatal configuration errors, reported before anything is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("destination directory required for the move action")]
    MissingDestination,

    #[error("invalid reference time \"{0}\": expected YYYY-MM-DDThh:mm, YYYY-MM-DD hh:mm or YYYY-MM-DD")]
    InvalidReferenceTime(String),

    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors that stop a directory scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("backup directory {0} does not exist")]
    NotFound(PathBuf),

    #[error("backup path {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to read backup directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Disposition failures. Destination errors are fatal; the rest are per artifact.
#[derive(Debug, Error)]
pub enum DispositionError {
    #[error("destination {0} exists but is not a directory")]
    DestinationNotDirectory(PathBuf),

    #[error("failed to create destination directory {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot move {path}: {target} already exists")]
    TargetExists { path: PathBuf, target: PathBuf },

    #[error("failed to move {path}: {source}")]
    Move {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
