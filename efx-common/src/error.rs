//! Common error types for Experiment Factory

use std::path::PathBuf;
use thiserror::Error;

use crate::manifest::ManifestError;
use crate::survey::SurveyError;

/// Common result type for Experiment Factory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the battery pipeline
///
/// Validation problems with a single content item are not errors: they are
/// reported through [`crate::validation::ValidationResult`]. Variants here abort
/// the whole operation (generate, render, fetch).
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Battery destination already exists; nothing was written
    #[error("Folder exists at {0}, cannot generate")]
    DestinationExists(PathBuf),

    /// A required template file could not be read
    #[error("Cannot read template {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tab-separated export could not be written
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Manifest of an already selected item could not be loaded
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Survey question file could not be rendered
    #[error("Survey error: {0}")]
    Survey(#[from] SurveyError),

    /// Cloning a content repository failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
