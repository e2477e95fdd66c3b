//! # Experiment Factory Common Library
//!
//! Shared code for the `expfactory` tool:
//! - Manifest model (`config.json`) and validation
//! - Content repository discovery, selection and lookup
//! - Battery assembly (skeleton copy + token substitution)
//! - Survey rendering from `survey.tsv`
//! - Single item page rendering, VM preparation, static site generation
//! - Configuration resolution and repository fetching

pub mod battery;
pub mod config;
pub mod error;
pub mod fetch;
pub mod files;
pub mod manifest;
pub mod page;
pub mod selection;
pub mod site;
pub mod survey;
pub mod template;
pub mod validation;
pub mod vm;

pub use error::{Error, Result};
pub use manifest::{ItemKind, Manifest, Template};
pub use validation::{ValidateOptions, ValidationResult};
