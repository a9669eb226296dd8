//! Unified Error Model
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InspectError {
    #[error("Invalid field path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Field '{0}' identifies the report and cannot be updated")]
    ImmutableField(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),
}
