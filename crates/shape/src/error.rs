//! Result and Error types for the crate.
use miette::Diagnostic;
use thiserror::Error;

use crate::ShapeKind;

/// Result containing an error variant from this module.
pub type Result<T> = std::result::Result<T, Error>;

/// Shape construction and query error variants.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum Error {
    /// A shape was constructed with parameters outside of its valid domain,
    /// such as a negative radius or an axis that is not unit length.
    #[error("invalid {kind} parameters: {reason}")]
    #[diagnostic(code(shape::invalid_parameters))]
    InvalidShapeParameters { kind: ShapeKind, reason: String },

    /// A ray was constructed with a non-finite origin or a zero direction.
    #[error("invalid ray: {0}")]
    #[diagnostic(code(shape::invalid_ray))]
    InvalidRay(String),

    /// No intersection query exists for this ordered pair of shapes.
    #[error("no intersection query is implemented between a {first} and a {second}")]
    #[diagnostic(
        code(shape::unsupported_pair),
        help("see `shape::supported_pairs` for the pairs that can be tested")
    )]
    UnsupportedShapePair { first: ShapeKind, second: ShapeKind },
}

impl Error {
    pub(crate) fn invalid(kind: ShapeKind, reason: impl Into<String>) -> Self {
        Self::InvalidShapeParameters {
            kind,
            reason: reason.into(),
        }
    }
}
