//! Error types produced by the core pipeline.
//!
//! A flat `enum` with a manual `Display` impl and no `thiserror`. Every
//! public operation in this crate returns `Result<T, Error>`; nothing panics
//! on malformed (but well-typed) input.

use std::fmt;

use crate::prim::PrimCommand;

/// Errors that can occur while translating an annotated program into terms.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// `instantiate` failed while expanding a specific primitive call; the
    /// inner error is the failure that occurred during substitution.
    Instantiate(Box<PrimCommand>, Box<Error>),

    /// No semantic schema is registered for a primitive's name.
    MissingDef(String),

    /// A primitive call supplied the wrong number of arguments or results.
    CountMismatch { expected: usize, actual: usize },

    /// An argument or result's type did not match the schema's parameter.
    TypeMismatch { param: String, actual: String },

    /// A write-map or index-path invariant was violated (e.g. indexing a
    /// non-array, or two whole-variable writes to the same variable in one
    /// stage). Indicates a malformed primitive schema or ill-formed lvalue,
    /// never a search failure.
    BadSemantics(String),

    /// A schema body referenced a variable that was not among the schema's
    /// declared parameters, so no caller-side expression exists to
    /// substitute in its place.
    FreeVarInSub(String),

    /// Wraps an error raised while generically walking a tree (substitution,
    /// variable collection); may recursively embed any of the above.
    Traversal(Box<Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Instantiate(prim, inner) => {
                write!(f, "while instantiating '{}': {}", prim.name, inner)
            }
            Error::MissingDef(name) => {
                write!(f, "no semantic schema registered for primitive '{}'", name)
            }
            Error::CountMismatch { expected, actual } => {
                write!(
                    f,
                    "argument/result count mismatch: expected {}, found {}",
                    expected, actual
                )
            }
            Error::TypeMismatch { param, actual } => {
                write!(
                    f,
                    "type mismatch for parameter '{}': found {}",
                    param, actual
                )
            }
            Error::BadSemantics(reason) => write!(f, "malformed semantics: {}", reason),
            Error::FreeVarInSub(param) => {
                write!(f, "free variable '{}' has no substitution", param)
            }
            Error::Traversal(inner) => write!(f, "during traversal: {}", inner),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for core operations.
pub type StarlingResult<T> = Result<T, Error>;
