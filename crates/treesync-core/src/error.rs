use thiserror::Error;

use crate::Shape;

/// Errors that can occur while canonicalizing external data into [`Value`](crate::Value).
#[derive(Debug, Error)]
pub enum CanonicalizeError {
    /// The provided JSON input was invalid.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The provided YAML input was invalid.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Encountered a number that cannot be represented as an IEEE-754 f64.
    #[error("number {value} cannot be represented as f64")]
    NumberOutOfRange {
        /// The textual representation of the offending number.
        value: String,
    },
    /// YAML maps may only contain string keys.
    #[error("unsupported YAML key type: {found}")]
    NonStringYamlKey {
        /// A description of the key that triggered the error.
        found: String,
    },
    /// YAML tags have no structured-value counterpart.
    #[error("unsupported YAML tag: {tag}")]
    UnsupportedYamlTag {
        /// The tag identifier encountered in the document.
        tag: String,
    },
    /// Attempted to construct a [`Number`](crate::Number) that is not finite.
    #[error("non-finite number encountered: {value}")]
    NotFinite {
        /// The offending numeric value.
        value: f64,
    },
}

/// Errors raised by the diff engine.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DiffError {
    /// The two sides cannot be compared as one container level, e.g. a
    /// mapping against a sequence, or two scalars at the root.
    #[error("cannot diff {old} against {new}")]
    MalformedInput {
        /// Shape of the old side.
        old: Shape,
        /// Shape of the new side.
        new: Shape,
    },
}

/// Errors raised when a value cannot be materialized as shared containers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConvertError {
    /// Callables have no representation inside a shared tree.
    #[error("callable `{name}` cannot be stored in a shared container")]
    Callable {
        /// Name the callable was registered under.
        name: String,
    },
    /// The absent sentinel appeared where a concrete value was required.
    #[error("absent value cannot be stored in a shared container")]
    Absent,
    /// Only composite values convert into a container.
    #[error("expected a mapping or sequence at the root, found {found}")]
    ScalarRoot {
        /// Shape of the offending value.
        found: Shape,
    },
}

/// Errors emitted when constructing [`PatchOptions`](crate::PatchOptions).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    /// A recursion limit of zero would reject every patch.
    #[error("max depth must be at least 1")]
    ZeroDepth,
}
