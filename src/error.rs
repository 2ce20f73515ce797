//! The crate-wide error type.
//!
//! Every error reflects a contract violation by the caller (or, for `IoError` / `JsonError`, a
//! failure to load configuration). All preconditions are checked before any state is mutated, so
//! an `Err` always means the store is unchanged.
use std::fmt::{self, Debug, Display};
use std::io;

use crate::property::PropertyValueType;

/// Provides `StoreError` and maps to other errors to
/// convert to a `StoreError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum StoreError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    /// A required argument was absent, e.g. a builder finished without a value type.
    NullArgument(&'static str),
    /// The identifier is well formed but not present in the store.
    UnknownIdentifier(String),
    /// Re-adding an existing entity, type, property, or membership.
    DuplicateIdentifier(String),
    /// The value is not compatible with the declared property type.
    TypeMismatch {
        expected: PropertyValueType,
        found: String,
    },
    ImmutablePropertyWrite(String),
    /// A property without a default value lacks a value for some entity.
    MissingRequiredValue(String),
    NegativeIndex(i64),
    NegativeCapacityIncrement(i64),
    TimeTrackingDisabled(String),
    /// A weighting function produced a negative, NaN, or infinite weight, or the weights
    /// summed to a non-finite total.
    MalformedWeightingFunction(String),
    /// A weighted sample was requested while another one was still in flight.
    ReentrantSamplingAccess,
    /// The property definition's value type cannot be held by the requested manager.
    PropertyDefinitionImproperType {
        manager: &'static str,
        found: PropertyValueType,
    },
    /// The requested manager needs a default value to fill its dense storage.
    PropertyDefinitionMissingDefault(&'static str),
}

impl From<io::Error> for StoreError {
    fn from(error: io::Error) -> Self {
        StoreError::IoError(error)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::JsonError(error)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::IoError(error) => Some(error),
            StoreError::JsonError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::IoError(error) => write!(f, "I/O error: {error}"),
            StoreError::JsonError(error) => write!(f, "JSON error: {error}"),
            StoreError::NullArgument(what) => write!(f, "missing required argument: {what}"),
            StoreError::UnknownIdentifier(what) => write!(f, "unknown identifier: {what}"),
            StoreError::DuplicateIdentifier(what) => write!(f, "duplicate identifier: {what}"),
            StoreError::TypeMismatch { expected, found } => {
                write!(f, "value {found} is not compatible with type {expected}")
            }
            StoreError::ImmutablePropertyWrite(property) => {
                write!(f, "property {property} is immutable")
            }
            StoreError::MissingRequiredValue(what) => {
                write!(f, "missing required property value: {what}")
            }
            StoreError::NegativeIndex(index) => write!(f, "negative index: {index}"),
            StoreError::NegativeCapacityIncrement(count) => {
                write!(f, "negative capacity increment: {count}")
            }
            StoreError::TimeTrackingDisabled(what) => {
                write!(f, "time tracking is not enabled for {what}")
            }
            StoreError::MalformedWeightingFunction(detail) => {
                write!(f, "malformed weighting function: {detail}")
            }
            StoreError::ReentrantSamplingAccess => {
                write!(f, "weighted sampling is already in progress")
            }
            StoreError::PropertyDefinitionImproperType { manager, found } => {
                write!(f, "{manager} cannot hold values of type {found}")
            }
            StoreError::PropertyDefinitionMissingDefault(manager) => {
                write!(f, "{manager} requires a property definition with a default value")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_includes_detail() {
        let error = StoreError::NegativeIndex(-3);
        assert_eq!(error.to_string(), "negative index: -3");

        let error = StoreError::TypeMismatch {
            expected: PropertyValueType::Int,
            found: "Boolean(true)".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "value Boolean(true) is not compatible with type Int"
        );
    }

    #[test]
    fn json_errors_convert_and_keep_source() {
        let parse_error = serde_json::from_str::<u32>("not json").unwrap_err();
        let error: StoreError = parse_error.into();
        assert!(matches!(error, StoreError::JsonError(_)));
        assert!(error.source().is_some());
    }
}
