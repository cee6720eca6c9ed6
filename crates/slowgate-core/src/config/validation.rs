//! Configuration validation utilities

use crate::SlowGateError;

/// Configuration validation result
pub type ValidationResult = Result<(), ValidationError>;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Value is out of acceptable range
    #[error("Field '{field}' must be between {min} and {max} (got {actual})")]
    OutOfRange {
        field: String,
        min: u64,
        max: u64,
        actual: u64,
    },
    /// Custom validation failed
    #[error("Field '{field}': {message}")]
    Custom { field: String, message: String },
}

impl From<ValidationError> for SlowGateError {
    fn from(err: ValidationError) -> Self {
        SlowGateError::invalid(err.to_string())
    }
}

/// Configuration validator that accumulates validation failures
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
    field_prefix: String,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator for a nested field
    pub fn for_field(&self, field_name: &str) -> Self {
        Self {
            errors: Vec::new(),
            field_prefix: self.full_field_name(field_name),
        }
    }

    /// Validate that an integer is within `[min, max]`
    pub fn range(&mut self, field_name: &str, value: u64, min: u64, max: u64) -> &mut Self {
        if value < min || value > max {
            self.errors.push(ValidationError::OutOfRange {
                field: self.full_field_name(field_name),
                min,
                max,
                actual: value,
            });
        }
        self
    }

    /// Validate using a custom predicate
    pub fn custom<T, F>(&mut self, field_name: &str, value: &T, predicate: F, message: &str) -> &mut Self
    where
        F: FnOnce(&T) -> bool,
    {
        if !predicate(value) {
            self.errors.push(ValidationError::Custom {
                field: self.full_field_name(field_name),
                message: message.to_string(),
            });
        }
        self
    }

    /// Merge errors from another validator
    pub fn merge(&mut self, other: ConfigValidator) {
        self.errors.extend(other.errors);
    }

    /// First failure, if any
    pub fn result(self) -> ValidationResult {
        match self.errors.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }

    /// Every accumulated failure
    pub fn all_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    fn full_field_name(&self, field_name: &str) -> String {
        if self.field_prefix.is_empty() {
            field_name.to_string()
        } else {
            format!("{}.{}", self.field_prefix, field_name)
        }
    }
}
