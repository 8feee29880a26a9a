#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Malformed rule source: {0}")]
    MalformedRuleSource(String),

    #[error("Field '{field}' is not present in the record set")]
    MissingField { field: String },

    #[error("Malformed rule for field '{field}': {reason}")]
    MalformedRule { field: String, reason: String },

    #[error("Validation of field '{field}' failed: {source}")]
    FieldValidation {
        field: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Validation grid could not be loaded from {path}: {reason}")]
    GridLoad { path: String, reason: String },

    #[error("Invalid record set: {0}")]
    InvalidRecords(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn missing_field(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }

    pub(crate) fn malformed_rule(field: &str, reason: impl Into<String>) -> Self {
        Self::MalformedRule {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap an evaluator failure for `field`, leaving already-wrapped errors as-is.
    pub(crate) fn for_field(field: &str, cause: CoreError) -> Self {
        match cause {
            Self::FieldValidation { .. } => cause,
            other => Self::FieldValidation {
                field: field.to_string(),
                source: Box::new(other),
            },
        }
    }
}
