use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Computation inconsistency: {0}")]
    ComputationInconsistency(String),
}

impl EngineError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn require_finite(field: &str, value: f64) -> Result<f64, EngineError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::invalid(field, "must be a finite number"))
    }
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<f64, EngineError> {
    require_finite(field, value)?;
    if value < 0.0 {
        return Err(EngineError::invalid(field, "must be >= 0"));
    }
    Ok(value)
}
