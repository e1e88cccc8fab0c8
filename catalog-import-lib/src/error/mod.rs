use thiserror::Error;

use crate::types::ScalarType;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Column '{column}' has value {value:?} which is not a valid {expected}")]
    MalformedAttribute {
        column: String,
        value: String,
        expected: ScalarType,
    },
    #[error("Missing required value: {0}")]
    MissingRequiredValue(String),
    #[error("Column '{column}' has unknown value {value:?}")]
    UnknownEnumerationValue { column: String, value: String },
    #[error("Can't find category with path {0:?}")]
    UnknownCategory(String),
    #[error("Unable to resolve a unique URL key: {0}")]
    SlugResolution(String),
    #[error("URL key '{slug}' was reserved concurrently under scope '{scope}'")]
    ReservationConflict { slug: String, scope: String },
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Processing error: {0}")]
    Processing(String),
}

impl ImportError {
    /// Errors that make the whole batch unusable, as opposed to errors that
    /// only reject the row they were raised for.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImportError::Io(_)
                | ImportError::Json(_)
                | ImportError::Csv(_)
                | ImportError::Spreadsheet(_)
                | ImportError::InvalidConfig(_)
                | ImportError::StoreUnavailable(_)
                | ImportError::Processing(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingMessage {
    pub message: String,
    pub source: Option<String>,
}

impl ProcessingMessage {
    pub fn new(message: impl Into<String>, source: Option<String>) -> Self {
        Self {
            message: message.into(),
            source,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProcessingState {
    warnings: Vec<ProcessingMessage>,
    errors: Vec<ProcessingMessage>,
}

impl ProcessingState {
    pub fn add_warning(&mut self, message: impl Into<String>, source: Option<String>) {
        self.warnings.push(ProcessingMessage::new(message, source));
    }

    pub fn add_error(&mut self, message: impl Into<String>, source: Option<String>) {
        self.errors.push(ProcessingMessage::new(message, source));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn get_warnings(&self) -> &[ProcessingMessage] {
        &self.warnings
    }

    pub fn merge(&mut self, other: ProcessingState) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }
}

#[derive(Debug)]
pub enum ProcessingOutcome {
    Success,
    SuccessWithWarnings(Vec<ProcessingMessage>),
    Failure {
        errors: Vec<ProcessingMessage>,
        warnings: Vec<ProcessingMessage>,
    },
}

impl ProcessingOutcome {
    pub fn from_state(state: ProcessingState) -> Self {
        if !state.has_errors() && !state.has_warnings() {
            ProcessingOutcome::Success
        } else if state.has_errors() {
            ProcessingOutcome::Failure {
                errors: state.errors,
                warnings: state.warnings,
            }
        } else {
            ProcessingOutcome::SuccessWithWarnings(state.warnings)
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ProcessingOutcome::Failure { .. })
    }
}
