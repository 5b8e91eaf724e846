use thiserror::Error;

/// Hard failures of the plan filter. Everything else ends up as a [`Warning`].
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("JSON unparsable after all repair strategies ({content_length} bytes, line {line} column {column}): {preview}")]
    JsonUnparsable {
        content_length: usize,
        /// Leading characters of the last attempted text.
        preview: String,
        line: usize,
        column: usize,
    },
}

/// Non-fatal findings collected into the validation report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    #[error("{0}")]
    Structural(String),
    #[error("{field} mismatch: expected {expected}, got {got}")]
    SchemaMismatch {
        field: &'static str,
        expected: i64,
        got: String,
    },
}

pub type Result<T> = std::result::Result<T, FilterError>;
