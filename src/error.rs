use thiserror::Error;

// ---------------------------------------------------------------------------
// Typed errors at the library seams
// ---------------------------------------------------------------------------

/// A 2D array could not be built from the supplied rows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("row {row} has {actual} values, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("{values} values cannot be arranged as {rows} x {cols}")]
    Size {
        rows: usize,
        cols: usize,
        values: usize,
    },
}

/// Malformed input to a quality-check evaluator.
///
/// Raised before any rule is evaluated, so a caller never receives a
/// partially computed flag array.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QcError {
    #[error("dataset has no '{0}' variable")]
    MissingField(String),
    #[error("'{field}' has {actual} samples, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
    #[error("'{field}' has {actual} sub-measurements per sample, expected {expected}")]
    WidthMismatch {
        field: String,
        expected: String,
        actual: usize,
    },
}

/// A chart could not be built for the requested parameter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("dataset has no plottable variable '{0}'")]
    UnknownVariable(String),
    #[error("flag array has {actual} values but the dataset has {expected} samples")]
    FlagLengthMismatch { expected: usize, actual: usize },
}
