#[cfg(feature = "python")]
use pyo3::exceptions::PyRuntimeError;
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

/// Hard failures: loading, configuration and frame conversion.
///
/// The indicator computations themselves never produce these; they degrade
/// to zero values carrying [`Diagnostic`]s instead.
#[derive(Error, Debug)]
pub enum RestorationError {
    #[error("Data not loaded: {0}")]
    NotLoaded(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(feature = "python")]
impl From<RestorationError> for PyErr {
    fn from(err: RestorationError) -> PyErr {
        PyRuntimeError::new_err(err.to_string())
    }
}

/// Recoverable data-quality findings attached to computed results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Diagnostic {
    #[error("column not found for '{field}'")]
    MissingColumn { field: &'static str },

    #[error("no rows in {what}")]
    EmptyInput { what: &'static str },

    #[error("{count} unparseable value(s) in '{field}' treated as missing")]
    UnparseableValue { field: &'static str, count: usize },

    #[error("work unit {property}_{work_unit} has inconsistent area values {values:?}")]
    InconsistentArea {
        property: String,
        work_unit: String,
        values: Vec<f64>,
    },
}

impl Diagnostic {
    pub fn is_inconsistent_area(&self) -> bool {
        matches!(self, Diagnostic::InconsistentArea { .. })
    }
}

/// Append the diagnostics of `source` that `target` does not already hold.
pub fn merge_diagnostics(target: &mut Vec<Diagnostic>, source: &[Diagnostic]) {
    for diagnostic in source {
        if !target.contains(diagnostic) {
            target.push(diagnostic.clone());
        }
    }
}

/// Render a list of diagnostics as one annotation line.
pub fn describe(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
