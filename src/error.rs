//! Error types for measure validation, expression parsing, and input conversion.

use std::fmt;

/// Errors raised when a measure instance does not satisfy its declared parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// One or more parameters are not declared by the measure
    UnknownParams {
        /// The measure's canonical string
        measure: String,
        /// Names of the undeclared parameters, sorted
        params: Vec<String>,
    },
    /// A declared parameter has a value of the wrong type or outside its choices
    InvalidParam {
        /// The measure's canonical string
        measure: String,
        /// The parameter name
        param: String,
        /// The rejected value, rendered canonically
        value: String,
        /// Reason for invalidity
        reason: String,
    },
    /// A required parameter was not bound
    MissingParam {
        /// The measure's canonical string
        measure: String,
        /// The parameter name
        param: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownParams { measure, params } => {
                write!(
                    f,
                    "unsupported params found for {measure}: [{}]",
                    params.join(", ")
                )
            }
            Self::InvalidParam {
                measure,
                param,
                value,
                reason,
            } => {
                write!(f, "invalid param {param}={value} for {measure}: {reason}")
            }
            Self::MissingParam { measure, param } => {
                write!(
                    f,
                    "missing required param {param} for {measure}; bind it with {param}=<value>"
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors that can occur when parsing a measure expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// The input that failed to parse
    pub input: String,
    /// The specific error that occurred
    pub kind: ParseErrorKind,
}

/// Specific measure-expression parsing errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// Expression is empty
    Empty,
    /// The measure name is not registered
    NameNotFound {
        /// The unrecognized name
        name: String,
    },
    /// The expression does not follow the grammar
    Syntax {
        /// Byte offset where parsing stopped
        position: usize,
        /// Human-readable reason
        reason: String,
    },
    /// The expression parsed, but the resulting measure is invalid
    Invalid(ValidationError),
}

impl ParseError {
    /// Returns true if the measure name was not recognized.
    #[must_use]
    pub const fn is_name_not_found(&self) -> bool {
        matches!(self.kind, ParseErrorKind::NameNotFound { .. })
    }

    /// Returns true if the expression was malformed.
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(self.kind, ParseErrorKind::Syntax { .. } | ParseErrorKind::Empty)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse measure '{}': ", self.input)?;
        match &self.kind {
            ParseErrorKind::Empty => write!(f, "input is empty"),
            ParseErrorKind::NameNotFound { name } => write!(f, "measure '{name}' not found"),
            ParseErrorKind::Syntax { position, reason } => {
                write!(f, "syntax error at position {position}: {reason}")
            }
            ParseErrorKind::Invalid(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrorKind::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors for qrels/run data that cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A table lacks required columns
    MissingColumns {
        /// "qrels" or "run"
        kind: &'static str,
        /// Required columns that are absent
        missing: Vec<String>,
        /// Columns the table does have
        found: Vec<String>,
    },
    /// A table cell could not be converted to the expected type
    InvalidCell {
        /// "qrels" or "run"
        kind: &'static str,
        /// Row index
        row: usize,
        /// Column name
        column: String,
        /// Reason for invalidity
        reason: &'static str,
    },
    /// A line of TREC text had the wrong shape
    MalformedLine {
        /// "qrels" or "run"
        kind: &'static str,
        /// One-based line number
        line: usize,
        /// Reason for invalidity
        reason: String,
    },
    /// Reading or writing failed
    Io {
        /// The operation that failed
        operation: &'static str,
        /// Error message
        message: String,
    },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumns {
                kind,
                missing,
                found,
            } => {
                write!(
                    f,
                    "unknown {kind} format: table missing columns: [{}] (found [{}])",
                    missing.join(", "),
                    found.join(", ")
                )
            }
            Self::InvalidCell {
                kind,
                row,
                column,
                reason,
            } => {
                write!(f, "invalid {kind} cell at row {row}, column '{column}': {reason}")
            }
            Self::MalformedLine { kind, line, reason } => {
                write!(f, "malformed {kind} line {line}: {reason}")
            }
            Self::Io { operation, message } => {
                write!(f, "I/O error during {operation}: {message}")
            }
        }
    }
}

impl std::error::Error for FormatError {}

impl FormatError {
    /// Creates an `Io` error from a standard I/O error.
    #[must_use]
    pub fn io(operation: &'static str, err: &std::io::Error) -> Self {
        Self::Io {
            operation,
            message: err.to_string(),
        }
    }
}
