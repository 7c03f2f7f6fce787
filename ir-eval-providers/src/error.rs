//! Custom error types for provider dispatch and evaluation.

use std::fmt;

use ir_eval::{FormatError, ValidationError};

/// A provider that would have supported a measure had it been available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The provider's name
    pub provider: String,
    /// How to make the provider available, if it knows
    pub install: Option<String>,
}

/// Errors that can occur while dispatching or evaluating measures.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// No available provider supports one or more requested measures.
    Unsupported {
        /// Canonical strings of the unassigned measures, sorted
        measures: Vec<String>,
        /// Unavailable providers that support at least one of them
        candidates: Vec<Candidate>,
    },
    /// A provider was called directly but is not available.
    Unavailable {
        /// The provider's name
        provider: String,
        /// Install guidance, if the provider has any
        install: Option<String>,
    },
    /// A measure failed validation.
    Validation(ValidationError),
    /// Qrels or run data could not be read.
    Format(FormatError),
    /// An external backend failed.
    Backend {
        /// The provider's name
        provider: String,
        /// What went wrong
        message: String,
    },
    /// A runtime-defined measure needs a column its input lacks.
    MissingColumn {
        /// The measure's canonical string
        measure: String,
        /// "qrels" or "run"
        input: &'static str,
        /// The absent column
        column: String,
    },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported {
                measures,
                candidates,
            } => {
                write!(f, "unsupported measures [{}].", measures.join(", "))?;
                if !candidates.is_empty() {
                    if measures.len() == 1 {
                        write!(f, " the following providers would support this measure:")?;
                    } else {
                        write!(
                            f,
                            " the following providers would support at least one of these measures:"
                        )?;
                    }
                    for candidate in candidates {
                        match &candidate.install {
                            Some(install) => write!(f, "\n - {} ({install})", candidate.provider)?,
                            None => write!(f, "\n - {}", candidate.provider)?,
                        }
                    }
                }
                Ok(())
            }
            Self::Unavailable { provider, install } => {
                write!(f, "provider '{provider}' is not available")?;
                if let Some(install) = install {
                    write!(f, "; {install}")?;
                }
                Ok(())
            }
            Self::Validation(e) => write!(f, "{e}"),
            Self::Format(e) => write!(f, "{e}"),
            Self::Backend { provider, message } => {
                write!(f, "provider '{provider}' failed: {message}")
            }
            Self::MissingColumn {
                measure,
                input,
                column,
            } => {
                write!(
                    f,
                    "{measure} requires column '{column}' in the {input}; supply it as a table with that column"
                )
            }
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            Self::Format(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for ProviderError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<FormatError> for ProviderError {
    fn from(err: FormatError) -> Self {
        Self::Format(err)
    }
}

impl ProviderError {
    /// Creates an `Unsupported` error.
    #[must_use]
    pub fn unsupported<I, S>(measures: I, candidates: Vec<Candidate>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut measures: Vec<String> = measures.into_iter().map(Into::into).collect();
        measures.sort();
        Self::Unsupported {
            measures,
            candidates,
        }
    }

    /// Creates an `Unavailable` error.
    #[must_use]
    pub fn unavailable(provider: impl Into<String>, install: Option<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            install,
        }
    }

    /// Creates a `Backend` error.
    #[must_use]
    pub fn backend(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a `MissingColumn` error.
    #[must_use]
    pub fn missing_column(
        measure: impl Into<String>,
        input: &'static str,
        column: impl Into<String>,
    ) -> Self {
        Self::MissingColumn {
            measure: measure.into(),
            input,
            column: column.into(),
        }
    }

    /// Returns true if a requested measure had no available provider.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Returns true if a provider was not available.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns true if a measure failed validation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_single_measure() {
        let err = ProviderError::unsupported(["P@5"], Vec::new());
        assert_eq!(err.to_string(), "unsupported measures [P@5].");
        assert!(err.is_unsupported());
    }

    #[test]
    fn unsupported_lists_candidates() {
        let err = ProviderError::unsupported(
            ["nDCG@10", "AP"],
            vec![
                Candidate {
                    provider: "trec_eval".to_string(),
                    install: Some("install trec_eval".to_string()),
                },
                Candidate {
                    provider: "other".to_string(),
                    install: None,
                },
            ],
        );
        assert_eq!(
            err.to_string(),
            "unsupported measures [AP, nDCG@10]. the following providers would support at least one of these measures:\n - trec_eval (install trec_eval)\n - other"
        );
    }

    #[test]
    fn unavailable_includes_guidance() {
        let err = ProviderError::unavailable("trec_eval", Some("set IR_EVAL_TREC_EVAL".to_string()));
        assert!(err.is_unavailable());
        assert_eq!(
            err.to_string(),
            "provider 'trec_eval' is not available; set IR_EVAL_TREC_EVAL"
        );
    }

    #[test]
    fn validation_converts() {
        let err: ProviderError = ValidationError::MissingParam {
            measure: "P".to_string(),
            param: "cutoff".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn missing_column_display() {
        let err = ProviderError::missing_column("Clicks", "run", "clicked");
        assert!(err.to_string().contains("column 'clicked' in the run"));
    }
}
