//! Configuration for the subprocess provider and runtime-defined measures.

use std::path::PathBuf;

use ir_eval::{QREL_COLUMNS, RUN_COLUMNS};

/// Environment variable holding the path of the `trec_eval` executable.
pub const TREC_EVAL_ENV: &str = "IR_EVAL_TREC_EVAL";

/// Configuration for invoking the `trec_eval` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrecEvalConfig {
    /// Executable to run.
    ///
    /// Default: `trec_eval`, resolved through `PATH`
    pub binary: PathBuf,

    /// Flag that sets the minimum relevance level.
    ///
    /// Default: `-l`
    pub relevance_flag: String,

    /// Arguments passed before the measure list, after `-q`.
    ///
    /// Default: empty
    pub extra_args: Vec<String>,
}

impl Default for TrecEvalConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("trec_eval"),
            relevance_flag: "-l".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl TrecEvalConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration whose executable comes from `IR_EVAL_TREC_EVAL`, if set.
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::default();
        match std::env::var_os(TREC_EVAL_ENV) {
            Some(path) if !path.is_empty() => config.with_binary(path),
            _ => config,
        }
    }

    /// Sets the executable.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the relevance-level flag.
    #[must_use]
    pub fn with_relevance_flag(mut self, flag: impl Into<String>) -> Self {
        self.relevance_flag = flag.into();
        self
    }

    /// Appends an extra argument.
    #[must_use]
    pub fn with_extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }
}

/// Options for measures defined at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineOptions {
    /// Whether the measure accepts a `cutoff` (and so `@k`).
    ///
    /// The run is truncated to the top `cutoff` documents per query before
    /// the implementation sees it. Default: true
    pub support_cutoff: bool,

    /// Run columns the implementation reads.
    ///
    /// Default: `query_id`, `doc_id`, `score`
    pub run_inputs: Vec<String>,

    /// Qrels columns the implementation reads.
    ///
    /// Default: `query_id`, `doc_id`, `relevance`
    pub qrel_inputs: Vec<String>,

    /// Display name.
    pub pretty_name: Option<String>,

    /// One-line description.
    pub short_desc: Option<String>,
}

impl Default for DefineOptions {
    fn default() -> Self {
        Self {
            support_cutoff: true,
            run_inputs: RUN_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
            qrel_inputs: QREL_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
            pretty_name: None,
            short_desc: None,
        }
    }
}

impl DefineOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the `cutoff` parameter.
    #[must_use]
    pub const fn with_support_cutoff(mut self, support_cutoff: bool) -> Self {
        self.support_cutoff = support_cutoff;
        self
    }

    /// Sets the run columns the implementation reads.
    #[must_use]
    pub fn with_run_inputs<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_inputs = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the qrels columns the implementation reads.
    #[must_use]
    pub fn with_qrel_inputs<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.qrel_inputs = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_pretty_name(mut self, pretty_name: impl Into<String>) -> Self {
        self.pretty_name = Some(pretty_name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_short_desc(mut self, short_desc: impl Into<String>) -> Self {
        self.short_desc = Some(short_desc.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = TrecEvalConfig::default();
        assert_eq!(config.binary, PathBuf::from("trec_eval"));
        assert_eq!(config.relevance_flag, "-l");
        assert!(config.extra_args.is_empty());
    }

    #[test]
    fn builder_pattern() {
        let config = TrecEvalConfig::new()
            .with_binary("/opt/trec_eval/trec_eval")
            .with_relevance_flag("-L")
            .with_extra_arg("-n");

        assert_eq!(config.binary, PathBuf::from("/opt/trec_eval/trec_eval"));
        assert_eq!(config.relevance_flag, "-L");
        assert_eq!(config.extra_args, vec!["-n".to_string()]);
    }

    #[test]
    fn default_define_options() {
        let options = DefineOptions::default();
        assert!(options.support_cutoff);
        assert_eq!(options.run_inputs, ["query_id", "doc_id", "score"]);
        assert_eq!(options.qrel_inputs, ["query_id", "doc_id", "relevance"]);
        assert!(options.pretty_name.is_none());
    }

    #[test]
    fn define_options_builder() {
        let options = DefineOptions::new()
            .with_support_cutoff(false)
            .with_run_inputs(["query_id", "clicked"])
            .with_qrel_inputs(["query_id"])
            .with_pretty_name("Clicks")
            .with_short_desc("Clicked documents");

        assert!(!options.support_cutoff);
        assert_eq!(options.run_inputs, ["query_id", "clicked"]);
        assert_eq!(options.qrel_inputs, ["query_id"]);
        assert_eq!(options.pretty_name.as_deref(), Some("Clicks"));
        assert_eq!(options.short_desc.as_deref(), Some("Clicked documents"));
    }
}
