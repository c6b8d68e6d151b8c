//! Build failure reporting for the Ehlit compiler.

mod reporter;

pub use reporter::SourceMap;

use colored::Colorize;
use std::fmt;

/// Severity of a recorded failure.
///
/// Severities are ordered: anything above `Warning` aborts code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "{}", "warning".yellow().bold()),
            Severity::Error => write!(f, "{}", "error".red().bold()),
            Severity::Fatal => write!(f, "{}", "fatal".red().bold()),
        }
    }
}

/// A single failure recorded while building a source file.
///
/// `pos` is a byte offset in `file`; line and column are resolved against the
/// registered sources only when the failure is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub severity: Severity,
    pub pos: usize,
    pub msg: String,
    pub file: String,
}

impl Failure {
    pub fn new(severity: Severity, pos: usize, msg: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            severity,
            pos,
            msg: msg.into(),
            file: file.into(),
        }
    }

    /// Render this failure with its source position resolved.
    pub fn display(&self, sources: &SourceMap) -> String {
        match sources.line_col(&self.file, self.pos) {
            Some((line, col)) => {
                format!("{}:{}:{}: {}: {}", self.file, line, col, self.severity, self.msg)
            }
            None => format!("{}:@{}: {}: {}", self.file, self.pos, self.severity, self.msg),
        }
    }
}

/// Aggregated result of a failed build.
#[derive(Debug)]
pub struct BuildError {
    pub failures: Vec<Failure>,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

impl std::error::Error for BuildError {}

impl BuildError {
    pub fn new(failures: Vec<Failure>) -> Self {
        Self { failures }
    }

    pub fn max_severity(&self) -> Severity {
        self.failures
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.severity > Severity::Warning)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count()
    }

    /// The one-line build report, e.g. "build finished with 2 errors and 1 warnings".
    pub fn summary(&self) -> String {
        let errors = self.error_count();
        let warnings = self.warning_count();
        if warnings == 0 {
            format!("build finished with {} errors", errors)
        } else if errors == 0 {
            format!("build finished with {} warnings", warnings)
        } else {
            format!("build finished with {} errors and {} warnings", errors, warnings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn summary_reports_both_categories() {
        let err = BuildError::new(vec![
            Failure::new(Severity::Error, 0, "boom", "a.eh"),
            Failure::new(Severity::Warning, 4, "meh", "a.eh"),
        ]);
        assert_eq!(err.summary(), "build finished with 1 errors and 1 warnings");
        assert_eq!(err.max_severity(), Severity::Error);
    }

    #[test]
    fn summary_omits_missing_category() {
        let err = BuildError::new(vec![Failure::new(Severity::Warning, 0, "meh", "a.eh")]);
        assert_eq!(err.summary(), "build finished with 1 warnings");
    }
}
