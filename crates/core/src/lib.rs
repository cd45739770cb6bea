//! Core shared types and errors (renderer-agnostic).
//! Used by both text parsers: fatal errors plus non-fatal parse warnings.

use std::{fmt, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A keyword that needs an argument had none (e.g. `usemtl` alone on a line).
    #[error("Keyword '{keyword}' on line {line} requires an argument")]
    MissingArgument { keyword: String, line: usize },

    #[error("Failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Non-fatal anomaly found while parsing. The parse keeps going.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number.
    pub line: usize,
    pub kind: WarningKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WarningKind {
    UnhandledKeyword(String),
    /// A numeric token could not be parsed; 0 was used instead.
    MalformedNumber(String),
    MissingComponents { expected: usize, found: usize },
    /// Index token that is not an integer.
    MalformedIndex(String),
    IndexOutOfRange { index: i64, pool_len: usize },
    /// Face with fewer than three corners.
    DegenerateFace { corners: usize },
    /// Material property seen before any `newmtl`.
    PropertyOutsideMaterial(String),
    /// Attribute stream whose corner count disagrees with the positions; dropped.
    InconsistentStream { stream: &'static str },
}

impl ParseWarning {
    pub fn new(line: usize, kind: WarningKind) -> Self {
        Self { line, kind }
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match &self.kind {
            WarningKind::UnhandledKeyword(k) => write!(f, "unhandled keyword '{k}'"),
            WarningKind::MalformedNumber(t) => write!(f, "malformed number '{t}'"),
            WarningKind::MissingComponents { expected, found } => {
                write!(f, "expected {expected} components, found {found}")
            }
            WarningKind::MalformedIndex(t) => write!(f, "malformed index '{t}'"),
            WarningKind::IndexOutOfRange { index, pool_len } => {
                write!(f, "index {index} out of range (pool length {pool_len})")
            }
            WarningKind::DegenerateFace { corners } => {
                write!(f, "face with {corners} corners skipped")
            }
            WarningKind::PropertyOutsideMaterial(k) => {
                write!(f, "'{k}' appears before any newmtl")
            }
            WarningKind::InconsistentStream { stream } => {
                write!(f, "{stream} stream does not match position count; dropped")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_display_names_line() {
        let w = ParseWarning::new(7, WarningKind::UnhandledKeyword("vp".into()));
        assert_eq!(w.to_string(), "line 7: unhandled keyword 'vp'");
    }

    #[test]
    fn missing_argument_message() {
        let e = CoreError::MissingArgument {
            keyword: "usemtl".into(),
            line: 3,
        };
        assert_eq!(e.to_string(), "Keyword 'usemtl' on line 3 requires an argument");
    }
}
