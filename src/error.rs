//! Errors shared by every stage of the pipeline.
//!
//! Compilation is fail-fast: the first problem found by any pass becomes the
//! one `CompileError` returned to the caller, carrying only what is needed to
//! locate it.

use snafu::Snafu;
use std::path::PathBuf;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
    #[snafu(display("Syntax error: line {line}"))]
    Syntax { line: usize },

    #[snafu(display("Semantic error: line {line}"))]
    Semantic { line: usize },

    #[snafu(display("File not found"))]
    InputNotFound { path: PathBuf },

    #[snafu(display("specify an output dir instead of file"))]
    NotADirectory { path: PathBuf },

    #[snafu(display("{message}: line {line}"))]
    Lexical { line: usize, message: String },

    #[snafu(display("Invalid token stream: record {record}"))]
    InvalidTokenStream { record: usize },

    #[snafu(display("{}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CompileError {
    /// Line the error points at, if it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax { line } | Self::Semantic { line } | Self::Lexical { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }
}
