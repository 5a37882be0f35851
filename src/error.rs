//! Shared error utilities used across the translation pipeline.
//!
//! The language only knows one diagnostic: a syntax error pinned to a source
//! line. The remaining variants belong to the file driver and never reach the
//! emitted program.

use std::io;
use std::path::PathBuf;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  #[snafu(display("Line {line}: syntax error"))]
  Syntax { line: usize },

  #[snafu(display("usage: {program} <input.my>"))]
  Usage { program: String },

  #[snafu(display("failed to read {}: {source}", path.display()))]
  ReadSource { path: PathBuf, source: io::Error },

  #[snafu(display("failed to write {}: {source}", path.display()))]
  WriteOutput { path: PathBuf, source: io::Error },
}

impl CompileError {
  /// Construct a syntax error anchored at a 1-based source line.
  pub fn at(line: usize) -> Self {
    Self::Syntax { line }
  }

  /// Line number carried by a syntax error.
  pub fn line(&self) -> Option<usize> {
    match self {
      Self::Syntax { line } => Some(*line),
      _ => None,
    }
  }
}
