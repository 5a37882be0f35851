//! File-level wrapper around [`compile`](crate::compile).

use std::fs;
use std::path::{Path, PathBuf};

use snafu::ResultExt;
use tracing::info;

use crate::Outcome;
use crate::error::{CompileResult, ReadSourceSnafu, WriteOutputSnafu};

/// Extension of the emitted IR file.
pub const OUTPUT_EXTENSION: &str = "ll";

/// What a file translation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
  pub output: PathBuf,
  pub outcome: Outcome,
}

/// Replace the final extension of `input` with `.ll`.
pub fn output_path(input: &Path) -> PathBuf {
  input.with_extension(OUTPUT_EXTENSION)
}

/// Translate `input` and write the result beside it. The output file is
/// written even when the source has a syntax error.
pub fn compile_file(input: &Path) -> CompileResult<Report> {
  let source = fs::read_to_string(input).context(ReadSourceSnafu { path: input })?;
  let translation = crate::compile(&source);

  let output = output_path(input);
  fs::write(&output, &translation.text).context(WriteOutputSnafu { path: &output })?;
  info!(
    input = %input.display(),
    output = %output.display(),
    lines = translation.text.lines().count(),
    outcome = ?translation.outcome,
    "translation written"
  );

  Ok(Report {
    output,
    outcome: translation.outcome,
  })
}
