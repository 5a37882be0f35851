//! Crate root: wires together the translation pipeline.
//!
//! The stages are small and composable:
//! - `tokenizer` splits source text into numbered token lines.
//! - `context` owns per-run state: id counters, declared variables, output.
//! - `expr` and `choose` lower expressions into instructions.
//! - `statement` dispatches lines and carves out curly-brace bodies.
//! - `codegen` defines the instruction set and renders the module text.
//! - `driver` reads a source file and writes the translated `.ll` next to it.

pub mod choose;
pub mod codegen;
pub mod context;
pub mod driver;
pub mod error;
pub mod expr;
pub mod statement;
pub mod tokenizer;

use tracing::warn;

pub use codegen::Instr;
pub use context::CompilationContext;
pub use error::{CompileError, CompileResult};

/// How a translation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Compiled,
  /// The output is the error-reporting program for this line.
  SyntaxError { line: usize },
}

/// The text written for one source program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
  pub text: String,
  pub outcome: Outcome,
}

/// Generate the body of `main` for a source program.
pub fn generate(source: &str) -> CompileResult<Vec<Instr>> {
  let lines = tokenizer::tokenize(source);
  let mut ctx = CompilationContext::new();
  statement::prescan(&mut ctx, &lines)?;
  statement::generate(&mut ctx, &lines)?;
  Ok(ctx.into_instructions())
}

/// Translate a source program. A syntax error anywhere replaces the whole
/// output with a program that only reports the failing line.
pub fn compile(source: &str) -> Translation {
  match generate(source) {
    Ok(body) => Translation {
      text: codegen::render(&body),
      outcome: Outcome::Compiled,
    },
    Err(err) => {
      let line = err.line().unwrap_or_default();
      warn!(line, "syntax error, discarding generated code");
      Translation {
        text: codegen::error_program(line),
        outcome: Outcome::SyntaxError { line },
      }
    }
  }
}
