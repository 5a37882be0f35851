//! Statement generation over a sequence of tokenized lines.
//!
//! A line is dispatched on its leading keyword: `print`, `if`, `while`, or an
//! assignment when the second token is `=`. `if` and `while` own a curly-brace
//! body which [`extract_block`] cuts out of the following lines and hands back
//! as a fresh line sequence, together with how many lines it consumed, so the
//! caller advances its own cursor past the body.

use tracing::{debug, trace};

use crate::codegen::{Cmp, Instr, Label};
use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use crate::expr::{evaluate, parenthesized};
use crate::tokenizer::{Line, is_identifier};

/// Where the cursor stands after one statement.
#[derive(Debug, Default)]
struct Step {
  /// Lines after the current one that the statement used up.
  consumed: usize,
  /// Tokens left on the last consumed line, still to be dispatched.
  rest: Option<Line>,
}

/// A curly-brace body cut out of the line sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
  pub body: Vec<Line>,
  pub consumed: usize,
  pub rest: Option<Line>,
}

/// Allocate every variable the program mentions, so forward references work.
pub fn prescan(ctx: &mut CompilationContext, lines: &[Line]) -> CompileResult<()> {
  for line in lines {
    for token in line.tokens.iter().filter(|token| is_identifier(token)) {
      ctx.declare(token, line.number)?;
    }
  }
  Ok(())
}

/// Generate code for a line sequence, recursing into block bodies.
pub fn generate(ctx: &mut CompilationContext, lines: &[Line]) -> CompileResult<()> {
  let mut cursor = 0;
  let mut carried: Option<Line> = None;

  loop {
    let line = match carried.take() {
      Some(line) => line,
      None => {
        let Some(line) = lines.get(cursor) else {
          break;
        };
        cursor += 1;
        line.clone()
      }
    };
    let step = statement(ctx, &line, &lines[cursor..])?;
    cursor += step.consumed;
    carried = step.rest;
  }
  Ok(())
}

fn statement(
  ctx: &mut CompilationContext,
  line: &Line,
  following: &[Line],
) -> CompileResult<Step> {
  if line.is_blank() {
    return Ok(Step::default());
  }

  let number = line.number;
  let tokens = &line.tokens;
  if tokens.len() < 3 {
    return Err(CompileError::at(number));
  }
  check_parentheses(tokens, number)?;

  match tokens[0].as_str() {
    "print" => {
      debug!(line = number, "print");
      print(ctx, tokens, number)?;
      Ok(Step::default())
    }
    "if" => {
      debug!(line = number, "if");
      if_statement(ctx, line, following)
    }
    "while" => {
      debug!(line = number, "while");
      while_statement(ctx, line, following)
    }
    _ if tokens[1] == "=" => {
      debug!(line = number, var = %tokens[0], "assignment");
      let slot = ctx.declare(&tokens[0], number)?;
      let value = evaluate(ctx, &tokens[2..], number)?;
      ctx.emit(Instr::Store { value, slot });
      Ok(Step::default())
    }
    _ => Err(CompileError::at(number)),
  }
}

/// Opening and closing parentheses on a line must balance.
fn check_parentheses(tokens: &[String], line: usize) -> CompileResult<()> {
  let balance = tokens.iter().fold(0isize, |acc, token| match token.as_str() {
    "(" => acc + 1,
    ")" => acc - 1,
    _ => acc,
  });
  if balance != 0 {
    return Err(CompileError::at(line));
  }
  Ok(())
}

/// `print ( expr )`
fn print(ctx: &mut CompilationContext, tokens: &[String], line: usize) -> CompileResult<()> {
  let last = tokens.len() - 1;
  if tokens[1] != "(" || tokens[last] != ")" {
    return Err(CompileError::at(line));
  }
  let value = evaluate(ctx, &tokens[2..last], line)?;
  ctx.emit(Instr::Print(value));
  Ok(())
}

/// Evaluate a `( cond )` header and emit the non-zero test.
fn condition(ctx: &mut CompilationContext, line: &Line) -> CompileResult<(usize, usize)> {
  let (cond, after) = parenthesized(&line.tokens, 1, line.number)?;
  let value = evaluate(ctx, cond, line.number)?;
  let test = ctx.counters.next_temp();
  ctx.emit(Instr::Icmp {
    dest: test,
    cmp: Cmp::Ne,
    value,
  });
  Ok((test, after))
}

fn if_statement(
  ctx: &mut CompilationContext,
  line: &Line,
  following: &[Line],
) -> CompileResult<Step> {
  let id = ctx.counters.next_if();
  trace!(id, line = line.number, "if namespace");

  let (test, after) = condition(ctx, line)?;
  ctx.emit(Instr::Branch {
    cond: test,
    then_label: Label::IfBody(id),
    else_label: Label::IfEnd(id),
  });
  ctx.emit(Instr::Label(Label::IfBody(id)));

  let block = extract_block(line.with_tokens(line.tokens[after..].to_vec()), following)?;
  generate(ctx, &block.body)?;

  ctx.emit(Instr::Jump(Label::IfEnd(id)));
  ctx.emit(Instr::Label(Label::IfEnd(id)));
  Ok(Step {
    consumed: block.consumed,
    rest: block.rest,
  })
}

fn while_statement(
  ctx: &mut CompilationContext,
  line: &Line,
  following: &[Line],
) -> CompileResult<Step> {
  let id = ctx.counters.next_while();
  trace!(id, line = line.number, "while namespace");

  ctx.emit(Instr::Jump(Label::WhileCond(id)));
  ctx.emit(Instr::Label(Label::WhileCond(id)));
  let (test, after) = condition(ctx, line)?;
  ctx.emit(Instr::Branch {
    cond: test,
    then_label: Label::WhileBody(id),
    else_label: Label::WhileEnd(id),
  });
  ctx.emit(Instr::Label(Label::WhileBody(id)));

  let block = extract_block(line.with_tokens(line.tokens[after..].to_vec()), following)?;
  generate(ctx, &block.body)?;

  // back edge to the same condition block
  ctx.emit(Instr::Jump(Label::WhileCond(id)));
  ctx.emit(Instr::Label(Label::WhileEnd(id)));
  Ok(Step {
    consumed: block.consumed,
    rest: block.rest,
  })
}

/// Tracks whether a `{` inside a body opens the block of an inner `if`/`while`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
  Idle,
  /// Inside an inner header; counts open parentheses.
  Condition(usize),
  AwaitOpener,
}

impl Header {
  fn advance(self, token: &str, starts_statement: bool) -> Self {
    match (self, token) {
      (_, "if" | "while") if starts_statement => Self::Condition(0),
      (Self::Condition(depth), "(") => Self::Condition(depth + 1),
      (Self::Condition(1), ")") => Self::AwaitOpener,
      (Self::Condition(depth), ")") => Self::Condition(depth.saturating_sub(1)),
      (Self::Condition(depth), _) => Self::Condition(depth),
      (Self::AwaitOpener, _) | (Self::Idle, _) => Self::Idle,
    }
  }
}

/// Cut the body opened by `header_rest` (what follows a header's condition)
/// out of `following`.
///
/// The body must open with `{`, either right after the condition or at the
/// start of the next line. Lines are re-batched without the enclosing braces,
/// keeping their source line numbers. Any other `{` in the body is rejected.
pub fn extract_block(header_rest: Line, following: &[Line]) -> CompileResult<Block> {
  let header_line = header_rest.number;
  let mut consumed = 0;
  let opener = if header_rest.is_blank() {
    let Some(next) = following.first() else {
      return Err(CompileError::at(header_line));
    };
    consumed = 1;
    next.clone()
  } else {
    header_rest
  };
  if opener.first() != Some("{") {
    return Err(CompileError::at(header_line));
  }

  let mut body = Vec::new();
  let mut batch: Vec<String> = Vec::new();
  let mut depth = 0usize;
  let mut header = Header::Idle;
  let mut number = opener.number;
  let mut tokens: &[String] = &opener.tokens[1..];
  // true at each line start and right after an inner block closes
  let mut starts_statement = true;

  loop {
    for (idx, token) in tokens.iter().enumerate() {
      let mut closes_inner = false;
      match token.as_str() {
        "}" if depth == 0 => {
          body.push(Line::new(number, std::mem::take(&mut batch)));
          let rest = tokens[idx + 1..].to_vec();
          return Ok(Block {
            body,
            consumed,
            rest: (!rest.is_empty()).then(|| Line::new(number, rest)),
          });
        }
        "}" => {
          depth -= 1;
          closes_inner = depth == 0;
        }
        "{" if header == Header::AwaitOpener => depth += 1,
        "{" => return Err(CompileError::at(number)),
        _ => {}
      }
      header = header.advance(token, starts_statement);
      starts_statement = closes_inner;
      batch.push(token.clone());
    }

    body.push(Line::new(number, std::mem::take(&mut batch)));
    // input ran out before the closing brace
    let Some(next) = following.get(consumed) else {
      return Err(CompileError::at(number));
    };
    consumed += 1;
    starts_statement = true;
    number = next.number;
    tokens = &next.tokens;
  }
}
