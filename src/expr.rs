//! Expression evaluation: flat tokens in, instructions out.
//!
//! An expression goes through a fixed pipeline:
//! 1. unary minus folding (`-` glued onto the following token),
//! 2. rejection of empty `()` groups,
//! 3. expansion of every `choose(...)` call into the operand it computes,
//! 4. shunting-yard conversion to postfix,
//! 5. a single postfix pass that emits one instruction per operator.
//!
//! The result is an [`Operand`] naming either an immediate or the temporary
//! that holds the value.

use tracing::debug;

use crate::choose::choose;
use crate::codegen::{BinaryOp, Instr, Operand};
use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{is_identifier, is_operator, looks_numeric, parse_number};

/// An operand before it has been brought into a register.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
  Ready(Operand),
  Var(String),
}

/// Classified expression element.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
  Value(Value),
  Op(BinaryOp),
  Open,
  Close,
}

/// Evaluate `tokens`, emitting the instructions that compute it.
pub fn evaluate(
  ctx: &mut CompilationContext,
  tokens: &[String],
  line: usize,
) -> CompileResult<Operand> {
  match tokens {
    [] => Err(CompileError::at(line)),
    [token] => evaluate_single(ctx, token, line),
    _ => {
      let folded = fold_unary_minus(tokens, line)?;
      reject_empty_groups(&folded, line)?;
      let terms = expand(ctx, &folded, line)?;
      let postfix = to_postfix(terms, line)?;
      match run_postfix(ctx, postfix, line)? {
        Value::Ready(operand) => Ok(operand),
        Value::Var(name) => ctx.load_var(&name, line),
      }
    }
  }
}

/// A lone literal is returned as is; a lone variable is loaded.
fn evaluate_single(
  ctx: &mut CompilationContext,
  token: &str,
  line: usize,
) -> CompileResult<Operand> {
  if looks_numeric(token) {
    return Ok(Operand::Literal(parse_number(token, line)?));
  }
  ctx.load_var(token, line)
}

/// Merge a `-` that starts an operand into the token after it.
fn fold_unary_minus(tokens: &[String], line: usize) -> CompileResult<Vec<String>> {
  let mut out: Vec<String> = Vec::with_capacity(tokens.len());
  let mut iter = tokens.iter();

  while let Some(token) = iter.next() {
    let unary = token == "-"
      && out
        .last()
        .is_none_or(|prev| is_operator(prev) || prev == "(" || prev == ",");
    if unary {
      let next = iter.next().ok_or_else(|| CompileError::at(line))?;
      out.push(format!("-{next}"));
    } else {
      out.push(token.clone());
    }
  }
  Ok(out)
}

/// Every `(` must be followed by something other than `)`.
fn reject_empty_groups(tokens: &[String], line: usize) -> CompileResult<()> {
  for (idx, token) in tokens.iter().enumerate() {
    if token == "(" && tokens.get(idx + 1).is_none_or(|next| next == ")") {
      return Err(CompileError::at(line));
    }
  }
  Ok(())
}

/// Classify tokens, replacing each `choose(...)` call with its result.
fn expand(
  ctx: &mut CompilationContext,
  tokens: &[String],
  line: usize,
) -> CompileResult<Vec<Term>> {
  let mut terms = Vec::with_capacity(tokens.len());
  let mut pos = 0;

  while pos < tokens.len() {
    if tokens[pos] == "choose" {
      let (args, next) = parenthesized(tokens, pos + 1, line)?;
      let value = choose(ctx, args, line)?;
      terms.push(Term::Value(Value::Ready(value)));
      pos = next;
      continue;
    }
    terms.push(classify(&tokens[pos], line)?);
    pos += 1;
  }
  Ok(terms)
}

fn classify(token: &str, line: usize) -> CompileResult<Term> {
  if let Some(op) = BinaryOp::from_token(token) {
    return Ok(Term::Op(op));
  }
  match token {
    "(" => Ok(Term::Open),
    ")" => Ok(Term::Close),
    _ if looks_numeric(token) => Ok(Term::Value(Value::Ready(Operand::Literal(
      parse_number(token, line)?,
    )))),
    _ if is_identifier(token) => Ok(Term::Value(Value::Var(token.to_string()))),
    _ => Err(CompileError::at(line)),
  }
}

/// Return the tokens strictly inside the group opening at `start`, plus the
/// index just past its closing `)`.
pub fn parenthesized(
  tokens: &[String],
  start: usize,
  line: usize,
) -> CompileResult<(&[String], usize)> {
  if tokens.get(start).map(String::as_str) != Some("(") {
    return Err(CompileError::at(line));
  }

  let mut depth = 0usize;
  for (idx, token) in tokens.iter().enumerate().skip(start + 1) {
    match token.as_str() {
      "(" => depth += 1,
      ")" if depth == 0 => return Ok((&tokens[start + 1..idx], idx + 1)),
      ")" => depth -= 1,
      _ => {}
    }
  }
  Err(CompileError::at(line))
}

/// Shunting-yard: equal precedence pops first, so operators associate left.
fn to_postfix(terms: Vec<Term>, line: usize) -> CompileResult<Vec<Term>> {
  let mut output = Vec::with_capacity(terms.len());
  let mut stack: Vec<Term> = Vec::new();

  for term in terms {
    match term {
      Term::Value(_) => output.push(term),
      Term::Op(op) => {
        while let Some(Term::Op(top)) = stack.last()
          && top.precedence() >= op.precedence()
        {
          output.push(Term::Op(*top));
          stack.pop();
        }
        stack.push(term);
      }
      Term::Open => stack.push(term),
      Term::Close => loop {
        match stack.pop() {
          Some(Term::Open) => break,
          Some(other) => output.push(other),
          None => return Err(CompileError::at(line)),
        }
      },
    }
  }

  while let Some(term) = stack.pop() {
    if term == Term::Open {
      return Err(CompileError::at(line));
    }
    output.push(term);
  }
  Ok(output)
}

fn run_postfix(
  ctx: &mut CompilationContext,
  postfix: Vec<Term>,
  line: usize,
) -> CompileResult<Value> {
  let mut operands: Vec<Value> = Vec::new();

  for term in postfix {
    match term {
      Term::Value(value) => operands.push(value),
      Term::Op(op) => {
        let (Some(rhs), Some(lhs)) = (operands.pop(), operands.pop()) else {
          return Err(CompileError::at(line));
        };
        let rhs = resolve(ctx, rhs, line)?;
        let lhs = resolve(ctx, lhs, line)?;
        if op == BinaryOp::Div && rhs == Operand::Literal(0) {
          debug!(line, "division by literal zero");
          return Err(CompileError::at(line));
        }
        let dest = ctx.counters.next_temp();
        ctx.emit(Instr::Binary { dest, op, lhs, rhs });
        operands.push(Value::Ready(Operand::Temp(dest)));
      }
      Term::Open | Term::Close => return Err(CompileError::at(line)),
    }
  }

  match (operands.pop(), operands.is_empty()) {
    (Some(result), true) => Ok(result),
    _ => Err(CompileError::at(line)),
  }
}

fn resolve(ctx: &mut CompilationContext, value: Value, line: usize) -> CompileResult<Operand> {
  match value {
    Value::Ready(operand) => Ok(operand),
    Value::Var(name) => ctx.load_var(&name, line),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenizer::tokenize_line;

  fn eval(ctx: &mut CompilationContext, src: &str) -> CompileResult<Operand> {
    evaluate(ctx, &tokenize_line(src), 1)
  }

  fn rendered(ctx: &CompilationContext) -> Vec<String> {
    ctx.instructions().iter().map(ToString::to_string).collect()
  }

  #[test]
  fn literal_and_variable_alone() {
    let mut ctx = CompilationContext::new();
    assert_eq!(eval(&mut ctx, "42").unwrap(), Operand::Literal(42));
    assert!(ctx.instructions().is_empty());
    assert_eq!(eval(&mut ctx, "a").unwrap(), Operand::Temp(1));
    assert_eq!(rendered(&ctx)[2], "%t1 = load i32* %ar");
  }

  #[test]
  fn multiplication_binds_tighter() {
    let mut ctx = CompilationContext::new();
    assert_eq!(eval(&mut ctx, "2 + 3 * 4").unwrap(), Operand::Temp(2));
    assert_eq!(rendered(&ctx), ["%t1 = mul i32 3, 4", "%t2 = add i32 2, %t1"]);
  }

  #[test]
  fn same_precedence_is_left_associative() {
    let mut ctx = CompilationContext::new();
    eval(&mut ctx, "10 - 4 - 3").unwrap();
    assert_eq!(rendered(&ctx), ["%t1 = sub i32 10, 4", "%t2 = sub i32 %t1, 3"]);
  }

  #[test]
  fn parentheses_group() {
    let mut ctx = CompilationContext::new();
    eval(&mut ctx, "(2 + 3) * 4").unwrap();
    assert_eq!(rendered(&ctx), ["%t1 = add i32 2, 3", "%t2 = mul i32 %t1, 4"]);
  }

  #[test]
  fn variables_load_right_operand_first() {
    let mut ctx = CompilationContext::new();
    ctx.declare("a", 1).unwrap();
    ctx.declare("b", 1).unwrap();
    eval(&mut ctx, "a / b").unwrap();
    assert_eq!(
      &rendered(&ctx)[4..],
      [
        "%t1 = load i32* %br",
        "%t2 = load i32* %ar",
        "%t3 = sdiv i32 %t2, %t1"
      ]
    );
  }

  #[test]
  fn unary_minus_makes_negative_literals() {
    let mut ctx = CompilationContext::new();
    eval(&mut ctx, "-3 * -2").unwrap();
    assert_eq!(rendered(&ctx), ["%t1 = mul i32 -3, -2"]);

    let mut ctx = CompilationContext::new();
    assert_eq!(eval(&mut ctx, "- 7").unwrap(), Operand::Literal(-7));
    assert_eq!(eval(&mut ctx, "(5)").unwrap(), Operand::Literal(5));
  }

  #[test]
  fn negating_a_variable_is_rejected() {
    let mut ctx = CompilationContext::new();
    assert!(eval(&mut ctx, "1 + -x").is_err());
  }

  #[test]
  fn malformed_expressions_fail() {
    for src in ["1 +", "1 2", "()", "(1 + 2", "1 + 2)", "* 3", "1 + ( ) * 2", "4 / 0", "a = 1", "x , y"] {
      let mut ctx = CompilationContext::new();
      assert!(eval(&mut ctx, src).is_err(), "{src} should fail");
    }
  }

  #[test]
  fn division_by_zero_emits_no_arithmetic() {
    let mut ctx = CompilationContext::new();
    assert_eq!(eval(&mut ctx, "5 / 0").unwrap_err().line(), Some(1));
    assert!(ctx.instructions().is_empty());
  }

  #[test]
  fn any_spelling_of_literal_zero_divisor_is_rejected() {
    for src in ["5 / -0", "5 / 00", "x / 0"] {
      let mut ctx = CompilationContext::new();
      assert!(eval(&mut ctx, src).is_err(), "{src} should fail");
      assert!(!ctx.instructions().iter().any(|i| i.to_string().contains("sdiv")));
    }
    let mut ctx = CompilationContext::new();
    assert!(eval(&mut ctx, "5 / (0 + 0)").is_ok());
  }

  #[test]
  fn parenthesized_finds_matching_close() {
    let tokens = tokenize_line("( a * ( b + c ) ) { x");
    let (inner, next) = parenthesized(&tokens, 0, 1).unwrap();
    assert_eq!(inner.len(), 7);
    assert_eq!(tokens[next], "{");
    assert!(parenthesized(&tokens, 1, 1).is_err());
    assert!(parenthesized(&tokenize_line("( a"), 0, 1).is_err());
  }
}
