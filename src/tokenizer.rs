//! Lexical analysis: turns raw source text into numbered lines of tokens.
//!
//! The tokenizer is intentionally tiny. It splits on whitespace and on the
//! single-character punctuators of the language, keeps the punctuators as
//! tokens, and knows nothing about statements. Token classification is not
//! stored on the token; later stages re-derive it with the helpers below.

use crate::error::{CompileError, CompileResult};

/// Words that can never name a variable.
pub const KEYWORDS: [&str; 4] = ["if", "while", "print", "choose"];

/// Single-character tokens that also act as delimiters.
const PUNCTUATORS: [char; 11] = ['+', '-', '*', '/', '(', ')', '=', '{', '}', '#', ','];

/// One source line after tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
  /// 1-based line number in the source, used only for diagnostics.
  pub number: usize,
  pub tokens: Vec<String>,
}

impl Line {
  pub fn new(number: usize, tokens: Vec<String>) -> Self {
    Self { number, tokens }
  }

  pub fn is_blank(&self) -> bool {
    self.tokens.is_empty()
  }

  pub fn first(&self) -> Option<&str> {
    self.tokens.first().map(String::as_str)
  }

  /// Same line number, different tokens.
  pub fn with_tokens(&self, tokens: Vec<String>) -> Self {
    Self::new(self.number, tokens)
  }
}

/// Lex the whole source into lines, dropping comments.
pub fn tokenize(source: &str) -> Vec<Line> {
  source
    .lines()
    .enumerate()
    .map(|(idx, text)| Line::new(idx + 1, strip_comment(&tokenize_line(text))))
    .collect()
}

/// Split a single line; whitespace separates tokens and is discarded.
pub fn tokenize_line(text: &str) -> Vec<String> {
  let mut tokens = Vec::new();
  let mut current = String::new();

  for c in text.chars() {
    if c.is_whitespace() || PUNCTUATORS.contains(&c) {
      if !current.is_empty() {
        tokens.push(std::mem::take(&mut current));
      }
      if !c.is_whitespace() {
        tokens.push(c.to_string());
      }
      continue;
    }
    current.push(c);
  }

  if !current.is_empty() {
    tokens.push(current);
  }
  tokens
}

/// Everything before the first `#`.
pub fn strip_comment(tokens: &[String]) -> Vec<String> {
  tokens
    .iter()
    .take_while(|token| token.as_str() != "#")
    .cloned()
    .collect()
}

pub fn is_keyword(token: &str) -> bool {
  KEYWORDS.contains(&token)
}

/// A letter or underscore followed by letters, digits or underscores, and not a keyword.
pub fn is_identifier(token: &str) -> bool {
  let mut chars = token.chars();
  let Some(first) = chars.next() else {
    return false;
  };
  if !(first.is_ascii_alphabetic() || first == '_') {
    return false;
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !is_keyword(token)
}

/// Tokens starting with a digit or `-` are numeric literals or malformed.
pub fn looks_numeric(token: &str) -> bool {
  token
    .chars()
    .next()
    .is_some_and(|c| c.is_ascii_digit() || c == '-')
}

/// Parse a numeric-looking token as a signed 32-bit literal.
pub fn parse_number(token: &str, line: usize) -> CompileResult<i32> {
  token.parse::<i32>().map_err(|_| CompileError::at(line))
}

pub fn is_operator(token: &str) -> bool {
  matches!(token, "+" | "-" | "*" | "/")
}
