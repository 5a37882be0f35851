//! State owned by one translation run.
//!
//! Counters, the variable table and the instruction buffer live together in
//! [`CompilationContext`], which every generator receives by `&mut`. A fresh
//! context is built per run, so nothing leaks between translations.

use std::collections::HashSet;

use tracing::trace;

use crate::codegen::{Instr, Operand, Slot};
use crate::error::{CompileError, CompileResult};
use crate::tokenizer::is_identifier;

/// Monotonic id sources. Ids are handed out once and never reused.
#[derive(Debug, Default)]
pub struct Counters {
  temp: usize,
  if_id: usize,
  while_id: usize,
  choose_id: usize,
}

impl Counters {
  /// Temporaries are numbered from 1.
  pub fn next_temp(&mut self) -> usize {
    self.temp += 1;
    self.temp
  }

  pub fn next_if(&mut self) -> usize {
    bump(&mut self.if_id)
  }

  pub fn next_while(&mut self) -> usize {
    bump(&mut self.while_id)
  }

  pub fn next_choose(&mut self) -> usize {
    bump(&mut self.choose_id)
  }
}

fn bump(counter: &mut usize) -> usize {
  let id = *counter;
  *counter += 1;
  id
}

/// Names whose stack slot has already been allocated.
#[derive(Debug, Default)]
pub struct VarTable {
  declared: HashSet<String>,
}

impl VarTable {
  pub fn contains(&self, name: &str) -> bool {
    self.declared.contains(name)
  }

  pub fn len(&self) -> usize {
    self.declared.len()
  }

  pub fn is_empty(&self) -> bool {
    self.declared.is_empty()
  }

  /// Returns true the first time a name is seen.
  fn insert(&mut self, name: &str) -> bool {
    self.declared.insert(name.to_string())
  }
}

#[derive(Debug, Default)]
pub struct CompilationContext {
  pub counters: Counters,
  pub vars: VarTable,
  out: Vec<Instr>,
}

impl CompilationContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn emit(&mut self, instr: Instr) {
    trace!("emit {instr}");
    self.out.push(instr);
  }

  pub fn instructions(&self) -> &[Instr] {
    &self.out
  }

  pub fn into_instructions(self) -> Vec<Instr> {
    self.out
  }

  /// Validate `name` and allocate its zero-initialised slot on first sight.
  pub fn declare(&mut self, name: &str, line: usize) -> CompileResult<Slot> {
    if !is_identifier(name) {
      return Err(CompileError::at(line));
    }
    let slot = Slot::Var(name.to_string());
    if self.vars.insert(name) {
      self.emit(Instr::Alloca { slot: slot.clone() });
      self.emit(Instr::Store {
        value: Operand::Literal(0),
        slot: slot.clone(),
      });
    }
    Ok(slot)
  }

  /// Load a variable into a fresh temporary.
  pub fn load_var(&mut self, name: &str, line: usize) -> CompileResult<Operand> {
    let slot = self.declare(name, line)?;
    let dest = self.counters.next_temp();
    self.emit(Instr::Load { dest, slot });
    Ok(Operand::Temp(dest))
  }
}
