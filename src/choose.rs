//! `choose(a, b, c, d)`: select `b` when `a == 0`, `c` when `a > 0`, else `d`.
//!
//! All four arguments are evaluated up front, left to right. The selection is
//! then a two-level branch tree storing into a scratch slot that the join
//! block loads back. The scratch slot is never released; the output format
//! has no way to free a stack slot.

use tracing::trace;

use crate::codegen::{Cmp, Instr, Label, Operand, Slot};
use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use crate::expr::evaluate;

/// Emit a choose over the tokens between its parentheses.
pub fn choose(
  ctx: &mut CompilationContext,
  args: &[String],
  line: usize,
) -> CompileResult<Operand> {
  let dest = Slot::Temp(ctx.counters.next_temp());

  let [selector, on_zero, on_positive, otherwise]: [&[String]; 4] = split_arguments(args)
    .try_into()
    .map_err(|_| CompileError::at(line))?;

  let selector = evaluate(ctx, selector, line)?;
  let on_zero = evaluate(ctx, on_zero, line)?;
  let on_positive = evaluate(ctx, on_positive, line)?;
  let otherwise = evaluate(ctx, otherwise, line)?;

  let id = ctx.counters.next_choose();
  trace!(id, line, "choose namespace");
  let end = Label::ChooseEnd(id);

  ctx.emit(Instr::Alloca { slot: dest.clone() });
  let is_zero = ctx.counters.next_temp();
  ctx.emit(Instr::Icmp {
    dest: is_zero,
    cmp: Cmp::Eq,
    value: selector,
  });
  ctx.emit(Instr::Branch {
    cond: is_zero,
    then_label: Label::ChooseArm(0, id),
    else_label: Label::ChooseArm(1, id),
  });
  store_arm(ctx, Label::ChooseArm(0, id), on_zero, &dest, end);

  ctx.emit(Instr::Label(Label::ChooseArm(1, id)));
  let is_positive = ctx.counters.next_temp();
  ctx.emit(Instr::Icmp {
    dest: is_positive,
    cmp: Cmp::Sgt,
    value: selector,
  });
  ctx.emit(Instr::Branch {
    cond: is_positive,
    then_label: Label::ChooseArm(2, id),
    else_label: Label::ChooseArm(3, id),
  });
  store_arm(ctx, Label::ChooseArm(2, id), on_positive, &dest, end);
  store_arm(ctx, Label::ChooseArm(3, id), otherwise, &dest, end);

  ctx.emit(Instr::Label(end));
  let result = ctx.counters.next_temp();
  ctx.emit(Instr::Load {
    dest: result,
    slot: dest,
  });
  Ok(Operand::Temp(result))
}

fn store_arm(ctx: &mut CompilationContext, label: Label, value: Operand, dest: &Slot, end: Label) {
  ctx.emit(Instr::Label(label));
  ctx.emit(Instr::Store {
    value,
    slot: dest.clone(),
  });
  ctx.emit(Instr::Jump(end));
}

/// Split on commas that are not inside parentheses.
fn split_arguments(args: &[String]) -> Vec<&[String]> {
  let mut groups = Vec::new();
  let mut depth = 0usize;
  let mut start = 0;

  for (idx, token) in args.iter().enumerate() {
    match token.as_str() {
      "(" => depth += 1,
      ")" => depth = depth.saturating_sub(1),
      "," if depth == 0 => {
        groups.push(&args[start..idx]);
        start = idx + 1;
      }
      _ => {}
    }
  }
  groups.push(&args[start..]);
  groups
}
