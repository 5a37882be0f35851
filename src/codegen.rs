//! Code generation output: the textual IR instruction set and module framing.
//!
//! Every instruction is a value of [`Instr`]; rendering happens in one place
//! through `Display`, so the generators never format strings themselves. The
//! routine is a single `main` whose locals are stack slots addressed by name.

use std::fmt;

/// Module header emitted before the routine body.
pub const PREAMBLE: [&str; 5] = [
  "; ModuleID = 'mylang2ir'",
  "declare i32 @printf(i8*, ...)",
  "@print.str = constant [4 x i8] c\"%d\\0A\\00\"",
  "@error.str = constant [23 x i8] c\"Line %d: syntax error\\0A\\00\"",
  "define i32 @main() {",
];

/// Routine trailer.
pub const EPILOGUE: [&str; 2] = ["ret i32 0", "}"];

/// An instruction input: an immediate or a previously produced temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
  Literal(i32),
  Temp(usize),
}

impl fmt::Display for Operand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Literal(value) => write!(f, "{value}"),
      Self::Temp(id) => write!(f, "%t{id}"),
    }
  }
}

/// A named stack slot: a source variable or a scratch slot held in a temporary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
  Var(String),
  Temp(usize),
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      // the suffix keeps variable slots apart from `%t<n>` temporaries
      Self::Var(name) => write!(f, "%{name}r"),
      Self::Temp(id) => write!(f, "%t{id}"),
    }
  }
}

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
}

impl BinaryOp {
  pub fn from_token(token: &str) -> Option<Self> {
    match token {
      "+" => Some(Self::Add),
      "-" => Some(Self::Sub),
      "*" => Some(Self::Mul),
      "/" => Some(Self::Div),
      _ => None,
    }
  }

  /// `*` and `/` bind tighter than `+` and `-`.
  pub fn precedence(self) -> u8 {
    match self {
      Self::Add | Self::Sub => 1,
      Self::Mul | Self::Div => 2,
    }
  }

  fn mnemonic(self) -> &'static str {
    match self {
      Self::Add => "add",
      Self::Sub => "sub",
      Self::Mul => "mul",
      Self::Div => "sdiv",
    }
  }
}

/// Integer comparisons against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
  Eq,
  Ne,
  Sgt,
}

impl Cmp {
  fn mnemonic(self) -> &'static str {
    match self {
      Self::Eq => "eq",
      Self::Ne => "ne",
      Self::Sgt => "sgt",
    }
  }
}

/// Basic block labels. Each construct owns a numbered namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
  IfBody(usize),
  IfEnd(usize),
  WhileCond(usize),
  WhileBody(usize),
  WhileEnd(usize),
  /// One of the four arms `choose0..3` of a choose namespace.
  ChooseArm(u8, usize),
  ChooseEnd(usize),
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::IfBody(id) => write!(f, "ifbody{id}"),
      Self::IfEnd(id) => write!(f, "ifend{id}"),
      Self::WhileCond(id) => write!(f, "whcond{id}"),
      Self::WhileBody(id) => write!(f, "whbody{id}"),
      Self::WhileEnd(id) => write!(f, "whend{id}"),
      Self::ChooseArm(arm, id) => write!(f, "choose{arm}{id}"),
      Self::ChooseEnd(id) => write!(f, "chooseend{id}"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
  Alloca {
    slot: Slot,
  },
  Store {
    value: Operand,
    slot: Slot,
  },
  Load {
    dest: usize,
    slot: Slot,
  },
  Binary {
    dest: usize,
    op: BinaryOp,
    lhs: Operand,
    rhs: Operand,
  },
  /// Compare `value` against zero.
  Icmp {
    dest: usize,
    cmp: Cmp,
    value: Operand,
  },
  Branch {
    cond: usize,
    then_label: Label,
    else_label: Label,
  },
  Jump(Label),
  Label(Label),
  Print(Operand),
  /// Report a syntax error on the given line through the error template.
  PrintError(usize),
}

impl fmt::Display for Instr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Alloca { slot } => write!(f, "{slot} = alloca i32"),
      Self::Store { value, slot } => write!(f, "store i32 {value}, i32* {slot}"),
      Self::Load { dest, slot } => write!(f, "%t{dest} = load i32* {slot}"),
      Self::Binary { dest, op, lhs, rhs } => {
        write!(f, "%t{dest} = {} i32 {lhs}, {rhs}", op.mnemonic())
      }
      Self::Icmp { dest, cmp, value } => {
        write!(f, "%t{dest} = icmp {} i32 {value}, 0", cmp.mnemonic())
      }
      Self::Branch {
        cond,
        then_label,
        else_label,
      } => write!(f, "br i1 %t{cond}, label %{then_label}, label %{else_label}"),
      Self::Jump(label) => write!(f, "br label %{label}"),
      Self::Label(label) => write!(f, "{label}:"),
      Self::Print(value) => write!(
        f,
        "call i32 (i8*, ...)* @printf(i8* getelementptr ([4 x i8]* @print.str, i32 0, i32 0), i32 {value} )"
      ),
      Self::PrintError(line) => write!(
        f,
        "call i32 (i8*, ...)* @printf(i8* getelementptr ([23 x i8]* @error.str, i32 0, i32 0), i32 {line})"
      ),
    }
  }
}

/// Frame a routine body with the module preamble and epilogue.
pub fn render(body: &[Instr]) -> String {
  let mut out = String::new();
  for line in PREAMBLE {
    out.push_str(line);
    out.push('\n');
  }
  for instr in body {
    out.push_str(&instr.to_string());
    out.push('\n');
  }
  for line in EPILOGUE {
    out.push_str(line);
    out.push('\n');
  }
  out
}

/// The whole program emitted in place of a translation that failed.
pub fn error_program(line: usize) -> String {
  render(&[Instr::PrintError(line)])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn instructions_render_in_ir_syntax() {
    let var = Slot::Var("x".into());
    assert_eq!(Instr::Alloca { slot: var.clone() }.to_string(), "%xr = alloca i32");
    assert_eq!(
      Instr::Store {
        value: Operand::Literal(0),
        slot: var.clone()
      }
      .to_string(),
      "store i32 0, i32* %xr"
    );
    assert_eq!(Instr::Load { dest: 3, slot: var }.to_string(), "%t3 = load i32* %xr");
    assert_eq!(
      Instr::Binary {
        dest: 4,
        op: BinaryOp::Div,
        lhs: Operand::Temp(3),
        rhs: Operand::Literal(-2)
      }
      .to_string(),
      "%t4 = sdiv i32 %t3, -2"
    );
    assert_eq!(
      Instr::Icmp {
        dest: 5,
        cmp: Cmp::Sgt,
        value: Operand::Temp(4)
      }
      .to_string(),
      "%t5 = icmp sgt i32 %t4, 0"
    );
  }

  #[test]
  fn control_flow_renders_labels() {
    let branch = Instr::Branch {
      cond: 2,
      then_label: Label::ChooseArm(0, 7),
      else_label: Label::ChooseArm(1, 7),
    };
    assert_eq!(branch.to_string(), "br i1 %t2, label %choose07, label %choose17");
    assert_eq!(Instr::Jump(Label::WhileCond(1)).to_string(), "br label %whcond1");
    assert_eq!(Instr::Label(Label::IfEnd(0)).to_string(), "ifend0:");
  }

  #[test]
  fn error_program_only_reports_the_line() {
    let text = error_program(4);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), PREAMBLE.len() + 1 + EPILOGUE.len());
    assert_eq!(
      lines[PREAMBLE.len()],
      "call i32 (i8*, ...)* @printf(i8* getelementptr ([23 x i8]* @error.str, i32 0, i32 0), i32 4)"
    );
    assert_eq!(lines.last(), Some(&"}"));
  }
}
