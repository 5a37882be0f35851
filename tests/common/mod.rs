//! A tiny interpreter for the emitted IR, so tests can check what a
//! translated program prints instead of only how it is spelled.

use std::collections::HashMap;
use std::path::PathBuf;

const STEP_LIMIT: usize = 100_000;

/// Run the `main` routine of an emitted module and collect its printed lines.
pub fn run(ir: &str) -> Vec<String> {
  let lines: Vec<&str> = ir.lines().collect();
  let labels: HashMap<&str, usize> = lines
    .iter()
    .enumerate()
    .filter_map(|(idx, line)| line.strip_suffix(':').map(|name| (name, idx)))
    .collect();
  let mut values: HashMap<String, i32> = HashMap::new();
  let mut printed = Vec::new();

  let mut pc = lines
    .iter()
    .position(|line| line.starts_with("define"))
    .expect("module has a main routine")
    + 1;

  for _ in 0..STEP_LIMIT {
    let line = lines[pc];
    pc += 1;

    if line == "ret i32 0" {
      return printed;
    }
    if line.ends_with(':') {
      continue;
    }
    if let Some(target) = line.strip_prefix("br label %") {
      pc = labels[target];
      continue;
    }
    if let Some(rest) = line.strip_prefix("br i1 ") {
      let parts: Vec<&str> = rest.split(", label %").collect();
      pc = if value(&values, parts[0]) != 0 {
        labels[parts[1]]
      } else {
        labels[parts[2]]
      };
      continue;
    }
    if let Some(rest) = line.strip_prefix("store i32 ") {
      let (val, slot) = rest.split_once(", i32* ").expect("store shape");
      let val = value(&values, val);
      values.insert(slot.to_string(), val);
      continue;
    }
    if line.starts_with("call") {
      let arg = &line[line.rfind("i32 ").expect("call argument") + 4..];
      let val = value(&values, arg.trim_end_matches(')').trim());
      if line.contains("@error.str") {
        printed.push(format!("Line {val}: syntax error"));
      } else {
        printed.push(val.to_string());
      }
      continue;
    }

    let (dest, rhs) = line.split_once(" = ").expect("assignment shape");
    let parts: Vec<&str> = rhs.split_whitespace().map(|p| p.trim_end_matches(',')).collect();
    let result = match parts[0] {
      "alloca" => 0,
      "load" => value(&values, parts[2]),
      "icmp" => {
        let x = value(&values, parts[3]);
        let hit = match parts[1] {
          "eq" => x == 0,
          "ne" => x != 0,
          "sgt" => x > 0,
          other => panic!("unknown comparison {other}"),
        };
        i32::from(hit)
      }
      op => {
        let (a, b) = (value(&values, parts[2]), value(&values, parts[3]));
        match op {
          "add" => a.wrapping_add(b),
          "sub" => a.wrapping_sub(b),
          "mul" => a.wrapping_mul(b),
          "sdiv" => a.wrapping_div(b),
          other => panic!("unknown instruction {other}"),
        }
      }
    };
    values.insert(dest.to_string(), result);
  }
  panic!("program did not terminate within {STEP_LIMIT} steps");
}

fn value(values: &HashMap<String, i32>, token: &str) -> i32 {
  if token.starts_with('%') {
    *values
      .get(token)
      .unwrap_or_else(|| panic!("{token} read before being written"))
  } else {
    token.parse().expect("integer literal")
  }
}

/// A fresh scratch directory for one test.
#[allow(dead_code)]
pub fn scratch_dir(name: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("mylang2ir-{}-{name}", std::process::id()));
  std::fs::create_dir_all(&dir).expect("create scratch dir");
  dir
}
