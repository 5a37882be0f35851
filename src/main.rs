use std::env;
use std::path::Path;
use std::process;

use mylang2ir::driver::compile_file;
use mylang2ir::CompileError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "MYLANG2IR_LOG";

fn main() {
  init_logging();

  let args: Vec<String> = env::args().collect();
  if args.len() != 2 {
    let program = args.first().map(String::as_str).unwrap_or("mylang2ir");
    eprintln!(
      "{}",
      CompileError::Usage {
        program: program.to_string()
      }
    );
    process::exit(1);
  }

  // a syntax error still yields an output file, so only I/O failures exit non-zero
  if let Err(err) = compile_file(Path::new(&args[1])) {
    eprintln!("{err}");
    process::exit(1);
  }
}

fn init_logging() {
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}
