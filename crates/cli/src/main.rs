mod buildfile;
mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use webuild_lib::{BuildEnv, LogLevel};

use cmd::{cmd_resolve, cmd_run, cmd_vscode};
use output::OutputFormat;

/// webuild - declarative builds for web and application projects
#[derive(Parser)]
#[command(name = "webuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a build file
  Run {
    /// Path to the build file
    #[arg(default_value = "webuild.json")]
    file: PathBuf,

    /// Distribution build: minify outputs, no source maps
    #[arg(long)]
    dist: bool,
  },

  /// Print the paths a path specification resolves to
  Resolve {
    /// Path specifications, e.g. "%prj/bin/%lang"
    #[arg(required = true)]
    specs: Vec<String>,

    /// Variable binding NAME=VALUE; comma-separated values form a list
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = cmd::resolve::parse_var)]
    vars: Vec<(String, String)>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Generate .vscode launch, tasks and settings files
  Vscode {
    /// Project directory (default: current directory)
    #[arg(long)]
    prj: Option<PathBuf>,
  },
}

/// Filter directive when `RUST_LOG` is unset: `-v` wins, then `LOG`/`log`.
fn log_directive(verbose: bool, level: LogLevel) -> String {
  if verbose {
    return "debug".to_string();
  }
  level.as_filter().to_string()
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  let env = BuildEnv::from_env();

  let filter = match (cli.verbose, EnvFilter::try_from_default_env()) {
    (false, Ok(filter)) => filter,
    _ => EnvFilter::new(log_directive(cli.verbose, env.log_level)),
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Run { file, dist } => {
      let env = if dist { env.dist_mode() } else { env };
      cmd_run(&file, &env)
    }
    Commands::Resolve { specs, vars, output } => cmd_resolve(&specs, &vars, output),
    Commands::Vscode { prj } => cmd_vscode(prj.as_deref()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn verbose_flag_overrides_log_level() {
    assert_eq!(log_directive(true, LogLevel::Error), "debug");
    assert_eq!(log_directive(false, LogLevel::Warn), "warn");
  }

  #[test]
  #[serial]
  fn log_variable_selects_level() {
    temp_env::with_vars([("LOG", Some("silly")), ("log", None::<&str>)], || {
      let env = BuildEnv::from_env();
      assert_eq!(log_directive(false, env.log_level), "trace");
    });
  }
}
