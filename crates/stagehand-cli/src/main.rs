//! stagehand-pm - Make sure plugin dependencies are installed, then
//! optionally run a follow-up command.

mod commands;

use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Flag after which every argument belongs to the follow-up command.
const EXEC_FLAG: &str = "--exec";

#[derive(Parser)]
#[command(name = "stagehand-pm")]
#[command(author, version, about = "Check and install stagehand plugin dependencies")]
struct Cli {
    /// Plugin dependencies; names without the `stagehand-` prefix get
    /// `stagehand-plugin-` prepended
    dependencies: Vec<String>,

    /// Suppress progress output
    #[arg(long, short = 'q', env = "STAGEHAND_PM_QUIET")]
    quiet: bool,

    /// Folder holding installed dependencies
    #[arg(long, env = "STAGEHAND_MODULES_DIR", default_value = "node_modules")]
    modules_dir: PathBuf,

    /// Command installing missing dependencies, given their names as
    /// trailing arguments
    #[arg(long, env = "STAGEHAND_INSTALLER", default_value = "npm install --no-save")]
    installer: String,

    /// Resolve dependencies transitively (not supported)
    #[arg(long, hide = true)]
    resolve: bool,

    /// Run the command following this flag once dependencies are installed
    #[arg(long = "exec")]
    exec: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let (args, followup) = split_exec(std::env::args_os().collect());

    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            if let Err(print) = e.print() {
                tracing::error!(error = %print, usage = %e, "Failed to report usage error");
            }
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if cli.resolve {
        eprintln!("This version does not support any other mode but simple dependency checks, yet.");
        return ExitCode::FAILURE;
    }

    if cli.exec && followup.is_empty() {
        eprintln!("missing command to execute eventually");
        return ExitCode::FAILURE;
    }

    let options = commands::RunOptions {
        dependencies: cli.dependencies,
        quiet: cli.quiet,
        modules_dir: cli.modules_dir,
        installer: cli.installer.split_whitespace().map(String::from).collect(),
        followup: cli.exec.then_some(followup),
    };

    match commands::run(&options) {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("checking dependencies failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Split the command line at the first `--exec`.
///
/// The flag itself stays with the leading arguments so clap sees it.
fn split_exec(mut args: Vec<OsString>) -> (Vec<OsString>, Vec<OsString>) {
    match args.iter().skip(1).position(|arg| arg == EXEC_FLAG) {
        Some(index) => {
            let followup = args.split_off(index + 2);
            (args, followup)
        }
        None => (args, Vec::new()),
    }
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_split_exec() {
        let (head, tail) = split_exec(os(&["pm", "odem", "--exec", "mocha", "--quiet", "--exec"]));
        assert_eq!(head, os(&["pm", "odem", "--exec"]));
        assert_eq!(tail, os(&["mocha", "--quiet", "--exec"]));

        let (head, tail) = split_exec(os(&["pm", "--quiet", "odem"]));
        assert_eq!(head, os(&["pm", "--quiet", "odem"]));
        assert!(tail.is_empty());

        let (head, tail) = split_exec(os(&["pm", "--exec"]));
        assert_eq!(head, os(&["pm", "--exec"]));
        assert!(tail.is_empty());
    }

    #[test]
    fn test_parses_flags() {
        let cli = Cli::try_parse_from(os(&["pm", "--quiet", "odem", "stagehand-auth", "--exec"]))
            .unwrap();
        assert!(cli.quiet);
        assert!(cli.exec);
        assert_eq!(cli.dependencies, vec!["odem", "stagehand-auth"]);
        assert_eq!(cli.modules_dir, PathBuf::from("node_modules"));
    }

    #[test]
    fn test_unknown_option_is_usage_error() {
        let err = Cli::try_parse_from(os(&["pm", "--bogus"])).err().unwrap();
        assert!(err.use_stderr());
    }
}
