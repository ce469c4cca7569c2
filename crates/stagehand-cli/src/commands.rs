//! Dependency check, installation and follow-up command.

use anyhow::{bail, Context, Result};
use console::style;
use stagehand_core::{DependencyName, MANIFEST_FILE};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Everything a single invocation needs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dependencies: Vec<String>,
    pub quiet: bool,
    pub modules_dir: PathBuf,
    /// Installer program followed by its leading arguments.
    pub installer: Vec<String>,
    /// Command to run once all dependencies are present.
    pub followup: Option<Vec<OsString>>,
}

/// Check dependencies, install missing ones and run the follow-up command.
///
/// Progress goes to stderr, leaving stdout to the installer and the
/// follow-up command. Returns the exit code of the failing installer, of the
/// follow-up command, or zero.
pub fn run(options: &RunOptions) -> Result<i32> {
    run_with(options, &mut io::stderr().lock())
}

fn run_with(options: &RunOptions, progress: &mut impl Write) -> Result<i32> {
    let dependencies = parse_dependencies(&options.dependencies, progress)?;

    let mut missing = Vec::new();
    for dependency in &dependencies {
        if is_installed(&options.modules_dir, dependency)? {
            if !options.quiet {
                writeln!(progress, "{} {}", style(dependency).cyan(), style("... found").green())?;
            }
        } else {
            missing.push(dependency);
        }
    }

    if !missing.is_empty() {
        if !options.quiet {
            writeln!(progress, "{}", style("installing missing dependencies:").bold())?;
            for dependency in &missing {
                writeln!(progress, "* {dependency}")?;
            }
        }

        let code = install(&options.installer, &missing)?;
        if code != 0 {
            writeln!(
                progress,
                "{}",
                style(format!(
                    "running installer for {} exited on error ({code})",
                    join(&missing)
                ))
                .red()
            )?;
            return Ok(code);
        }
    }

    match &options.followup {
        Some(command) => {
            if !options.quiet {
                writeln!(
                    progress,
                    "{} {}",
                    style("invoking follow-up command:").bold(),
                    command
                        .iter()
                        .map(|arg| arg.to_string_lossy())
                        .collect::<Vec<_>>()
                        .join(" ")
                )?;
            }
            execute(command)
        }
        None => Ok(0),
    }
}

/// Normalize dependency names, reporting and skipping invalid ones.
fn parse_dependencies(raw: &[String], progress: &mut impl Write) -> Result<Vec<DependencyName>> {
    let mut names: Vec<DependencyName> = Vec::with_capacity(raw.len());
    for name in raw {
        match DependencyName::parse(name) {
            Ok(name) if names.contains(&name) => {}
            Ok(name) => names.push(name),
            Err(_) => writeln!(
                progress,
                "{}",
                style(format!("got invalid dependency name: {name}")).yellow()
            )?,
        }
    }
    Ok(names)
}

/// Whether `<modules_dir>/<name>` holds a plugin manifest.
fn is_installed(modules_dir: &Path, dependency: &DependencyName) -> Result<bool> {
    let manifest = modules_dir.join(dependency.as_str()).join(MANIFEST_FILE);
    debug!(path = %manifest.display(), "Checking dependency");

    match std::fs::metadata(&manifest) {
        Ok(meta) if meta.is_file() => Ok(true),
        Ok(_) => bail!("{} is not a file", manifest.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::NotADirectory => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to inspect {}", manifest.display())),
    }
}

fn install(installer: &[String], missing: &[&DependencyName]) -> Result<i32> {
    let Some((program, args)) = installer.split_first() else {
        bail!("no installer command configured");
    };

    debug!(program = %program, count = missing.len(), "Running installer");

    let status = Command::new(program)
        .args(args)
        .args(missing.iter().map(|name| name.as_str()))
        .status()
        .with_context(|| format!("Failed to run installer '{program}'"))?;

    Ok(status.code().unwrap_or(1))
}

fn execute(command: &[OsString]) -> Result<i32> {
    let Some((program, args)) = command.split_first() else {
        bail!("missing command to execute eventually");
    };

    debug!(program = %program.to_string_lossy(), "Running follow-up command");

    let status = Command::new(program)
        .args(args)
        .status()
        .with_context(|| format!("Failed to run '{}'", program.to_string_lossy()))?;

    Ok(status.code().unwrap_or(1))
}

fn join(names: &[&DependencyName]) -> String {
    names
        .iter()
        .map(|name| name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn install_plugin(modules: &Path, name: &str) {
        let folder = modules.join(name);
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join(MANIFEST_FILE), "{}").unwrap();
    }

    fn options(modules: &Path, dependencies: &[&str], installer: &[&str]) -> RunOptions {
        RunOptions {
            dependencies: dependencies.iter().map(ToString::to_string).collect(),
            quiet: true,
            modules_dir: modules.to_path_buf(),
            installer: installer.iter().map(ToString::to_string).collect(),
            followup: None,
        }
    }

    #[test]
    fn test_parse_skips_invalid_and_duplicate_names() {
        let mut progress = Vec::new();
        let names = parse_dependencies(
            &[
                "odem".to_string(),
                "--bogus".to_string(),
                "stagehand-plugin-odem".to_string(),
                "stagehand-auth".to_string(),
            ],
            &mut progress,
        )
        .unwrap();
        let names: Vec<_> = names.iter().map(DependencyName::as_str).collect();
        assert_eq!(names, vec!["stagehand-plugin-odem", "stagehand-auth"]);
        assert!(String::from_utf8(progress).unwrap().contains("got invalid dependency name: --bogus"));
    }

    #[test]
    fn test_progress_goes_to_given_writer() {
        let temp = TempDir::new().unwrap();
        install_plugin(temp.path(), "stagehand-plugin-odem");
        let mut options = options(temp.path(), &["odem"], &["/nonexistent/installer"]);
        options.quiet = false;

        let mut progress = Vec::new();
        assert_eq!(run_with(&options, &mut progress).unwrap(), 0);
        let progress = String::from_utf8(progress).unwrap();
        assert!(progress.contains("stagehand-plugin-odem"));
        assert!(progress.contains("... found"));

        options.quiet = true;
        let mut progress = Vec::new();
        assert_eq!(run_with(&options, &mut progress).unwrap(), 0);
        assert!(progress.is_empty());
    }

    #[test]
    fn test_is_installed() {
        let temp = TempDir::new().unwrap();
        install_plugin(temp.path(), "stagehand-plugin-odem");
        fs::create_dir_all(temp.path().join("stagehand-plugin-bare")).unwrap();
        fs::create_dir_all(temp.path().join("stagehand-plugin-odd").join(MANIFEST_FILE))
            .unwrap();

        let parse = |name| DependencyName::parse(name).unwrap();
        assert!(is_installed(temp.path(), &parse("odem")).unwrap());
        assert!(!is_installed(temp.path(), &parse("bare")).unwrap());
        assert!(!is_installed(temp.path(), &parse("absent")).unwrap());
        assert!(is_installed(temp.path(), &parse("odd")).is_err());
    }

    #[test]
    fn test_all_present_skips_installer() {
        let temp = TempDir::new().unwrap();
        install_plugin(temp.path(), "stagehand-plugin-odem");

        // An installer that cannot be spawned proves it is never invoked.
        let options = options(temp.path(), &["odem"], &["/nonexistent/installer"]);
        assert_eq!(run(&options).unwrap(), 0);
    }

    #[test]
    fn test_empty_installer_is_an_error() {
        let temp = TempDir::new().unwrap();
        let options = options(temp.path(), &["odem"], &[]);
        assert!(run(&options).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_installer_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let mut options = options(temp.path(), &["odem"], &["false"]);
        options.followup = Some(vec![OsString::from("true")]);

        assert_eq!(run(&options).unwrap(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_followup_exit_code_is_returned() {
        let temp = TempDir::new().unwrap();
        let mut options = options(temp.path(), &["odem"], &["true"]);

        options.followup = Some(vec![OsString::from("true")]);
        assert_eq!(run(&options).unwrap(), 0);

        options.followup = Some(vec![
            OsString::from("sh"),
            OsString::from("-c"),
            OsString::from("exit 3"),
        ]);
        assert_eq!(run(&options).unwrap(), 3);
    }
}
