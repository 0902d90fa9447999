use crate::cli::{normalize_args, Cli, Command, GoArgs};
use anyhow::Context;
use clap::{CommandFactory, Parser};
use gengo_lib::{
    CommandConverter, Comparator, Config, GengoError, PostConvert, ProcessExecutor, Runner,
};
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

/// Exit status used when any package failed, matching `exit(-1)`.
const FAILURE_STATUS: u8 = 255;

pub fn run() -> anyhow::Result<ExitCode> {
    env_logger::init();

    let Cli { command } = Cli::parse_from(normalize_args(env::args_os()));

    match command {
        Command::Go(args) => run_go(args),
    }
}

fn run_go(args: GoArgs) -> anyhow::Result<ExitCode> {
    let GoArgs {
        test,
        config,
        src_dir,
    } = args;

    let Some(src_dir) = src_dir else {
        print_go_usage()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config = load_config(config.as_deref())?;
    let errors = convert_tree(config, &src_dir, test);

    if errors.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }

    let mut stderr = io::stderr().lock();
    for err in &errors {
        writeln!(stderr, "{err}")?;
    }
    Ok(ExitCode::from(FAILURE_STATUS))
}

/// Converts every package below `src_dir` and returns the errors of the run in
/// the order they happened. With `test` set, each converted package is
/// compared against its original.
fn convert_tree(config: Config, src_dir: &Path, test: bool) -> Vec<GengoError> {
    let converter = CommandConverter::new(&config, ProcessExecutor);
    let observer: Option<Box<dyn PostConvert>> = if test {
        Some(Box::new(Comparator::new(
            &config,
            ProcessExecutor,
            io::stderr(),
        )))
    } else {
        None
    };

    log::debug!(
        "converting packages below {} (test: {test})",
        src_dir.display()
    );

    let mut runner = Runner::new(config, converter, observer);
    runner.gen_go(src_dir, true);
    runner.into_errors()
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn print_go_usage() -> anyhow::Result<()> {
    let mut command = Cli::command();
    command.build();
    let help = command
        .find_subcommand_mut("go")
        .map(|go| go.render_help().to_string())
        .unwrap_or_default();

    io::stderr().write_all(help.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::path::PathBuf;

    #[test]
    fn explicit_config_path_must_exist() {
        let temp = assert_fs::TempDir::new().unwrap();
        let missing: PathBuf = temp.path().join("gengo.toml");

        let err = load_config(Some(missing.as_path())).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to load configuration"));
    }

    #[test]
    fn config_file_overrides_toolchain() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("gengo.toml");
        file.write_str("[toolchain]\nrun_converted = [\"sh\"]\n").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.toolchain.run_converted, ["sh"]);
    }

    #[test]
    fn without_config_defaults_apply() {
        assert_eq!(load_config(None).unwrap(), Config::default());
    }

    #[test]
    fn empty_tree_has_no_errors() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("notes/README.md").write_str("").unwrap();

        assert!(convert_tree(Config::default(), temp.path(), true).is_empty());
    }
}
