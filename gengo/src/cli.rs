//! Defines the command-line interface for the application.

use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Long options that may also be spelled with a single dash (`-test`).
const SINGLE_DASH_LONG_FLAGS: &[&str] = &["test", "config"];

#[derive(Parser, Debug)]
#[command(
    name = "gengo",
    version,
    about = "Convert Go+ packages into Go packages and check that they still behave the same."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert Go+ packages into Go packages.
    #[command(override_usage = "gengo go [-test] [--config <CONFIG_PATH>] <GOP_SRC_DIR>")]
    Go(GoArgs),
}

#[derive(Args, Debug)]
pub struct GoArgs {
    /// Run every converted package and compare its output with the original.
    #[arg(long)]
    pub test: bool,

    /// Read toolchain settings from a TOML file.
    #[arg(long, value_name = "CONFIG_PATH", env = "GENGO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the Go+ packages to convert.
    #[arg(value_name = "GOP_SRC_DIR")]
    pub src_dir: Option<PathBuf>,
}

/// Rewrites Go-style single-dash long options (`-test`, `-config=x`) into the
/// double-dash form clap understands. Everything after `--` is left alone.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut normalized = Vec::new();
    let mut options_done = false;

    for (index, arg) in args.into_iter().enumerate() {
        if index == 0 || options_done {
            normalized.push(arg);
            continue;
        }
        if arg == "--" {
            options_done = true;
            normalized.push(arg);
            continue;
        }

        let rewritten = arg.to_str().and_then(|text| {
            let name = text.strip_prefix('-')?;
            if name.starts_with('-') {
                return None;
            }
            let flag = name.split_once('=').map_or(name, |(flag, _)| flag);
            SINGLE_DASH_LONG_FLAGS
                .contains(&flag)
                .then(|| OsString::from(format!("-{text}")))
        });
        normalized.push(rewritten.unwrap_or(arg));
    }

    normalized
}
