//! Running external programs and capturing their combined console output.

use crate::error::GengoError;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

/// A program and its arguments, ready to be handed to an [`Executor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    /// Builds an invocation from a configured argument vector whose first
    /// element is the program.
    pub fn from_argv(argv: &[String]) -> Result<Self, GengoError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| GengoError::Config("empty command".to_string()))?;
        Ok(Self::new(program).args(args))
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Why an execution did not succeed.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("{0}")]
    Spawn(#[source] io::Error),
    #[error("{0}")]
    Status(ExitStatus),
    #[error("cannot capture output: {0}")]
    Capture(#[source] io::Error),
}

/// The outcome of running one [`Invocation`].
#[derive(Debug)]
pub struct Execution {
    /// Everything the process wrote to stdout and stderr, in write order.
    pub output: Vec<u8>,
    /// `Some` when the process could not be started or did not exit successfully.
    pub error: Option<ExecError>,
}

impl Execution {
    pub fn succeeded(output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            error: None,
        }
    }

    pub fn failed(output: impl Into<Vec<u8>>, error: ExecError) -> Self {
        Self {
            output: output.into(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs invocations to completion.
pub trait Executor {
    fn execute(&self, invocation: &Invocation) -> Execution;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, invocation: &Invocation) -> Execution {
        (**self).execute(invocation)
    }
}

/// Executes invocations as child processes.
///
/// Stdout and stderr share one anonymous temporary file, so the capture keeps
/// the order in which the child wrote to either stream. Stdin is closed. The
/// call blocks until the child exits; there is no timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(&self, invocation: &Invocation) -> Execution {
        log::debug!("running `{invocation}`");

        let capture = match tempfile::tempfile() {
            Ok(file) => file,
            Err(err) => return Execution::failed(Vec::<u8>::new(), ExecError::Capture(err)),
        };

        let status = match spawn_and_wait(invocation, &capture) {
            Ok(status) => status,
            Err(err) => return Execution::failed(Vec::<u8>::new(), err),
        };

        let output = match read_capture(capture) {
            Ok(output) => output,
            Err(err) => return Execution::failed(Vec::<u8>::new(), ExecError::Capture(err)),
        };

        log::debug!(
            "`{invocation}` exited with {status} after writing {} bytes",
            output.len()
        );

        if status.success() {
            Execution::succeeded(output)
        } else {
            Execution::failed(output, ExecError::Status(status))
        }
    }
}

fn spawn_and_wait(invocation: &Invocation, capture: &File) -> Result<ExitStatus, ExecError> {
    let stdout = capture.try_clone().map_err(ExecError::Capture)?;
    let stderr = capture.try_clone().map_err(ExecError::Capture)?;

    Command::new(invocation.program())
        .args(invocation.get_args())
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .map_err(ExecError::Spawn)
}

fn read_capture(mut capture: File) -> io::Result<Vec<u8>> {
    capture.seek(SeekFrom::Start(0))?;
    let mut output = Vec::new();
    capture.read_to_end(&mut output)?;
    Ok(output)
}
