//! Differential testing of a converted package against its original.
//!
//! Both programs are run once, their combined console output is captured and
//! the two captures must be byte-for-byte identical. This is a smoke test: it
//! only sees what the programs print. Files they write, exit codes beyond
//! success/failure and timing are not compared, and both programs are assumed
//! to be deterministic.

use crate::config::Config;
use crate::error::{GengoError, Side};
use crate::exec::{ExecError, Execution, Executor, Invocation};
use crate::package::PackageFlag;
use crate::runner::PostConvert;
use similar::{Algorithm, TextDiff};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

/// Captures longer than this are dumped without a diff section.
const MAX_DIFF_LINES: usize = 10_000;

/// Upper bound on the time spent computing the diff section.
const DIFF_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of comparing one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOutcome {
    /// Both programs succeeded and printed the same bytes.
    Match,
    /// The package is native to the target language; nothing was run.
    Skipped,
    /// One side could not be run or exited abnormally.
    ExecutionFailed {
        side: Side,
        command: String,
        reason: String,
    },
    /// Both programs succeeded but printed different bytes.
    OutputMismatch,
}

impl ComparisonOutcome {
    /// Converts the outcome into the error reported for the package, if any.
    pub fn into_result(self) -> Result<(), GengoError> {
        match self {
            ComparisonOutcome::Match | ComparisonOutcome::Skipped => Ok(()),
            ComparisonOutcome::ExecutionFailed {
                side,
                command,
                reason,
            } => Err(GengoError::ExecutionFailed {
                side,
                command,
                reason,
            }),
            ComparisonOutcome::OutputMismatch => Err(GengoError::OutputMismatch),
        }
    }
}

/// Runs the converted artifact and the original program and compares them.
///
/// Human-readable diagnostics (captured output of failing or differing runs)
/// go to `diagnostics`, which is stderr in the command-line tool.
pub struct Comparator<E, W> {
    executor: E,
    diagnostics: W,
    autogen_file: String,
    run_converted: Vec<String>,
    run_original: Vec<String>,
}

impl<E: Executor, W: Write> Comparator<E, W> {
    pub fn new(config: &Config, executor: E, diagnostics: W) -> Self {
        Self {
            executor,
            diagnostics,
            autogen_file: config.autogen_file.clone(),
            run_converted: config.toolchain.run_converted.clone(),
            run_original: config.toolchain.run_original.clone(),
        }
    }

    /// Checks that the package in `dir` behaves the same before and after
    /// conversion.
    ///
    /// Native-target packages succeed immediately. If the converted artifact
    /// fails to run, the original is not run at all.
    pub fn verify(&mut self, dir: &Path, flag: PackageFlag) -> Result<(), GengoError> {
        self.compare(dir, flag)?.into_result()
    }

    /// Like [`Comparator::verify`], but returns the outcome as a value. The
    /// error case is reserved for invalid runner commands. Failing to write
    /// diagnostics is logged and does not change the outcome.
    pub fn compare(
        &mut self,
        dir: &Path,
        flag: PackageFlag,
    ) -> Result<ComparisonOutcome, GengoError> {
        if flag == PackageFlag::NativeTarget {
            return Ok(ComparisonOutcome::Skipped);
        }

        let converted_cmd =
            Invocation::from_argv(&self.run_converted)?.arg(dir.join(&self.autogen_file));
        let converted = self.executor.execute(&converted_cmd);
        if let Some(outcome) = self.report_failure(Side::Converted, &converted_cmd, &converted) {
            return Ok(outcome);
        }

        let original_cmd = Invocation::from_argv(&self.run_original)?.arg(dir);
        let original = self.executor.execute(&original_cmd);
        if let Some(outcome) = self.report_failure(Side::Original, &original_cmd, &original) {
            return Ok(outcome);
        }

        if converted.output == original.output {
            log::info!("{}: outputs match", dir.display());
            return Ok(ComparisonOutcome::Match);
        }

        log::info!("{}: outputs differ", dir.display());
        let written = write_mismatch(
            &mut self.diagnostics,
            &converted_cmd,
            &converted.output,
            &original_cmd,
            &original.output,
        );
        if let Err(err) = written {
            log::warn!("cannot write diagnostics for {}: {err}", dir.display());
        }
        Ok(ComparisonOutcome::OutputMismatch)
    }

    pub fn into_diagnostics(self) -> W {
        self.diagnostics
    }

    fn report_failure(
        &mut self,
        side: Side,
        invocation: &Invocation,
        execution: &Execution,
    ) -> Option<ComparisonOutcome> {
        let err = execution.error.as_ref()?;

        let written = write_failure(&mut self.diagnostics, invocation, &execution.output, err);
        if let Err(write_err) = written {
            log::warn!("cannot write diagnostics for `{invocation}`: {write_err}");
        }

        Some(ComparisonOutcome::ExecutionFailed {
            side,
            command: invocation.to_string(),
            reason: err.to_string(),
        })
    }
}

fn write_failure(
    out: &mut impl Write,
    invocation: &Invocation,
    output: &[u8],
    err: &ExecError,
) -> io::Result<()> {
    out.write_all(output)?;
    writeln!(out, "[ERROR] `{invocation}` failed: {err}")?;
    out.flush()
}

fn write_mismatch(
    out: &mut impl Write,
    converted_cmd: &Invocation,
    converted: &[u8],
    original_cmd: &Invocation,
    original: &[u8],
) -> io::Result<()> {
    writeln!(out, "[ERROR] Output has differences!")?;
    writeln!(out, ">>> Output of `{converted_cmd}`:")?;
    out.write_all(converted)?;
    writeln!(out, "\n>>> Output of `{original_cmd}`:")?;
    out.write_all(original)?;

    if let (Ok(converted), Ok(original)) =
        (std::str::from_utf8(converted), std::str::from_utf8(original))
    {
        if let Some(diff) = unified_diff(converted, original) {
            writeln!(out, "\n>>> Diff:")?;
            out.write_all(diff.as_bytes())?;
        }
    }

    out.flush()
}

/// Line diff from the converted output to the original one. Large captures
/// get no diff; the raw dumps above it already carry the information.
fn unified_diff(converted: &str, original: &str) -> Option<String> {
    if converted.lines().count() > MAX_DIFF_LINES || original.lines().count() > MAX_DIFF_LINES {
        return None;
    }

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(DIFF_TIMEOUT)
        .diff_lines(converted, original);
    Some(
        diff.unified_diff()
            .header("converted", "original")
            .to_string(),
    )
}

impl<E: Executor, W: Write> PostConvert for Comparator<E, W> {
    fn after_convert(&mut self, dir: &Path, flag: PackageFlag) -> Result<(), GengoError> {
        self.verify(dir, flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned executions and records what was asked to run.
    #[derive(Default)]
    struct ScriptedExecutor {
        replies: RefCell<VecDeque<Execution>>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn new(replies: Vec<Execution>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                calls: RefCell::default(),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl Executor for ScriptedExecutor {
        fn execute(&self, invocation: &Invocation) -> Execution {
            self.calls.borrow_mut().push(invocation.to_string());
            self.replies
                .borrow_mut()
                .pop_front()
                .expect("unexpected invocation")
        }
    }

    #[cfg(unix)]
    fn exit_failure(output: &str) -> Execution {
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;

        Execution::failed(output, ExecError::Status(ExitStatus::from_raw(1 << 8)))
    }

    fn spawn_failure() -> Execution {
        Execution::failed(
            Vec::<u8>::new(),
            ExecError::Spawn(io::Error::new(io::ErrorKind::NotFound, "program not found")),
        )
    }

    /// A diagnostic sink whose every write fails.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    fn comparator(executor: &ScriptedExecutor) -> Comparator<&ScriptedExecutor, Vec<u8>> {
        Comparator::new(&Config::default(), executor, Vec::new())
    }

    fn stderr_text(comparator: Comparator<&ScriptedExecutor, Vec<u8>>) -> String {
        String::from_utf8(comparator.into_diagnostics()).unwrap()
    }

    #[test]
    fn identical_output_passes_silently() {
        let executor = ScriptedExecutor::new(vec![
            Execution::succeeded("hello\n"),
            Execution::succeeded("hello\n"),
        ]);
        let mut cmp = comparator(&executor);

        cmp.verify(Path::new("demo"), PackageFlag::Ordinary).unwrap();

        assert_eq!(
            executor.calls(),
            [
                format!("go run {}", Path::new("demo").join("gop_autogen.go").display()),
                "gop run -quiet demo".to_string(),
            ]
        );
        assert!(stderr_text(cmp).is_empty());
    }

    #[test]
    fn native_target_packages_are_not_run() {
        let executor = ScriptedExecutor::default();
        let mut cmp = comparator(&executor);

        let outcome = cmp.compare(Path::new("demo"), PackageFlag::NativeTarget).unwrap();

        assert_eq!(outcome, ComparisonOutcome::Skipped);
        assert!(executor.calls().is_empty());
        assert!(stderr_text(cmp).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn converted_failure_skips_original_run() {
        let executor = ScriptedExecutor::new(vec![exit_failure("panic: boom\n")]);
        let mut cmp = comparator(&executor);

        let err = cmp
            .verify(Path::new("demo"), PackageFlag::Ordinary)
            .unwrap_err();

        assert!(matches!(
            err,
            GengoError::ExecutionFailed {
                side: Side::Converted,
                ..
            }
        ));
        assert_eq!(executor.calls().len(), 1);

        let stderr = stderr_text(cmp);
        assert!(stderr.starts_with("panic: boom\n[ERROR] `go run "));
        assert!(stderr.ends_with("` failed: exit status: 1\n"));
    }

    #[cfg(unix)]
    #[test]
    fn original_failure_is_attributed_to_original_side() {
        let executor = ScriptedExecutor::new(vec![
            Execution::succeeded("hello\n"),
            exit_failure("syntax error\n"),
        ]);
        let mut cmp = comparator(&executor);

        let outcome = cmp.compare(Path::new("demo"), PackageFlag::Ordinary).unwrap();

        assert_eq!(
            outcome,
            ComparisonOutcome::ExecutionFailed {
                side: Side::Original,
                command: "gop run -quiet demo".to_string(),
                reason: "exit status: 1".to_string(),
            }
        );
        insta::assert_snapshot!(stderr_text(cmp).trim_end(), @r"
        syntax error
        [ERROR] `gop run -quiet demo` failed: exit status: 1
        ");
    }

    #[test]
    fn differing_output_dumps_both_sides() {
        let executor = ScriptedExecutor::new(vec![
            Execution::succeeded("hello!\n"),
            Execution::succeeded("hello\n"),
        ]);
        let mut cmp = comparator(&executor);

        let err = cmp
            .verify(Path::new("demo"), PackageFlag::Ordinary)
            .unwrap_err();
        assert!(matches!(err, GengoError::OutputMismatch));

        let stderr = stderr_text(cmp);
        let converted_header = format!(
            ">>> Output of `go run {}`:\nhello!\n",
            Path::new("demo").join("gop_autogen.go").display()
        );
        assert!(stderr.starts_with("[ERROR] Output has differences!\n"));
        assert!(stderr.contains(&converted_header));
        assert!(stderr.contains("\n>>> Output of `gop run -quiet demo`:\nhello\n"));
        assert!(stderr.contains("-hello!\n+hello\n"));
    }

    #[test]
    fn non_utf8_mismatch_omits_diff() {
        let executor = ScriptedExecutor::new(vec![
            Execution::succeeded(vec![0xff, b'\n']),
            Execution::succeeded(vec![0xfe, b'\n']),
        ]);
        let mut cmp = comparator(&executor);

        let outcome = cmp.compare(Path::new("demo"), PackageFlag::Ordinary).unwrap();
        assert_eq!(outcome, ComparisonOutcome::OutputMismatch);

        let stderr = cmp.into_diagnostics();
        assert!(stderr.windows(2).any(|w| w == [0xff, b'\n']));
        assert!(stderr.windows(2).any(|w| w == [0xfe, b'\n']));
        assert!(!String::from_utf8_lossy(&stderr).contains(">>> Diff:"));
    }

    #[test]
    fn trailing_whitespace_counts_as_a_difference() {
        let executor = ScriptedExecutor::new(vec![
            Execution::succeeded("hello\n"),
            Execution::succeeded("hello"),
        ]);
        let mut cmp = comparator(&executor);

        let outcome = cmp.compare(Path::new("demo"), PackageFlag::Ordinary).unwrap();
        assert_eq!(outcome, ComparisonOutcome::OutputMismatch);
    }

    #[cfg(unix)]
    #[test]
    fn failing_programs_that_agree_still_fail() {
        let executor = ScriptedExecutor::new(vec![exit_failure("same\n")]);
        let mut cmp = comparator(&executor);

        let outcome = cmp.compare(Path::new("demo"), PackageFlag::Ordinary).unwrap();
        assert!(matches!(
            outcome,
            ComparisonOutcome::ExecutionFailed {
                side: Side::Converted,
                ..
            }
        ));
    }

    #[test]
    fn outcome_maps_to_errors() {
        assert!(ComparisonOutcome::Match.into_result().is_ok());
        assert!(ComparisonOutcome::Skipped.into_result().is_ok());
        assert!(matches!(
            ComparisonOutcome::OutputMismatch.into_result(),
            Err(GengoError::OutputMismatch)
        ));
    }

    #[test]
    fn missing_program_is_an_execution_failure() {
        let executor = ScriptedExecutor::new(vec![Execution::succeeded("hi\n"), spawn_failure()]);
        let mut cmp = comparator(&executor);

        let err = cmp
            .verify(Path::new("demo"), PackageFlag::Ordinary)
            .unwrap_err();

        assert!(matches!(
            err,
            GengoError::ExecutionFailed {
                side: Side::Original,
                ..
            }
        ));
        assert!(stderr_text(cmp).contains("failed: program not found"));
    }

    #[test]
    fn unwritable_diagnostics_keep_the_failing_side() {
        let executor = ScriptedExecutor::new(vec![spawn_failure()]);
        let mut cmp = Comparator::new(&Config::default(), &executor, ClosedPipe);

        let err = cmp
            .verify(Path::new("demo"), PackageFlag::Ordinary)
            .unwrap_err();

        assert!(matches!(
            err,
            GengoError::ExecutionFailed {
                side: Side::Converted,
                ..
            }
        ));
    }

    #[test]
    fn unwritable_diagnostics_keep_the_mismatch() {
        let executor = ScriptedExecutor::new(vec![
            Execution::succeeded("left\n"),
            Execution::succeeded("right\n"),
        ]);
        let mut cmp = Comparator::new(&Config::default(), &executor, ClosedPipe);

        let err = cmp
            .verify(Path::new("demo"), PackageFlag::Ordinary)
            .unwrap_err();
        assert!(matches!(err, GengoError::OutputMismatch));
    }

    #[test]
    fn large_disjoint_outputs_are_dumped_without_diff() {
        let lines = MAX_DIFF_LINES * 2;
        let converted: String = (0..lines).map(|i| format!("converted {i}\n")).collect();
        let original: String = (0..lines).map(|i| format!("original {i}\n")).collect();
        let executor = ScriptedExecutor::new(vec![
            Execution::succeeded(converted.clone()),
            Execution::succeeded(original.clone()),
        ]);
        let mut cmp = comparator(&executor);

        let started = std::time::Instant::now();
        let outcome = cmp.compare(Path::new("demo"), PackageFlag::Ordinary).unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(outcome, ComparisonOutcome::OutputMismatch);
        let stderr = stderr_text(cmp);
        assert!(stderr.contains(&converted));
        assert!(stderr.contains(&original));
        assert!(!stderr.contains(">>> Diff:"));
    }

    #[test]
    fn diff_is_bounded_by_timeout() {
        let converted: String = (0..MAX_DIFF_LINES).map(|i| format!("a{i}\n")).collect();
        let original: String = (0..MAX_DIFF_LINES).map(|i| format!("b{i}\n")).collect();

        let started = std::time::Instant::now();
        let diff = unified_diff(&converted, &original).unwrap();

        assert!(started.elapsed() < DIFF_TIMEOUT + Duration::from_secs(10));
        assert!(diff.starts_with("--- converted\n+++ original\n"));
    }
}
