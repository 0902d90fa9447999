//! The conversion driver: package discovery, conversion and the
//! post-conversion observer.

use crate::config::Config;
use crate::error::GengoError;
use crate::exec::{Executor, Invocation};
use crate::package::{classify, Package, PackageFlag};
use std::io;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Converts one source package into target-language code, writing the
/// autogen artifact into the package directory.
///
/// The [`Runner`] calls this once per package, nested packages included, so an
/// implementation must convert `dir` alone and not descend into
/// subdirectories. A recursive converter would convert nested packages again
/// for every ancestor and report their errors more than once.
pub trait Converter {
    fn convert(&self, dir: &Path) -> Result<(), GengoError>;
}

/// Called once for every package that was converted successfully.
///
/// Returned errors are recorded by the [`Runner`] and do not stop the run.
pub trait PostConvert {
    fn after_convert(&mut self, dir: &Path, flag: PackageFlag) -> Result<(), GengoError>;
}

impl<P: PostConvert + ?Sized> PostConvert for &mut P {
    fn after_convert(&mut self, dir: &Path, flag: PackageFlag) -> Result<(), GengoError> {
        (**self).after_convert(dir, flag)
    }
}

impl<P: PostConvert + ?Sized> PostConvert for Box<P> {
    fn after_convert(&mut self, dir: &Path, flag: PackageFlag) -> Result<(), GengoError> {
        (**self).after_convert(dir, flag)
    }
}

/// A [`Converter`] that delegates to an external program, passing the package
/// directory as its last argument.
pub struct CommandConverter<E> {
    executor: E,
    argv: Vec<String>,
}

impl<E: Executor> CommandConverter<E> {
    pub fn new(config: &Config, executor: E) -> Self {
        Self {
            executor,
            argv: config.toolchain.converter.clone(),
        }
    }
}

impl<E: Executor> Converter for CommandConverter<E> {
    fn convert(&self, dir: &Path) -> Result<(), GengoError> {
        let invocation = Invocation::from_argv(&self.argv)?.arg(dir);
        let execution = self.executor.execute(&invocation);

        match execution.error {
            None => Ok(()),
            Some(err) => {
                let mut reason = format!("failed: {err}");
                let output = String::from_utf8_lossy(&execution.output);
                let output = output.trim_end();
                if !output.is_empty() {
                    reason.push('\n');
                    reason.push_str(output);
                }
                Err(GengoError::Conversion {
                    dir: dir.to_path_buf(),
                    command: invocation.to_string(),
                    reason,
                })
            }
        }
    }
}

/// Walks a source tree, converts every package it finds and collects the
/// errors of the whole run.
///
/// Packages are processed one at a time in discovery order. A failure in one
/// package is recorded and the walk carries on with the next.
pub struct Runner<'a> {
    config: Config,
    converter: Box<dyn Converter + 'a>,
    observer: Option<Box<dyn PostConvert + 'a>>,
    packages: Vec<Package>,
    errors: Vec<GengoError>,
}

impl<'a> Runner<'a> {
    pub fn new(
        config: Config,
        converter: impl Converter + 'a,
        observer: Option<Box<dyn PostConvert + 'a>>,
    ) -> Self {
        Self {
            config,
            converter: Box::new(converter),
            observer,
            packages: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Converts the package in `dir`, and with `recursive` every package in
    /// its subdirectories as well.
    ///
    /// Subdirectories are visited parent first, siblings sorted by name.
    /// Directories whose names start with `.` or `_`, and `testdata`
    /// directories, are not entered.
    pub fn gen_go(&mut self, dir: &Path, recursive: bool) {
        if !recursive {
            self.visit(dir);
            return;
        }

        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_excluded_dir(entry));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => self.visit(entry.path()),
                Ok(_) => {}
                Err(err) => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    log::warn!("cannot read {}: {err}", path.display());
                    let source = err.into_io_error().unwrap_or_else(|| {
                        io::Error::new(io::ErrorKind::Other, "filesystem loop")
                    });
                    self.errors.push(GengoError::Discovery { path, source });
                }
            }
        }
    }

    /// Errors collected so far, in the order they occurred.
    pub fn errors(&self) -> &[GengoError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<GengoError> {
        self.errors
    }

    /// Packages discovered so far, in processing order.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    fn visit(&mut self, dir: &Path) {
        let flag = match classify(dir, &self.config) {
            Ok(Some(flag)) => flag,
            Ok(None) => return,
            Err(source) => {
                log::warn!("cannot read {}: {source}", dir.display());
                self.errors.push(GengoError::Discovery {
                    path: dir.to_path_buf(),
                    source,
                });
                return;
            }
        };

        self.packages.push(Package {
            dir: dir.to_path_buf(),
            flag,
        });

        if flag == PackageFlag::NativeTarget {
            log::debug!("{}: target-language package, skipped", dir.display());
            return;
        }

        log::debug!("{}: converting", dir.display());
        if let Err(err) = self.converter.convert(dir) {
            self.errors.push(err);
            return;
        }

        if let Some(observer) = self.observer.as_mut() {
            if let Err(err) = observer.after_convert(dir, flag) {
                self.errors.push(err);
            }
        }
    }
}

fn is_excluded_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || name == "testdata"
}
