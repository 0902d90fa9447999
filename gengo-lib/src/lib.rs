//! `gengo-lib` drives the conversion of Go+ source packages into Go and can
//! check, package by package, that the generated code prints exactly what the
//! original program prints.
//!
//! The pieces compose as follows: a [`Runner`] walks a source tree, hands each
//! package to a [`Converter`] and then to an optional [`PostConvert`]
//! observer. The [`Comparator`] is the observer used for differential
//! testing; it runs both programs through an [`Executor`] and compares their
//! combined console output byte for byte.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::io;
//! use std::path::Path;
//!
//! use gengo_lib::{CommandConverter, Comparator, Config, ProcessExecutor, Runner};
//!
//! let config = Config::default();
//! let converter = CommandConverter::new(&config, ProcessExecutor);
//! let comparator = Comparator::new(&config, ProcessExecutor, io::stderr());
//!
//! let mut runner = Runner::new(config, converter, Some(Box::new(comparator)));
//! runner.gen_go(Path::new("./demo"), true);
//!
//! for err in runner.errors() {
//!     eprintln!("{err}");
//! }
//! ```

pub mod compare;
pub mod config;
pub mod error;
pub mod exec;
pub mod package;
pub mod runner;

pub use crate::compare::{Comparator, ComparisonOutcome};
pub use crate::config::{Config, Toolchain};
pub use crate::error::{GengoError, Side};
pub use crate::exec::{ExecError, Execution, Executor, Invocation, ProcessExecutor};
pub use crate::package::{Package, PackageFlag};
pub use crate::runner::{CommandConverter, Converter, PostConvert, Runner};
