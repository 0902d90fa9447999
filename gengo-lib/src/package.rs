//! Package classification.

use crate::config::Config;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// How a discovered package takes part in a conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFlag {
    /// Holds source-language files; converted and eligible for verification.
    Ordinary,
    /// Already written in the target language; never converted or verified.
    NativeTarget,
}

/// A directory that the runner recognised as a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub dir: PathBuf,
    pub flag: PackageFlag,
}

/// Inspects the files directly inside `dir` and decides whether it is a package.
///
/// A directory with at least one source file is [`PackageFlag::Ordinary`], even
/// when target files sit next to them. The autogen artifact left by an earlier
/// conversion does not count as a target file. Returns `Ok(None)` for
/// directories that contain neither.
pub fn classify(dir: &Path, config: &Config) -> io::Result<Option<PackageFlag>> {
    let mut has_source = false;
    let mut has_target = false;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };

        if ext == config.source_ext {
            has_source = true;
            break;
        }
        if ext == config.target_ext && entry.file_name() != config.autogen_file.as_str() {
            has_target = true;
        }
    }

    Ok(if has_source {
        Some(PackageFlag::Ordinary)
    } else if has_target {
        Some(PackageFlag::NativeTarget)
    } else {
        None
    })
}
