//! Toolchain configuration, loaded from an optional TOML file.

use crate::error::GengoError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

fn default_source_ext() -> String {
    "gop".to_string()
}

fn default_target_ext() -> String {
    "go".to_string()
}

fn default_autogen_file() -> String {
    "gop_autogen.go".to_string()
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
/// Describes the languages involved and where to find their tools.
pub struct Config {
    /// Extension (without the dot) of source-language files.
    #[serde(default = "default_source_ext")]
    pub source_ext: String,
    /// Extension (without the dot) of target-language files.
    #[serde(default = "default_target_ext")]
    pub target_ext: String,
    /// Name of the artifact the converter writes into each package directory.
    #[serde(default = "default_autogen_file")]
    pub autogen_file: String,
    #[serde(default)]
    pub toolchain: Toolchain,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_ext: default_source_ext(),
            target_ext: default_target_ext(),
            autogen_file: default_autogen_file(),
            toolchain: Toolchain::default(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
/// Argument vector prefixes for the external programs. The package directory
/// (or the artifact path for `run_converted`) is appended as the last argument.
pub struct Toolchain {
    /// Converts one source package into the target language. It is run once
    /// per package and must not descend into subdirectories itself.
    #[serde(default = "default_converter")]
    pub converter: Vec<String>,
    /// Runs a single target-language file.
    #[serde(default = "default_run_converted")]
    pub run_converted: Vec<String>,
    /// Runs a source package with logging suppressed.
    #[serde(default = "default_run_original")]
    pub run_original: Vec<String>,
}

fn default_converter() -> Vec<String> {
    vec!["gop".to_string(), "go".to_string()]
}

fn default_run_converted() -> Vec<String> {
    vec!["go".to_string(), "run".to_string()]
}

fn default_run_original() -> Vec<String> {
    vec!["gop".to_string(), "run".to_string(), "-quiet".to_string()]
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            converter: default_converter(),
            run_converted: default_run_converted(),
            run_original: default_run_original(),
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml(text: &str) -> Result<Self, GengoError> {
        let config: Config =
            toml::from_str(text).map_err(|err| GengoError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, GengoError> {
        let text = fs::read_to_string(path).map_err(|err| {
            GengoError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<(), GengoError> {
        let commands = [
            ("toolchain.converter", &self.toolchain.converter),
            ("toolchain.run_converted", &self.toolchain.run_converted),
            ("toolchain.run_original", &self.toolchain.run_original),
        ];
        for (key, argv) in commands {
            if argv.first().map_or(true, |program| program.is_empty()) {
                return Err(GengoError::Config(format!("`{key}` must name a program")));
            }
        }

        for (key, value) in [
            ("source_ext", &self.source_ext),
            ("target_ext", &self.target_ext),
            ("autogen_file", &self.autogen_file),
        ] {
            if value.is_empty() {
                return Err(GengoError::Config(format!("`{key}` must not be empty")));
            }
        }

        Ok(())
    }
}
