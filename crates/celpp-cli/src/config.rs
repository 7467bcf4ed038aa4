use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use celpp::macros::{self, Macro};
use celpp::ParserOptions;
use clap::ValueEnum;
use serde::Deserialize;

/// Configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "celpp.toml";

/// Names accepted in `[macros] enabled` and `--disable`.
pub const MACRO_NAMES: &[&str] = &["default", "oneof", "index", "unrollmap"];

/// Which `index` macro to register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IndexVariant {
    /// `base.index(f1, ...)`, null when a step is missing
    #[default]
    OrNull,
    /// `base.index(zero, f1, ...)`, `zero` when a step is missing
    WithFallback,
}

/// Application configuration with layered defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub macros: MacroConfig,
    pub parser: ParserConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroConfig {
    /// Macros to expand, by name
    pub enabled: Vec<String>,
    pub index: IndexVariant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    pub max_recursion_depth: usize,
    pub expression_size_limit: usize,
    pub populate_macro_calls: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    /// Log file; empty logs to stdout
    pub file: String,
}

impl Default for Config {
    fn default() -> Self {
        let options = ParserOptions::default();
        Self {
            macros: MacroConfig {
                enabled: MACRO_NAMES.iter().map(|name| name.to_string()).collect(),
                index: IndexVariant::default(),
            },
            parser: ParserConfig {
                max_recursion_depth: options.max_recursion_depth,
                expression_size_limit: options.expression_size_limit,
                populate_macro_calls: options.populate_macro_calls,
            },
            log: LogConfig { level: "warn".to_string(), file: String::new() },
        }
    }
}

impl Config {
    /// Load configuration from defaults and an optional file.
    ///
    /// An explicit `path` must exist; otherwise `celpp.toml` in the working
    /// directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }
        };

        if let Some(file) = file {
            config.merge(Self::load_from_file(&file)?);
        }

        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<PartialConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: PartialConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(config)
    }

    /// Merge partial config into this one (partial takes precedence for specified fields)
    fn merge(&mut self, other: PartialConfig) {
        if let Some(macros) = other.macros {
            if let Some(val) = macros.enabled {
                self.macros.enabled = val;
            }
            if let Some(val) = macros.index {
                self.macros.index = val;
            }
        }
        if let Some(parser) = other.parser {
            if let Some(val) = parser.max_recursion_depth {
                self.parser.max_recursion_depth = val;
            }
            if let Some(val) = parser.expression_size_limit {
                self.parser.expression_size_limit = val;
            }
            if let Some(val) = parser.populate_macro_calls {
                self.parser.populate_macro_calls = val;
            }
        }
        if let Some(log) = other.log {
            if let Some(val) = log.level {
                self.log.level = val;
            }
            if let Some(val) = log.file {
                self.log.file = val;
            }
        }
    }

    /// Apply command-line overrides, the last configuration layer.
    pub fn apply_overrides(
        &mut self,
        index: Option<IndexVariant>,
        disable: &[String],
        verbose: bool,
    ) -> Result<()> {
        if let Some(index) = index {
            self.macros.index = index;
        }
        for name in disable {
            check_macro_name(name)?;
            self.macros.enabled.retain(|enabled| enabled != name);
        }
        if verbose {
            self.log.level = "debug".to_string();
        }
        Ok(())
    }

    /// The enabled macros, with the configured `index` variant.
    pub fn macros(&self) -> Result<Vec<Macro>> {
        self.macros
            .enabled
            .iter()
            .map(|name| {
                check_macro_name(name)?;
                Ok(match name.as_str() {
                    "default" => macros::DEFAULT,
                    "oneof" => macros::ONEOF,
                    "index" => match self.macros.index {
                        IndexVariant::OrNull => macros::INDEX_OR_NULL,
                        IndexVariant::WithFallback => macros::INDEX_WITH_FALLBACK,
                    },
                    _ => macros::UNROLL_MAP,
                })
            })
            .collect()
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            max_recursion_depth: self.parser.max_recursion_depth,
            expression_size_limit: self.parser.expression_size_limit,
            populate_macro_calls: self.parser.populate_macro_calls,
        }
    }
}

fn check_macro_name(name: &str) -> Result<()> {
    if !MACRO_NAMES.contains(&name) {
        bail!("Unknown macro '{}' (expected one of: {})", name, MACRO_NAMES.join(", "));
    }
    Ok(())
}

/// Partial configuration for deserializing from TOML with optional fields
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    macros: Option<PartialMacroConfig>,
    parser: Option<PartialParserConfig>,
    log: Option<PartialLogConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialMacroConfig {
    enabled: Option<Vec<String>>,
    index: Option<IndexVariant>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialParserConfig {
    max_recursion_depth: Option<usize>,
    expression_size_limit: Option<usize>,
    populate_macro_calls: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialLogConfig {
    level: Option<String>,
    file: Option<String>,
}
