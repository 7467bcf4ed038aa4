//! CLI argument parsing

use std::path::PathBuf;

use clap::Parser;

use crate::config::IndexVariant;

#[derive(Parser)]
#[command(name = "celpp")]
#[command(version, long_about = None)]
#[command(about = "CEL Preprocessor: expands parse-time macros into plain CEL")]
#[command(after_help = "Reads the expression from stdin when EXPRESSION is omitted.")]
pub struct Cli {
    /// CEL expression to preprocess
    pub expression: Option<String>,

    /// Configuration file (defaults to ./celpp.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fallback behavior of the index macro
    #[arg(long, value_enum)]
    pub index: Option<IndexVariant>,

    /// Leave a macro unexpanded (default, oneof, index, unrollmap); repeatable
    #[arg(long, value_name = "NAME")]
    pub disable: Vec<String>,

    /// Print the expanded tree with source positions instead of CEL text
    #[arg(long)]
    pub ast: bool,

    /// Log every macro expansion
    #[arg(short, long)]
    pub verbose: bool,
}
