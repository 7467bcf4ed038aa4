//! CEL preprocessor CLI tool

use std::io::Read;

use anyhow::{anyhow, Context, Result};
use celpp::Preprocessor;
use clap::Parser;

mod cli;
mod config;
mod errors;
mod tree;

use cli::Cli;
use config::{Config, LogConfig};

fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            errors::print_error_with_suggestion(
                "Failed to load configuration",
                &e,
                &format!("Check {} or the command-line flags", describe_config(&cli)),
            );
            std::process::exit(1);
        }
    };

    if let Err(e) = setup_logger(&config.log) {
        errors::print_error("Failed to set up logging", &e);
        std::process::exit(1);
    }

    if let Err(e) = run(&cli, &config) {
        errors::print_error("Preprocessing failed", &e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(cli.index, &cli.disable, cli.verbose)?;
    // Surface bad macro names before reading any input.
    config.macros()?;
    Ok(config)
}

fn describe_config(cli: &Cli) -> String {
    match &cli.config {
        Some(path) => format!("'{}'", path.display()),
        None => format!("'{}'", config::DEFAULT_CONFIG_FILE),
    }
}

fn setup_logger(log: &LogConfig) -> Result<()> {
    let opts = twyg::LoggerOpts {
        colored: true,
        file: log.file.clone(),
        level: log.level.clone(),
        report_caller: false,
    };
    twyg::setup_logger(&opts).map_err(|e| anyhow!("Could not setup logger: {:?}", e))
}

fn run(cli: &Cli, config: &Config) -> Result<()> {
    let pp = Preprocessor::with_options(config.macros()?, config.parser_options())
        .context("Failed to build the macro set")?;

    let input = match &cli.expression {
        Some(expression) => expression.clone(),
        None => read_stdin()?,
    };
    log::debug!("preprocessing {} byte(s) with {} macro(s)", input.len(), pp.registry().len());

    if cli.ast {
        let parsed = pp.process_to_ast(&input)?;
        print!("{}", tree::render(&parsed));
    } else {
        println!("{}", pp.process(&input)?);
    }

    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read expression from stdin")?;
    Ok(input)
}
