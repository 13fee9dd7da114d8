mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ioreg_gen::OutputFormat;

use crate::logging::{setup_logging, LevelFilter};

#[derive(clap::Parser)]
#[clap(
    name = "ioreg-gen",
    about = "Generate per-MCU I/O register and memory layout tables by probing a C toolchain",
    version
)]
struct Cli {
    #[clap(subcommand)]
    subcommand: Command,

    /// The log level, overrides RUST_LOG.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LevelFilter>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Compile the probe for every target variant and write the register table.
    Generate {
        /// Configuration file (TOML, JSON or YAML) merged over the built-in defaults.
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// The compiler driver to invoke.
        #[arg(long)]
        compiler: Option<String>,
        /// Where to write the generated file.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Keep the probe source and compiled objects in this directory.
        #[arg(long)]
        build_dir: Option<PathBuf>,
        /// Only process the given target variant. Can be given multiple times.
        #[arg(long = "variant", value_name = "VARIANT")]
        variants: Vec<String>,
        /// Format of the generated file.
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// List the macros the compiler predefines for a target variant.
    Defines {
        /// The target variant, e.g. `atmega8`.
        variant: String,
        /// Configuration file (TOML, JSON or YAML) merged over the built-in defaults.
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// The compiler driver to invoke.
        #[arg(long)]
        compiler: Option<String>,
        /// Only list macros starting with this prefix.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Print the probe source compiled for every target variant.
    Probe {
        /// Configuration file (TOML, JSON or YAML) merged over the built-in defaults.
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("\nError:");
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level);

    match cli.subcommand {
        Command::Generate {
            config,
            compiler,
            output,
            build_dir,
            variants,
            format,
        } => commands::generate::cmd_generate(commands::generate::GenerateOptions {
            config,
            compiler,
            output,
            build_dir,
            variants,
            format,
        })?,
        Command::Defines {
            variant,
            config,
            compiler,
            filter,
        } => commands::defines::cmd_defines(
            config.as_deref(),
            compiler,
            &variant,
            filter.as_deref(),
        )?,
        Command::Probe { config } => commands::probe::cmd_probe(config.as_deref())?,
    }

    Ok(())
}
