use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use ioreg_gen::{generate, OutputFormat, ShellRunner};

use super::load_config;

pub struct GenerateOptions {
    pub config: Option<PathBuf>,
    pub compiler: Option<String>,
    pub output: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub variants: Vec<String>,
    pub format: OutputFormat,
}

/// Probes every configured variant and writes the register table.
pub fn cmd_generate(options: GenerateOptions) -> Result<()> {
    let instant = Instant::now();

    let mut config = load_config(options.config.as_deref(), options.compiler)?;

    if let Some(output) = options.output {
        config.output = output;
    }
    if options.build_dir.is_some() {
        config.build_dir = options.build_dir;
    }
    if !options.variants.is_empty() {
        config.variants = options.variants;
    }

    let registry = generate(&config, &ShellRunner, options.format)
        .context("Failed to generate the register table")?;

    println!(
        "    {} {} target variant(s) in {:.2}s",
        "Generated".green().bold(),
        registry.variants().len(),
        instant.elapsed().as_secs_f32(),
    );
    for table in registry.variants() {
        println!(
            "\t{}: {} registers, {} constants",
            table.variant,
            table.registers.len(),
            table.constants.len()
        );
    }
    println!("\t-> {}", config.output.display());

    Ok(())
}
