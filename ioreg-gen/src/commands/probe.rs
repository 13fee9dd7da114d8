use std::path::Path;

use anyhow::Result;
use ioreg_gen::{Pipeline, ShellRunner};

use super::load_config;

/// Prints the probe source for the configured universes.
pub fn cmd_probe(config: Option<&Path>) -> Result<()> {
    let config = load_config(config, None)?;

    let pipeline = Pipeline::new(&config, &ShellRunner)?;
    print!("{}", pipeline.probe_source()?);

    Ok(())
}
