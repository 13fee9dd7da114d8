use std::path::Path;

use anyhow::{Context, Result};
use ioreg_gen::ShellRunner;

use super::load_config;

/// Lists the compiler's predefined macros for `variant`.
///
/// Useful to find candidates for the constant universe.
pub fn cmd_defines(
    config: Option<&Path>,
    compiler: Option<String>,
    variant: &str,
    filter: Option<&str>,
) -> Result<()> {
    let config = load_config(config, compiler)?;

    let defines = config
        .toolchain()
        .predefined_macros(&ShellRunner, variant)
        .with_context(|| format!("Failed to list the predefined macros of '{variant}'"))?;

    for define in defines
        .iter()
        .filter(|define| filter.map_or(true, |prefix| define.name.starts_with(prefix)))
    {
        println!("{} {}", define.name, define.value);
    }

    Ok(())
}
