pub mod defines;
pub mod generate;
pub mod probe;

use std::path::Path;

use anyhow::{Context, Result};
use ioreg_gen::GeneratorConfig;

/// Loads the configuration, applying a compiler given on the command line last.
fn load_config(config: Option<&Path>, compiler: Option<String>) -> Result<GeneratorConfig> {
    let mut loaded = GeneratorConfig::load(config).with_context(|| match config {
        Some(path) => format!("Failed to load configuration from '{}'", path.display()),
        None => "Failed to load the built-in configuration".to_owned(),
    })?;

    if let Some(compiler) = compiler {
        loaded.toolchain.compiler = compiler;
    }

    Ok(loaded)
}
