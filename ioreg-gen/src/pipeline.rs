use std::path::{Path, PathBuf};

use crate::codegen::{write_atomically, OutputFormat};
use crate::config::GeneratorConfig;
use crate::error::{ConfigError, GenerateError, VariantError};
use crate::extract::{extract_universe, ObjectImage};
use crate::probe::synthesize;
use crate::registry::{Registry, VariantTable};
use crate::toolchain::{CommandRunner, Toolchain};
use crate::universe::SymbolUniverse;

/// File name of the probe source inside the build directory.
pub const PROBE_SOURCE: &str = "detector.c";

/// Compiles the probe for every configured variant and collects the results.
pub struct Pipeline<'a> {
    runner: &'a dyn CommandRunner,
    toolchain: Toolchain,
    header: String,
    data_section: String,
    registers: SymbolUniverse,
    constants: SymbolUniverse,
    variants: Vec<String>,
}

impl<'a> Pipeline<'a> {
    /// Validates `config` and prepares a run with it.
    pub fn new(
        config: &GeneratorConfig,
        runner: &'a dyn CommandRunner,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            runner,
            toolchain: config.toolchain(),
            header: config.toolchain.header.clone(),
            data_section: config.toolchain.data_section.clone(),
            registers: config.register_universe(),
            constants: config.constant_universe(),
            variants: config.variants.clone(),
        })
    }

    /// The probe source compiled for every variant.
    pub fn probe_source(&self) -> Result<String, std::fmt::Error> {
        synthesize(&self.header, &self.registers, &self.constants)
    }

    /// Runs the probe for every variant, writing intermediate files into `build_dir`.
    ///
    /// The first failing variant aborts the run.
    pub fn run(&self, build_dir: &Path) -> Result<Registry, GenerateError> {
        std::fs::create_dir_all(build_dir).map_err(|source| GenerateError::Write {
            path: build_dir.to_path_buf(),
            source,
        })?;

        let source_path = build_dir.join(PROBE_SOURCE);
        std::fs::write(&source_path, self.probe_source()?).map_err(|source| {
            GenerateError::Write {
                path: source_path.clone(),
                source,
            }
        })?;

        let mut registry = Registry::new();
        for variant in &self.variants {
            let table = self
                .process_variant(&source_path, build_dir, variant)
                .map_err(|source| GenerateError::Variant {
                    variant: variant.clone(),
                    source,
                })?;

            tracing::info!(
                "Found {} registers and {} constants for {}",
                table.registers.len(),
                table.constants.len(),
                variant
            );

            registry.push(table);
        }

        Ok(registry)
    }

    fn process_variant(
        &self,
        source: &Path,
        build_dir: &Path,
        variant: &str,
    ) -> Result<VariantTable, VariantError> {
        let object_path = object_path(build_dir, variant);

        self.toolchain
            .compile(self.runner, source, variant, &object_path)?;

        let buffer = std::fs::read(&object_path).map_err(|source| VariantError::ReadObject {
            path: object_path.clone(),
            source,
        })?;

        let image = ObjectImage::parse(&buffer, &self.data_section)?;

        Ok(VariantTable {
            variant: variant.to_owned(),
            registers: extract_universe(&image, &self.registers)?,
            constants: extract_universe(&image, &self.constants)?,
        })
    }
}

/// Path of the compiled object of `variant`, distinct for every variant.
///
/// Variant names are checked by [`GeneratorConfig::validate`] to be plain file names.
pub fn object_path(build_dir: &Path, variant: &str) -> PathBuf {
    build_dir.join(format!("{variant}.elf"))
}

/// Builds the registry and writes it to `config.output`.
///
/// Intermediate files go to `config.build_dir`, or to a temporary directory that is
/// removed afterwards.
pub fn generate(
    config: &GeneratorConfig,
    runner: &dyn CommandRunner,
    format: OutputFormat,
) -> Result<Registry, GenerateError> {
    let pipeline = Pipeline::new(config, runner)?;

    let registry = match &config.build_dir {
        Some(build_dir) => pipeline.run(build_dir)?,
        None => {
            let build_dir = tempfile::Builder::new()
                .prefix("ioreg-gen")
                .tempdir()
                .map_err(|source| GenerateError::Write {
                    path: std::env::temp_dir(),
                    source,
                })?;
            pipeline.run(build_dir.path())?
        }
    };

    write_atomically(&config.output, &format.render(&registry)).map_err(|source| {
        GenerateError::Write {
            path: config.output.clone(),
            source,
        }
    })?;

    Ok(registry)
}
