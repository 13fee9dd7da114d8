use std::collections::HashSet;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::toolchain::{Toolchain, VARIANT_PLACEHOLDER};
use crate::universe::{validate_universes, SymbolUniverse, UniverseKind};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// Prefix of environment variables overriding configuration values,
/// e.g. `IOREG_GEN_TOOLCHAIN__COMPILER`.
const ENV_PREFIX: &str = "IOREG_GEN_";

/// The complete input of a generator run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    pub toolchain: ToolchainConfig,
    pub registers: UniverseConfig,
    pub constants: UniverseConfig,
    /// Target variants in the order they appear in the output.
    pub variants: Vec<String>,
    /// The generated source file.
    pub output: PathBuf,
    /// Directory for the probe source and compiled objects.
    /// A temporary directory is used when this is not set.
    #[serde(default)]
    pub build_dir: Option<PathBuf>,
}

/// How to invoke the target compiler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    pub compiler: String,
    pub target_flag: String,
    /// Device header included by the probe source.
    pub header: String,
    pub data_section: String,
    #[serde(default)]
    pub flags: Vec<String>,
}

/// Candidates and required subset of one universe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UniverseConfig {
    pub candidates: Vec<String>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl UniverseConfig {
    fn universe(&self, kind: UniverseKind) -> SymbolUniverse {
        SymbolUniverse::new(kind, self.candidates.iter().cloned())
            .with_required(self.required.iter().cloned())
    }
}

impl GeneratorConfig {
    /// The built-in configuration for the AVR toolchain.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::extract(Self::base())
    }

    /// Loads the built-in configuration, merges `path` on top and applies
    /// `IOREG_GEN_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Self::base();

        if let Some(path) = path {
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                Some("yml" | "yaml") => figment.merge(Yaml::file(path)),
                _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
            };
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn base() -> Figment {
        Figment::new().merge(Toml::string(DEFAULT_CONFIG))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(|error| ConfigError::Load(Box::new(error)))
    }

    pub fn register_universe(&self) -> SymbolUniverse {
        self.registers.universe(UniverseKind::Register)
    }

    pub fn constant_universe(&self) -> SymbolUniverse {
        self.constants.universe(UniverseKind::Constant)
    }

    pub fn toolchain(&self) -> Toolchain {
        let mut toolchain = Toolchain::new(
            self.toolchain.compiler.clone(),
            self.toolchain.target_flag.clone(),
        );
        toolchain.flags.clone_from(&self.toolchain.flags);
        toolchain
    }

    /// Checks the configuration for mistakes that would only surface after compiling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.toolchain.target_flag.contains(VARIANT_PLACEHOLDER) {
            return Err(ConfigError::InvalidTargetFlag(
                self.toolchain.target_flag.clone(),
            ));
        }

        if self.variants.is_empty() {
            return Err(ConfigError::NoVariants);
        }

        // Variants name the compiled objects inside the build directory.
        if let Some(variant) = self.variants.iter().find(|v| !is_file_name(v)) {
            return Err(ConfigError::InvalidVariant(variant.clone()));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = self.variants.iter().find(|v| !seen.insert(v.as_str())) {
            return Err(ConfigError::DuplicateVariant(duplicate.clone()));
        }

        validate_universes(&self.register_universe(), &self.constant_universe())
    }
}

fn is_file_name(variant: &str) -> bool {
    !variant.is_empty()
        && variant != "."
        && variant != ".."
        && !variant.contains(['/', '\\'])
}
