use std::path::PathBuf;

use crate::universe::UniverseKind;

/// Problems with the generator configuration, detected before any compiler runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("'{identifier}' in the {} universe is not a valid C identifier", .kind.noun())]
    InvalidIdentifier {
        kind: UniverseKind,
        identifier: String,
    },
    #[error("'{identifier}' is listed twice in the {} universe", .kind.noun())]
    DuplicateCandidate {
        kind: UniverseKind,
        identifier: String,
    },
    #[error("required {} '{identifier}' is not one of the candidates", .kind.noun())]
    RequiredNotCandidate {
        kind: UniverseKind,
        identifier: String,
    },
    #[error("no target variants configured")]
    NoVariants,
    #[error("target variant '{0}' is not a plain file name")]
    InvalidVariant(String),
    #[error("target variant '{0}' is listed more than once")]
    DuplicateVariant(String),
    #[error("target flag '{0}' does not contain the '{{variant}}' placeholder")]
    InvalidTargetFlag(String),
    #[error("configuration file '{}' has an unsupported format", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("failed to load configuration")]
    Load(#[from] Box<figment::Error>),
}

/// Errors of a single compiler invocation.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum ToolchainError {
    /// Failed to run the compiler '{compiler}'.
    Spawn {
        compiler: String,
        source: std::io::Error,
    },
    /// The compiler '{compiler}' does not support the target variant '{variant}': {stderr}
    UnsupportedVariant {
        compiler: String,
        variant: String,
        stderr: String,
    },
    /// The compiler '{compiler}' failed for target variant '{variant}' ({status}): {stderr}
    CompilerFailed {
        compiler: String,
        variant: String,
        status: String,
        stderr: String,
    },
}

/// Errors while reading probe values out of a compiled object.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to parse the object file")]
    Parse(#[from] goblin::error::Error),
    #[error("the object file has no '{0}' section")]
    MissingSection(String),
    #[error("the '{0}' section extends past the end of the object file")]
    TruncatedSection(String),
    #[error(
        "symbol '{symbol}' ({size} bytes at {address:#x}) lies outside of the data section \
         ({base:#x}, {len} bytes)"
    )]
    SymbolOutOfBounds {
        symbol: String,
        address: u64,
        size: u64,
        base: u64,
        len: usize,
    },
    #[error("symbol '{symbol}' is defined in section #{index}, not in the '{section}' section")]
    SymbolNotInSection {
        symbol: String,
        index: usize,
        section: String,
    },
    #[error("symbol '{symbol}' has a size of {size} bytes, which cannot be decoded as an integer")]
    UnsupportedSize { symbol: String, size: u64 },
    #[error("{}", describe_missing(.kind, .names))]
    MissingRequired {
        kind: UniverseKind,
        names: Vec<String>,
    },
}

fn describe_missing(kind: &UniverseKind, names: &[String]) -> String {
    let quoted = names
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");

    if names.len() == 1 {
        format!("required {} {quoted} is missing", kind.noun())
    } else {
        format!("required {}s {quoted} are missing", kind.noun())
    }
}

/// Everything that can go wrong while processing one target variant.
#[derive(Debug, thiserror::Error)]
pub enum VariantError {
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("failed to read the compiled object '{}'", .path.display())]
    ReadObject {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors of a complete generator run.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),
    #[error("failed to render the probe source")]
    ProbeSource(#[from] std::fmt::Error),
    #[error("target variant '{variant}' failed")]
    Variant {
        variant: String,
        source: VariantError,
    },
    #[error("failed to write '{}'", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_missing_identifier_uses_singular() {
        let error = ExtractError::MissingRequired {
            kind: UniverseKind::Register,
            names: vec!["SPL".to_owned()],
        };

        assert_eq!(error.to_string(), "required register 'SPL' is missing");
    }

    #[test]
    fn multiple_missing_identifiers_use_plural() {
        let error = ExtractError::MissingRequired {
            kind: UniverseKind::Constant,
            names: vec!["FLASHEND".to_owned(), "RAMEND".to_owned()],
        };

        assert_eq!(
            error.to_string(),
            "required constants 'FLASHEND', 'RAMEND' are missing"
        );
    }
}
