//! Generates a per-MCU table of I/O register addresses and memory layout constants.
//!
//! The values are not parsed out of device headers. Instead a small probe program is
//! compiled for every target variant, and the addresses and values the compiler emitted
//! are read back from the data section of the resulting ELF file.

pub mod codegen;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod probe;
pub mod registry;
pub mod toolchain;
pub mod universe;

pub use codegen::OutputFormat;
pub use config::GeneratorConfig;
pub use error::{ConfigError, ExtractError, GenerateError, ToolchainError, VariantError};
pub use pipeline::{generate, Pipeline};
pub use registry::{ExtractedEntry, Registry, VariantTable};
pub use toolchain::{CommandRunner, ShellRunner, ToolOutput, Toolchain};
pub use universe::{SymbolUniverse, UniverseKind};
