//! Invocation of the target C compiler.

use std::ffi::OsString;
use std::io;
use std::path::Path;

use serde::Serialize;
use xshell::Shell;

use crate::error::ToolchainError;

/// Placeholder in the target flag that is replaced with the variant name.
pub const VARIANT_PLACEHOLDER: &str = "{variant}";

/// Compiler diagnostics which mean the requested target is unknown to the toolchain.
const UNSUPPORTED_VARIANT_MARKERS: &[&str] = &[
    "unknown MCU",
    "unrecognized argument in option",
    "unknown target",
];

/// The captured result of running an external program.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub status_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    fn status(&self) -> String {
        match self.status_code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_owned(),
        }
    }
}

/// Runs an external program to completion.
///
/// A nonzero exit status is not an error on this level, it is reported through
/// [`ToolOutput::success`].
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<ToolOutput>;
}

/// Runs programs through an [`xshell::Shell`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, program: &str, args: &[OsString]) -> io::Result<ToolOutput> {
        let sh = Shell::new().map_err(io::Error::other)?;

        tracing::debug!("Running {} {:?}", program, args);

        let output = sh
            .cmd(program)
            .args(args)
            .quiet()
            .ignore_status()
            .output()
            .map_err(io::Error::other)?;

        Ok(ToolOutput {
            success: output.status.success(),
            status_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// A compiler driver together with the flags needed to select a target variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub compiler: String,
    /// Flag selecting the target, containing [`VARIANT_PLACEHOLDER`].
    pub target_flag: String,
    /// Additional flags passed to every invocation.
    pub flags: Vec<String>,
}

impl Toolchain {
    pub fn new(compiler: impl Into<String>, target_flag: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            target_flag: target_flag.into(),
            flags: Vec::new(),
        }
    }

    pub fn target_flag(&self, variant: &str) -> String {
        self.target_flag.replace(VARIANT_PLACEHOLDER, variant)
    }

    /// Compiles `source` for `variant` into `destination`.
    pub fn compile(
        &self,
        runner: &dyn CommandRunner,
        source: &Path,
        variant: &str,
        destination: &Path,
    ) -> Result<(), ToolchainError> {
        let mut args: Vec<OsString> = vec![
            source.into(),
            "-o".into(),
            destination.into(),
            self.target_flag(variant).into(),
        ];
        args.extend(self.flags.iter().map(OsString::from));

        tracing::info!("Compiling probe for {}", variant);

        let output = self.invoke(runner, &args)?;
        self.check(variant, &output)
    }

    /// Lists the macros the compiler predefines for `variant`, as `gcc -dD` reports them.
    pub fn predefined_macros(
        &self,
        runner: &dyn CommandRunner,
        variant: &str,
    ) -> Result<Vec<Define>, ToolchainError> {
        let empty = tempfile::Builder::new()
            .prefix("ioreg-gen")
            .suffix(".c")
            .tempfile()
            .map_err(|source| ToolchainError::Spawn {
                compiler: self.compiler.clone(),
                source,
            })?;

        let mut args: Vec<OsString> = self.flags.iter().map(OsString::from).collect();
        args.push(self.target_flag(variant).into());
        args.extend(["-E", "-P", "-dD"].map(OsString::from));
        args.push(empty.path().into());

        let output = self.invoke(runner, &args)?;
        self.check(variant, &output)?;

        Ok(parse_defines(&String::from_utf8_lossy(&output.stdout)))
    }

    fn invoke(
        &self,
        runner: &dyn CommandRunner,
        args: &[OsString],
    ) -> Result<ToolOutput, ToolchainError> {
        runner
            .run(&self.compiler, args)
            .map_err(|source| ToolchainError::Spawn {
                compiler: self.compiler.clone(),
                source,
            })
    }

    fn check(&self, variant: &str, output: &ToolOutput) -> Result<(), ToolchainError> {
        if output.success {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();

        if UNSUPPORTED_VARIANT_MARKERS
            .iter()
            .any(|marker| stderr.contains(marker))
        {
            return Err(ToolchainError::UnsupportedVariant {
                compiler: self.compiler.clone(),
                variant: variant.to_owned(),
                stderr,
            });
        }

        Err(ToolchainError::CompilerFailed {
            compiler: self.compiler.clone(),
            variant: variant.to_owned(),
            status: output.status(),
            stderr,
        })
    }
}

/// A single object-like macro definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Define {
    pub name: String,
    pub value: String,
}

/// Parses the `#define NAME VALUE` lines of preprocessor output.
///
/// Function-like macros are skipped, they cannot be probed.
pub fn parse_defines(output: &str) -> Vec<Define> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("#define "))
        .filter_map(|definition| {
            let definition = definition.trim_start();
            let (name, value) = match definition.split_once(char::is_whitespace) {
                Some((name, value)) => (name, value.trim()),
                None => (definition, ""),
            };

            if name.is_empty() || name.contains('(') {
                return None;
            }

            Some(Define {
                name: name.to_owned(),
                value: value.to_owned(),
            })
        })
        .collect()
}
