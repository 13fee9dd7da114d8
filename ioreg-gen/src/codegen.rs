//! Serialization of a [`Registry`] into the files consumed by the emulator.

use std::io::{self, Write};
use std::path::Path;

use proc_macro2::{Literal, TokenStream};
use serde::{Deserialize, Serialize};

use crate::registry::{Registry, VariantTable};
use crate::universe::UniverseKind;

const GENERATED_HEADER: &str = "// GENERATED - DO NOT EDIT!\n\n";

/// Format of the generated artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A Rust module with a `McuIoRegistersService`.
    #[default]
    Rust,
    /// The registry as JSON, for inspection.
    Json,
}

impl OutputFormat {
    pub fn render(self, registry: &Registry) -> String {
        match self {
            OutputFormat::Rust => render_rust(registry),
            OutputFormat::Json => render_json(registry),
        }
    }
}

/// Renders the registry as a Rust module.
///
/// The module exposes `McuIoRegistersService::get_mcu_registers`, which returns the map of
/// a variant or `None` for an unknown variant. Constants are stored with `CONSTANT_MARKER`
/// prepended to their name.
pub fn render_rust(registry: &Registry) -> String {
    let variants = registry.variants().iter().map(variant_tokens);

    let marker = UniverseKind::Constant.key_marker().map(|marker| {
        quote::quote! {
            pub const CONSTANT_MARKER: char = #marker;
        }
    });

    let stream = quote::quote! {
        use std::collections::HashMap;

        pub type IoRegAddrs = HashMap<&'static str, usize>;

        #marker

        pub struct McuIoRegistersService {
            mcus: HashMap<&'static str, IoRegAddrs>,
        }

        #[allow(clippy::all)]
        impl McuIoRegistersService {
            pub fn new() -> McuIoRegistersService {
                let mut mcus: HashMap<&'static str, IoRegAddrs> = HashMap::new();
                #(#variants)*
                McuIoRegistersService { mcus }
            }

            pub fn get_mcu_registers(&self, mcu: &str) -> Option<&IoRegAddrs> {
                self.mcus.get(mcu)
            }
        }

        impl Default for McuIoRegistersService {
            fn default() -> Self {
                Self::new()
            }
        }
    };

    format!("{GENERATED_HEADER}{stream}\n")
}

fn variant_tokens(table: &VariantTable) -> TokenStream {
    let variant = &table.variant;
    let (keys, values): (Vec<_>, Vec<_>) = table
        .entries()
        .map(|(key, value)| (key, Literal::u64_unsuffixed(value)))
        .unzip();

    quote::quote! {
        mcus.insert(#variant, HashMap::from([#((#keys, #values)),*]));
    }
}

/// Renders the registry as pretty printed JSON.
pub fn render_json(registry: &Registry) -> String {
    // A registry only consists of strings and integers, serializing it cannot fail.
    let mut json = serde_json::to_string_pretty(registry).unwrap_or_default();
    json.push('\n');
    json
}

/// Replaces `path` with `contents`.
///
/// The data is written to a temporary file next to `path` first and moved into place
/// afterwards, so an interrupted run never leaves a partial file behind.
pub fn write_atomically(path: &Path, contents: &str) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(contents.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;

    Ok(())
}
