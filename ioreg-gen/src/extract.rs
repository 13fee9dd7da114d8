//! Reading probe values back out of a compiled object.

use std::collections::HashSet;

use goblin::elf::section_header::SHN_UNDEF;

use crate::error::ExtractError;
use crate::registry::ExtractedEntry;
use crate::universe::SymbolUniverse;

/// Name of the ELF section holding the symbol table.
pub const SYMTAB_SECTION: &str = ".symtab";

/// Name of the initialized data section of a GCC produced object.
pub const DEFAULT_DATA_SECTION: &str = ".data";

/// The initialized data section of a compiled object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSection {
    pub name: String,
    /// Index of the section header, as referenced by `st_shndx`.
    pub index: usize,
    /// Virtual address of the first byte of the section.
    pub address: u64,
    pub bytes: Vec<u8>,
}

/// A defined symbol of the compiled object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSymbol {
    pub name: String,
    /// Index of the section the symbol is defined in.
    pub section: usize,
    pub address: u64,
    pub size: u64,
}

impl ObjectSymbol {
    pub fn new(name: impl Into<String>, section: usize, address: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            section,
            address,
            size,
        }
    }
}

/// The parts of a compiled object the extractor needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectImage {
    pub data: DataSection,
    pub symbols: Vec<ObjectSymbol>,
}

impl ObjectImage {
    /// Parses an ELF file and collects its data section and symbol table.
    pub fn parse(buffer: &[u8], data_section: &str) -> Result<Self, ExtractError> {
        let elf = goblin::elf::Elf::parse(buffer)?;

        let section_name = |sh: &goblin::elf::SectionHeader| elf.shdr_strtab.get_at(sh.sh_name);

        // The data section has to be resolved first, every symbol address is relative to it.
        let (data_index, data_header) = elf
            .section_headers
            .iter()
            .enumerate()
            .find(|(_, sh)| section_name(*sh) == Some(data_section))
            .ok_or_else(|| ExtractError::MissingSection(data_section.to_owned()))?;

        let has_symtab = elf
            .section_headers
            .iter()
            .any(|sh| section_name(sh) == Some(SYMTAB_SECTION));
        if !has_symtab {
            return Err(ExtractError::MissingSection(SYMTAB_SECTION.to_owned()));
        }

        let range = data_header.file_range().unwrap_or_default();
        let bytes = buffer
            .get(range)
            .ok_or_else(|| ExtractError::TruncatedSection(data_section.to_owned()))?
            .to_vec();

        tracing::debug!(
            "Section {} (#{}) at {:#010x}, {} bytes",
            data_section,
            data_index,
            data_header.sh_addr,
            bytes.len()
        );

        let symbols = elf
            .syms
            .iter()
            .filter(|sym| sym.st_shndx != SHN_UNDEF as usize)
            .filter_map(|sym| {
                let name = elf.strtab.get_at(sym.st_name)?;
                Some(ObjectSymbol::new(
                    name,
                    sym.st_shndx,
                    sym.st_value,
                    sym.st_size,
                ))
            })
            .collect();

        Ok(Self {
            data: DataSection {
                name: data_section.to_owned(),
                index: data_index,
                address: data_header.sh_addr,
                bytes,
            },
            symbols,
        })
    }

    /// Decodes the little endian value stored for `symbol` in the data section.
    ///
    /// Symbols defined in any other section are rejected, their address says nothing
    /// about the data section's contents.
    pub fn read_value(&self, symbol: &ObjectSymbol) -> Result<u64, ExtractError> {
        if symbol.section != self.data.index {
            return Err(ExtractError::SymbolNotInSection {
                symbol: symbol.name.clone(),
                index: symbol.section,
                section: self.data.name.clone(),
            });
        }

        if symbol.size > 8 {
            return Err(ExtractError::UnsupportedSize {
                symbol: symbol.name.clone(),
                size: symbol.size,
            });
        }

        let out_of_bounds = || ExtractError::SymbolOutOfBounds {
            symbol: symbol.name.clone(),
            address: symbol.address,
            size: symbol.size,
            base: self.data.address,
            len: self.data.bytes.len(),
        };

        let start = symbol
            .address
            .checked_sub(self.data.address)
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or_else(out_of_bounds)?;
        let end = start
            .checked_add(symbol.size as usize)
            .ok_or_else(out_of_bounds)?;
        let bytes = self.data.bytes.get(start..end).ok_or_else(out_of_bounds)?;

        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |value, &byte| (value << 8) | u64::from(byte)))
    }
}

/// Collects the values of all probes of `universe` and checks the required subset.
///
/// The entries are returned in the order of the universe's candidates.
pub fn extract_universe(
    image: &ObjectImage,
    universe: &SymbolUniverse,
) -> Result<Vec<ExtractedEntry>, ExtractError> {
    let prefix = universe.kind.probe_prefix();
    let mut entries = Vec::new();

    for symbol in &image.symbols {
        let Some(identifier) = symbol.name.strip_prefix(prefix) else {
            continue;
        };

        if !universe.contains(identifier) {
            tracing::warn!(
                "Ignoring probe symbol {} which is not a known {}",
                symbol.name,
                universe.kind.noun()
            );
            continue;
        }

        if symbol.size == 0 {
            tracing::debug!("Skipping zero sized symbol {}", symbol.name);
            continue;
        }

        if entries
            .iter()
            .any(|entry: &ExtractedEntry| entry.identifier == identifier)
        {
            tracing::debug!("Skipping duplicate symbol {}", symbol.name);
            continue;
        }

        let value = image.read_value(symbol)?;
        tracing::debug!("{} = {:#x}", identifier, value);

        entries.push(ExtractedEntry::new(identifier, value));
    }

    entries.sort_by_key(|entry| universe.position(&entry.identifier));

    check_required(universe, &entries)?;

    Ok(entries)
}

fn check_required(
    universe: &SymbolUniverse,
    entries: &[ExtractedEntry],
) -> Result<(), ExtractError> {
    let found = entries
        .iter()
        .map(|entry| entry.identifier.as_str())
        .collect::<HashSet<_>>();

    let missing = universe
        .required
        .iter()
        .filter(|required| !found.contains(required.as_str()))
        .cloned()
        .collect::<Vec<_>>();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ExtractError::MissingRequired {
            kind: universe.kind,
            names: missing,
        })
    }
}
