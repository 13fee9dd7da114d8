use serde::Serialize;

use crate::universe::UniverseKind;

/// A probed identifier together with the value read from the compiled object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedEntry {
    pub identifier: String,
    pub value: u64,
}

impl ExtractedEntry {
    pub fn new(identifier: impl Into<String>, value: u64) -> Self {
        Self {
            identifier: identifier.into(),
            value,
        }
    }
}

/// Everything found for one target variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantTable {
    pub variant: String,
    pub registers: Vec<ExtractedEntry>,
    pub constants: Vec<ExtractedEntry>,
}

impl VariantTable {
    /// All entries of the variant keyed the way the registry stores them.
    ///
    /// Registers come first and use their plain name, constants carry the marker.
    pub fn entries(&self) -> impl Iterator<Item = (String, u64)> + '_ {
        let registers = self
            .registers
            .iter()
            .map(|entry| (UniverseKind::Register, entry));
        let constants = self
            .constants
            .iter()
            .map(|entry| (UniverseKind::Constant, entry));

        registers
            .chain(constants)
            .map(|(kind, entry)| (kind.registry_key(&entry.identifier), entry.value))
    }

    pub fn len(&self) -> usize {
        self.registers.len() + self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The per-variant table of register addresses and layout constants.
///
/// Variants keep the order in which they were configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Registry {
    variants: Vec<VariantTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: VariantTable) {
        self.variants.push(table);
    }

    pub fn variants(&self) -> &[VariantTable] {
        &self.variants
    }

    pub fn get(&self, variant: &str) -> Option<&VariantTable> {
        self.variants.iter().find(|table| table.variant == variant)
    }

    /// Looks up a registry key (constants with their marker) for a variant.
    pub fn lookup(&self, variant: &str, key: &str) -> Option<u64> {
        self.get(variant)?
            .entries()
            .find_map(|(candidate, value)| (candidate == key).then_some(value))
    }
}
