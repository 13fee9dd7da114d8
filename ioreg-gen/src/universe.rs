//! The candidate symbol sets that are probed on every target variant.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The two groups of symbols that are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniverseKind {
    /// Memory mapped I/O registers. The probe captures their address.
    Register,
    /// Memory layout constants such as `RAMEND`. The probe captures their value.
    Constant,
}

impl UniverseKind {
    /// Prefix of the data objects emitted into the probe source for this group.
    pub fn probe_prefix(self) -> &'static str {
        match self {
            UniverseKind::Register => "ioreg_",
            UniverseKind::Constant => "const_",
        }
    }

    /// Character prepended to registry keys of this group.
    ///
    /// `$` is not valid in a C identifier, so a marked key never collides with a register name.
    pub fn key_marker(self) -> Option<char> {
        match self {
            UniverseKind::Register => None,
            UniverseKind::Constant => Some('$'),
        }
    }

    /// The key under which `identifier` is stored in the registry.
    pub fn registry_key(self, identifier: &str) -> String {
        match self.key_marker() {
            Some(marker) => format!("{marker}{identifier}"),
            None => identifier.to_owned(),
        }
    }

    /// Singular noun used in diagnostics.
    pub fn noun(self) -> &'static str {
        match self {
            UniverseKind::Register => "register",
            UniverseKind::Constant => "constant",
        }
    }
}

/// An ordered set of candidate identifiers together with the subset that has to be
/// found on every variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolUniverse {
    pub kind: UniverseKind,
    pub candidates: Vec<String>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl SymbolUniverse {
    pub fn new<I, S>(kind: UniverseKind, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            candidates: candidates.into_iter().map(Into::into).collect(),
            required: Vec::new(),
        }
    }

    /// Marks the given identifiers as required.
    pub fn with_required<I, S>(mut self, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = required.into_iter().map(Into::into).collect();
        self
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.candidates.iter().any(|c| c == identifier)
    }

    /// Position of `identifier` in the candidate list.
    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c == identifier)
    }

    /// Checks that the candidates are usable C identifiers, unique, and that the
    /// required subset only names candidates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for candidate in &self.candidates {
            if !is_c_identifier(candidate) {
                return Err(ConfigError::InvalidIdentifier {
                    kind: self.kind,
                    identifier: candidate.clone(),
                });
            }
            if !seen.insert(candidate.as_str()) {
                return Err(ConfigError::DuplicateCandidate {
                    kind: self.kind,
                    identifier: candidate.clone(),
                });
            }
        }

        if let Some(required) = self.required.iter().find(|r| !seen.contains(r.as_str())) {
            return Err(ConfigError::RequiredNotCandidate {
                kind: self.kind,
                identifier: required.clone(),
            });
        }

        Ok(())
    }
}

/// Validates both universes.
///
/// The two universes may share an identifier: constant keys carry a marker in the registry.
pub fn validate_universes(
    registers: &SymbolUniverse,
    constants: &SymbolUniverse,
) -> Result<(), ConfigError> {
    registers.validate()?;
    constants.validate()
}

fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn constant_keys_are_marked() {
        assert_eq!(UniverseKind::Register.registry_key("SPL"), "SPL");
        assert_eq!(UniverseKind::Constant.registry_key("SPL"), "$SPL");
        assert_ne!(
            UniverseKind::Register.registry_key("RAMEND"),
            UniverseKind::Constant.registry_key("RAMEND")
        );
    }

    #[test]
    fn rejects_required_outside_of_candidates() {
        let universe = SymbolUniverse::new(UniverseKind::Register, ["SPL", "SPH"])
            .with_required(["SREG"]);

        assert!(matches!(
            universe.validate(),
            Err(ConfigError::RequiredNotCandidate { identifier, .. }) if identifier == "SREG"
        ));
    }

    #[test]
    fn rejects_invalid_and_duplicate_names() {
        let invalid = SymbolUniverse::new(UniverseKind::Constant, ["RAM END"]);
        assert!(matches!(
            invalid.validate(),
            Err(ConfigError::InvalidIdentifier { .. })
        ));

        let duplicate = SymbolUniverse::new(UniverseKind::Register, ["SPL", "SPL"]);
        assert!(matches!(
            duplicate.validate(),
            Err(ConfigError::DuplicateCandidate { .. })
        ));
    }

    #[test]
    fn universes_may_share_an_identifier() {
        let registers = SymbolUniverse::new(UniverseKind::Register, ["SPL", "SREG"]);
        let constants = SymbolUniverse::new(UniverseKind::Constant, ["SPL", "RAMEND"]);

        validate_universes(&registers, &constants).unwrap();
    }
}
