//! Generation of the C source that is compiled for every target variant.
//!
//! Each candidate becomes a global data object guarded by `#ifdef`. A candidate that
//! does not exist on a variant is simply not emitted, so its absence can be told apart
//! from a value of zero.

use std::fmt::Write;

use crate::universe::{SymbolUniverse, UniverseKind};

/// Type of the register probes. The value stored is the register address.
const REGISTER_PROBE_TYPE: &str = "io_ptr_t";

/// Type of the constant probes, wide enough for any layout constant.
const CONSTANT_PROBE_TYPE: &str = "uint32_t";

/// Renders the probe source for the given universes.
///
/// `header` is the device header that defines the candidates, e.g. `avr/io.h`.
pub fn synthesize(
    header: &str,
    registers: &SymbolUniverse,
    constants: &SymbolUniverse,
) -> Result<String, std::fmt::Error> {
    let mut source = String::new();
    render(&mut source, header, registers, constants)?;

    Ok(source)
}

fn render(
    out: &mut String,
    header: &str,
    registers: &SymbolUniverse,
    constants: &SymbolUniverse,
) -> std::fmt::Result {
    writeln!(out, "/* GENERATED - DO NOT EDIT! */")?;
    writeln!(out)?;
    writeln!(out, "#include <{header}>")?;
    writeln!(out, "#include <stdint.h>")?;
    writeln!(out)?;
    writeln!(out, "typedef volatile void *{REGISTER_PROBE_TYPE};")?;
    writeln!(out)?;

    for universe in [registers, constants] {
        for candidate in &universe.candidates {
            write_probe(out, universe.kind, candidate)?;
        }
    }

    writeln!(out, "int main(void) {{ return 0; }}")
}

fn write_probe(out: &mut String, kind: UniverseKind, name: &str) -> std::fmt::Result {
    let prefix = kind.probe_prefix();

    writeln!(out, "#ifdef {name}")?;
    match kind {
        UniverseKind::Register => {
            writeln!(out, "{REGISTER_PROBE_TYPE} {prefix}{name} = &{name};")?
        }
        UniverseKind::Constant => {
            writeln!(out, "{CONSTANT_PROBE_TYPE} {prefix}{name} = {name};")?
        }
    }
    writeln!(out, "#endif")?;
    writeln!(out)
}
