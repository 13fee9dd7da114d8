#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use ioreg_gen::{CommandRunner, ToolOutput};

const SHT_PROGBITS: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;
const SHT_NOBITS: u32 = 8;

/// Section index of `.data`.
pub const DATA_SECTION: u16 = 1;
/// Section index of `.bss`, when the builder has one.
pub const BSS_SECTION: u16 = 2;

const EM_AVR: u16 = 83;
const ELF_HEADER_SIZE: usize = 52;
const SECTION_HEADER_SIZE: usize = 40;
const SYMBOL_SIZE: usize = 16;

/// Builds minimal little endian ELF32 files with a data section and a symbol table.
pub struct ElfBuilder {
    data_address: u32,
    data: Vec<u8>,
    symbols: Vec<(String, u16, u32, u32)>,
    bss_size: Option<u32>,
    with_data: bool,
    with_symtab: bool,
}

impl ElfBuilder {
    pub fn new(data_address: u32) -> Self {
        Self {
            data_address,
            data: Vec::new(),
            symbols: Vec::new(),
            bss_size: None,
            with_data: true,
            with_symtab: true,
        }
    }

    pub fn data(mut self, bytes: &[u8]) -> Self {
        self.data = bytes.to_vec();
        self
    }

    pub fn symbol(self, name: &str, address: u32, size: u32) -> Self {
        self.symbol_in(DATA_SECTION, name, address, size)
    }

    /// Adds a symbol defined in the section with index `section`.
    pub fn symbol_in(mut self, section: u16, name: &str, address: u32, size: u32) -> Self {
        self.symbols.push((name.to_owned(), section, address, size));
        self
    }

    /// Adds a `.bss` section of `size` bytes right after `.data`.
    pub fn bss(mut self, size: u32) -> Self {
        self.bss_size = Some(size);
        self
    }

    /// Appends `value` to the data section and adds a symbol pointing at it.
    pub fn object(mut self, name: &str, value: u64, size: u32) -> Self {
        let address = self.data_address + self.data.len() as u32;
        self.data
            .extend_from_slice(&value.to_le_bytes()[..size as usize]);
        self.symbol(name, address, size)
    }

    pub fn without_data(mut self) -> Self {
        self.with_data = false;
        self
    }

    pub fn without_symtab(mut self) -> Self {
        self.with_symtab = false;
        self
    }

    pub fn build(self) -> Vec<u8> {
        fn add_name(table: &mut Vec<u8>, name: &str) -> u32 {
            let offset = table.len() as u32;
            table.extend_from_slice(name.as_bytes());
            table.push(0);
            offset
        }

        let mut shstrtab = vec![0u8];

        // Symbol names and entries, starting with the null symbol.
        let mut strtab = vec![0u8];
        let mut symtab = vec![0u8; SYMBOL_SIZE];
        for (name, section, address, size) in &self.symbols {
            let name = add_name(&mut strtab, name);
            symtab.extend_from_slice(&name.to_le_bytes());
            symtab.extend_from_slice(&address.to_le_bytes());
            symtab.extend_from_slice(&size.to_le_bytes());
            // STB_GLOBAL, STT_OBJECT
            symtab.push(0x11);
            symtab.push(0);
            symtab.extend_from_slice(&section.to_le_bytes());
        }

        struct Section {
            name: u32,
            kind: u32,
            flags: u32,
            address: u32,
            bytes: Vec<u8>,
            size: u32,
            link: u32,
            info: u32,
            entsize: u32,
        }

        let mut sections = Vec::new();
        if self.with_data {
            sections.push(Section {
                name: add_name(&mut shstrtab, ".data"),
                kind: SHT_PROGBITS,
                flags: 0x3,
                address: self.data_address,
                bytes: self.data.clone(),
                size: self.data.len() as u32,
                link: 0,
                info: 0,
                entsize: 0,
            });
        }
        if let Some(size) = self.bss_size {
            // Occupies no space in the file.
            sections.push(Section {
                name: add_name(&mut shstrtab, ".bss"),
                kind: SHT_NOBITS,
                flags: 0x3,
                address: self.data_address + self.data.len() as u32,
                bytes: Vec::new(),
                size,
                link: 0,
                info: 0,
                entsize: 0,
            });
        }
        if self.with_symtab {
            // The string table follows the symbol table.
            let strtab_index = sections.len() as u32 + 2;
            sections.push(Section {
                name: add_name(&mut shstrtab, ".symtab"),
                kind: SHT_SYMTAB,
                flags: 0,
                address: 0,
                size: symtab.len() as u32,
                bytes: symtab,
                link: strtab_index,
                info: 1,
                entsize: SYMBOL_SIZE as u32,
            });
            sections.push(Section {
                name: add_name(&mut shstrtab, ".strtab"),
                kind: SHT_STRTAB,
                flags: 0,
                address: 0,
                size: strtab.len() as u32,
                bytes: strtab,
                link: 0,
                info: 0,
                entsize: 0,
            });
        }
        let shstrtab_name = add_name(&mut shstrtab, ".shstrtab");
        sections.push(Section {
            name: shstrtab_name,
            kind: SHT_STRTAB,
            flags: 0,
            address: 0,
            size: shstrtab.len() as u32,
            bytes: shstrtab,
            link: 0,
            info: 0,
            entsize: 0,
        });

        // Section contents follow the ELF header, the section headers come last.
        let mut contents = Vec::new();
        let mut offsets = Vec::new();
        for section in &sections {
            offsets.push((ELF_HEADER_SIZE + contents.len()) as u32);
            contents.extend_from_slice(&section.bytes);
        }
        while contents.len() % 4 != 0 {
            contents.push(0);
        }
        let section_header_offset = (ELF_HEADER_SIZE + contents.len()) as u32;
        let section_count = sections.len() as u16 + 1;

        let mut elf = Vec::new();
        elf.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
        elf.extend_from_slice(&[0; 8]);
        elf.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
        elf.extend_from_slice(&EM_AVR.to_le_bytes());
        elf.extend_from_slice(&1u32.to_le_bytes()); // EV_CURRENT
        elf.extend_from_slice(&0u32.to_le_bytes()); // e_entry
        elf.extend_from_slice(&0u32.to_le_bytes()); // e_phoff
        elf.extend_from_slice(&section_header_offset.to_le_bytes());
        elf.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        elf.extend_from_slice(&(ELF_HEADER_SIZE as u16).to_le_bytes());
        elf.extend_from_slice(&32u16.to_le_bytes()); // e_phentsize
        elf.extend_from_slice(&0u16.to_le_bytes()); // e_phnum
        elf.extend_from_slice(&(SECTION_HEADER_SIZE as u16).to_le_bytes());
        elf.extend_from_slice(&section_count.to_le_bytes());
        elf.extend_from_slice(&(section_count - 1).to_le_bytes()); // .shstrtab is last
        assert_eq!(elf.len(), ELF_HEADER_SIZE);

        elf.extend_from_slice(&contents);

        // Null section header.
        elf.extend_from_slice(&[0; SECTION_HEADER_SIZE]);
        for (section, offset) in sections.iter().zip(offsets) {
            for word in [
                section.name,
                section.kind,
                section.flags,
                section.address,
                offset,
                section.size,
                section.link,
                section.info,
                1,
                section.entsize,
            ] {
                elf.extend_from_slice(&word.to_le_bytes());
            }
        }

        elf
    }
}

/// Stands in for the target compiler.
///
/// It reads the probe source, keeps the probes whose macro is "defined" for the requested
/// variant and writes an ELF file in which every probe object holds the macro's value.
/// Register probes are 2 bytes wide, constant probes 4 bytes.
pub struct FakeCompiler {
    pub data_address: u32,
    pub defines: HashMap<String, Vec<(String, u64)>>,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self {
            data_address: 0x0080_0100,
            defines: HashMap::new(),
        }
    }

    pub fn variant(mut self, variant: &str, defines: &[(&str, u64)]) -> Self {
        self.defines.insert(
            variant.to_owned(),
            defines
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        );
        self
    }
}

impl CommandRunner for FakeCompiler {
    fn run(&self, _program: &str, args: &[OsString]) -> io::Result<ToolOutput> {
        let source = PathBuf::from(&args[0]);
        let destination = PathBuf::from(&args[2]);
        let variant = args
            .iter()
            .find_map(|arg| arg.to_str()?.strip_prefix("-mmcu="))
            .unwrap_or_default();

        let Some(defines) = self.defines.get(variant) else {
            return Ok(ToolOutput {
                success: false,
                status_code: Some(1),
                stdout: Vec::new(),
                stderr: format!("avr-gcc: error: unknown MCU '{variant}' specified").into_bytes(),
            });
        };

        let source = std::fs::read_to_string(source)?;
        let mut builder = ElfBuilder::new(self.data_address);

        for line in source.lines() {
            let (prefix, size) = if line.starts_with("io_ptr_t ioreg_") {
                ("ioreg_", 2)
            } else if line.starts_with("uint32_t const_") {
                ("const_", 4)
            } else {
                continue;
            };

            let object = line
                .split_whitespace()
                .nth(1)
                .unwrap_or_default()
                .to_owned();
            let name = object.trim_start_matches(prefix);

            if let Some((_, value)) = defines.iter().find(|(define, _)| define == name) {
                builder = builder.object(&object, *value, size);
            }
        }

        std::fs::write(destination, builder.build())?;

        Ok(ToolOutput {
            success: true,
            status_code: Some(0),
            ..Default::default()
        })
    }
}
