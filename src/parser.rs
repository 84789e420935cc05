//! Goblin-based binary parser for MSP430 ELF images and EBC PE images.

use std::fmt;

use goblin::{elf, pe, Object};

use crate::arch::ebc::PointerSize;
use crate::{Address, Architecture, BinaryMetadata, BinaryParser, DisassemblyError, Section};

/// `e_machine` of TI MSP430 objects.
const EM_MSP430: u16 = 105;
/// COFF machine type of EFI Byte Code images.
const COFF_MACHINE_EBC: u16 = 0x0EBC;

/// A parser that handles ELF and PE via Goblin.
#[derive(Debug, Default)]
pub struct GoblinParser;

impl GoblinParser {
    /// Construct a new GoblinParser.
    pub fn new() -> Self {
        GoblinParser
    }

    /// Parse an ELF image.
    fn parse_elf(&self, elf: elf::Elf, _img: &[u8]) -> Result<BinaryMetadata, DisassemblyError> {
        let arch = match elf.header.e_machine {
            EM_MSP430 => Architecture::Msp430,
            _ => Architecture::Unknown,
        };

        // Gather all sections that occupy file space
        let mut sections = Vec::new();
        for sh in &elf.section_headers {
            if sh.sh_type == elf::section_header::SHT_NOBITS {
                continue;
            }
            if let Some(name) = elf.shdr_strtab.get_at(sh.sh_name) {
                sections.push(Section::new(
                    name.to_string(),
                    sh.sh_addr,
                    sh.sh_offset as usize,
                    sh.sh_size as usize,
                    sh.is_executable(),
                ));
            }
        }

        let text_section = sections
            .iter()
            .find(|s| s.name == ".text")
            .map(|s| s.address);

        let mut symbols = Vec::new();
        for sym in elf.syms.iter() {
            let named = matches!(
                sym.st_type(),
                elf::sym::STT_FUNC | elf::sym::STT_OBJECT | elf::sym::STT_NOTYPE
            );
            if !named || sym.st_shndx == 0 {
                continue;
            }
            match elf.strtab.get_at(sym.st_name) {
                Some(name) if !name.is_empty() => symbols.push((sym.st_value, name.to_string())),
                _ => {}
            }
        }
        log::debug!("ELF: {} sections, {} symbols", sections.len(), symbols.len());

        Ok(BinaryMetadata {
            architecture: arch,
            entry_point: Some(elf.entry),
            sections,
            text_section,
            pointer_size: None,
            symbols,
        })
    }

    /// Parse a PE image. Addresses are virtual: image base plus RVA.
    fn parse_pe(&self, pe: pe::PE<'_>, _img: &[u8]) -> Result<BinaryMetadata, DisassemblyError> {
        let arch = match pe.header.coff_header.machine {
            COFF_MACHINE_EBC => Architecture::Ebc,
            _ => Architecture::Unknown,
        };
        let image_base = pe.image_base as Address;

        let pointer_size = match pe.header.optional_header {
            Some(ref optional) => Some(PointerSize::from_pe_magic(optional.standard_fields.magic)),
            None => {
                log::warn!("PE image without an optional header, pointer size unknown");
                None
            }
        };

        // Gather PE sections
        let mut sections = Vec::new();
        for sect in &pe.sections {
            let name = sect.name().unwrap_or("").to_string();
            let executable = (sect.characteristics & pe::section_table::IMAGE_SCN_MEM_EXECUTE) != 0;
            let size = if sect.virtual_size == 0 {
                sect.size_of_raw_data
            } else {
                sect.virtual_size.min(sect.size_of_raw_data)
            };
            sections.push(Section::new(
                name,
                image_base + sect.virtual_address as Address,
                sect.pointer_to_raw_data as usize,
                size as usize,
                executable,
            ));
        }

        // Find ".text" (case-insensitive)
        let text_section = sections
            .iter()
            .find(|s| s.name.to_lowercase().contains(".text"))
            .map(|s| s.address);

        let symbols = pe
            .exports
            .iter()
            .filter_map(|e| e.name.map(|n| (image_base + e.rva as Address, n.to_string())))
            .collect();

        Ok(BinaryMetadata {
            architecture: arch,
            entry_point: Some(image_base + pe.entry as Address),
            sections,
            text_section,
            pointer_size,
            symbols,
        })
    }
}

impl fmt::Display for GoblinParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GoblinParser")
    }
}

impl BinaryParser for GoblinParser {
    fn parse(&self, data: &[u8]) -> Result<BinaryMetadata, DisassemblyError> {
        match Object::parse(data) {
            Ok(Object::Elf(elf)) => self.parse_elf(elf, data),
            Ok(Object::PE(pe)) => self.parse_pe(pe, data),
            Ok(_) => Err(DisassemblyError::ParsingError("Unsupported file format".into())),
            Err(e) => Err(DisassemblyError::ParsingError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn push16(buf: &mut Vec<u8>, v: u16) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn push32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn section_header(buf: &mut Vec<u8>, name: u32, kind: u32, flags: u32, addr: u32, offset: u32, size: u32) {
        for v in [name, kind, flags, addr, offset, size, 0, 0, 2, 0] {
            push32(buf, v);
        }
    }

    /// ELF32 MSP430 executable: `.text` holding `code` at 0xC000.
    fn msp430_elf(code: &[u8]) -> Vec<u8> {
        const SHSTRTAB: &[u8] = b"\0.text\0.shstrtab\0";
        let text_off = 52u32;
        let strtab_off = text_off + code.len() as u32;
        let shoff = (strtab_off + SHSTRTAB.len() as u32 + 3) & !3;

        let mut buf = vec![0x7F, b'E', b'L', b'F', 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        push16(&mut buf, 2); // ET_EXEC
        push16(&mut buf, EM_MSP430);
        push32(&mut buf, 1);
        push32(&mut buf, 0xC000); // entry
        push32(&mut buf, 0); // phoff
        push32(&mut buf, shoff);
        push32(&mut buf, 0); // flags
        push16(&mut buf, 52);
        push16(&mut buf, 32);
        push16(&mut buf, 0);
        push16(&mut buf, 40);
        push16(&mut buf, 3);
        push16(&mut buf, 2);

        buf.extend_from_slice(code);
        buf.extend_from_slice(SHSTRTAB);
        buf.resize(shoff as usize, 0);

        section_header(&mut buf, 0, 0, 0, 0, 0, 0);
        // PROGBITS, ALLOC | EXECINSTR
        section_header(&mut buf, 1, 1, 6, 0xC000, text_off, code.len() as u32);
        // STRTAB
        section_header(&mut buf, 7, 3, 0, 0, strtab_off, SHSTRTAB.len() as u32);
        buf
    }

    fn push64(buf: &mut Vec<u8>, v: u64) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn pe_section(buf: &mut Vec<u8>, name: &[u8], virtual_size: u32, rva: u32, offset: u32, flags: u32) {
        let mut padded = [0u8; 8];
        padded[..name.len()].copy_from_slice(name);
        buf.extend_from_slice(&padded);
        for v in [virtual_size, rva, 0x200, offset, 0, 0] {
            push32(buf, v);
        }
        push32(buf, 0); // relocation and line number counts
        push32(buf, flags);
    }

    const PE_IMAGE_BASE: u64 = 0x1000_0000;

    /// PE32+ EBC driver: `code` in `.text` at RVA 0x1000, one export
    /// `EfiMain` at RVA 0x1004 in `.edata` at RVA 0x2000.
    fn ebc_pe(code: &[u8]) -> Vec<u8> {
        let mut edata = Vec::new();
        push32(&mut edata, 0); // flags
        push32(&mut edata, 0); // timestamp
        push32(&mut edata, 0); // version
        push32(&mut edata, 0x2040); // dll name
        push32(&mut edata, 1); // ordinal base
        push32(&mut edata, 1); // address table entries
        push32(&mut edata, 1); // name pointers
        push32(&mut edata, 0x2028); // address table
        push32(&mut edata, 0x202C); // name pointer table
        push32(&mut edata, 0x2030); // ordinal table
        push32(&mut edata, 0x1004);
        push32(&mut edata, 0x2048);
        push16(&mut edata, 0);
        edata.resize(0x40, 0);
        edata.extend_from_slice(b"drv.efi\0EfiMain\0");

        let mut buf = vec![0u8; 0x80];
        buf[..2].copy_from_slice(b"MZ");
        buf[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());
        buf.extend_from_slice(b"PE\0\0");

        push16(&mut buf, COFF_MACHINE_EBC);
        push16(&mut buf, 2); // sections
        push32(&mut buf, 0);
        push32(&mut buf, 0); // no symbol table
        push32(&mut buf, 0);
        push16(&mut buf, 240); // optional header size
        push16(&mut buf, 0x0022);

        push16(&mut buf, 0x20B); // PE32+
        push16(&mut buf, 0); // linker version
        push32(&mut buf, 0x200); // size of code
        push32(&mut buf, 0x200);
        push32(&mut buf, 0);
        push32(&mut buf, 0x1000); // entry
        push32(&mut buf, 0x1000); // base of code
        push64(&mut buf, PE_IMAGE_BASE);
        push32(&mut buf, 0x1000); // section alignment
        push32(&mut buf, 0x200); // file alignment
        for _ in 0..6 {
            push16(&mut buf, 0);
        }
        push32(&mut buf, 0);
        push32(&mut buf, 0x3000); // size of image
        push32(&mut buf, 0x200); // size of headers
        push32(&mut buf, 0);
        push16(&mut buf, 11); // EFI boot service driver
        push16(&mut buf, 0);
        for _ in 0..4 {
            push64(&mut buf, 0);
        }
        push32(&mut buf, 0);
        push32(&mut buf, 16);
        // export directory, then fifteen empty ones
        push32(&mut buf, 0x2000);
        push32(&mut buf, edata.len() as u32);
        buf.resize(buf.len() + 15 * 8, 0);

        // CODE | EXECUTE | READ
        pe_section(&mut buf, b".text", code.len() as u32, 0x1000, 0x200, 0x6000_0020);
        // INITIALIZED_DATA | READ
        pe_section(&mut buf, b".edata", edata.len() as u32, 0x2000, 0x400, 0x4000_0040);

        buf.resize(0x200, 0);
        buf.extend_from_slice(code);
        buf.resize(0x400, 0);
        buf.extend_from_slice(&edata);
        buf.resize(0x600, 0);
        buf
    }

    #[test]
    fn test_default_raw() {
        let meta = BinaryMetadata::default_raw();
        assert_eq!(meta.architecture, Architecture::Unknown);
        assert!(meta.entry_point.is_none());
        assert!(meta.sections.is_empty());
        assert!(meta.text_section.is_none());
        assert!(meta.pointer_size.is_none());
    }

    #[test]
    fn test_parse_msp430_elf_from_file() {
        let code = [0x05, 0x12, 0x35, 0x41, 0x30, 0x41];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&msp430_elf(&code)).unwrap();
        let data = fs::read(file.path()).unwrap();

        let meta = GoblinParser::new().parse(&data).unwrap();
        assert_eq!(meta.architecture, Architecture::Msp430);
        assert_eq!(meta.entry_point, Some(0xC000));
        assert_eq!(meta.text_section, Some(0xC000));
        assert!(meta.pointer_size.is_none());

        let regions = meta.get_executable_data(&data);
        assert_eq!(regions, vec![(&code[..], 0xC000)]);
    }

    #[test]
    fn test_parse_ebc_pe() {
        // MOVIqw R1, 4 ; RET
        let code = [0x77, 0x31, 0x04, 0x00, 0x04, 0x00];
        let data = ebc_pe(&code);

        let meta = GoblinParser::new().parse(&data).unwrap();
        assert_eq!(meta.architecture, Architecture::Ebc);
        assert_eq!(meta.pointer_size, Some(PointerSize::Eight));
        assert_eq!(meta.entry_point, Some(PE_IMAGE_BASE + 0x1000));
        assert_eq!(meta.text_section, Some(PE_IMAGE_BASE + 0x1000));
        assert_eq!(meta.symbols, vec![(PE_IMAGE_BASE + 0x1004, "EfiMain".to_string())]);

        // the raw data is padded to 0x200; only the virtual size is code
        let regions = meta.get_executable_data(&data);
        assert_eq!(regions, vec![(&code[..], PE_IMAGE_BASE + 0x1000)]);
        let edata = meta.sections.iter().find(|s| s.name == ".edata").unwrap();
        assert!(!edata.executable);
        assert_eq!(edata.address, PE_IMAGE_BASE + 0x2000);
    }

    #[test]
    fn test_rejects_garbage() {
        let err = GoblinParser::new().parse(&[0x12, 0x34, 0x56, 0x78]).unwrap_err();
        assert!(matches!(err, DisassemblyError::ParsingError(_)));
    }
}
