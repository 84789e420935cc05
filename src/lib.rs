//! Processor modules for the EFI Byte Code and MSP430 instruction sets.
//!
//! Each processor decodes raw bytes into an [`arch::Instruction`], folds
//! generic encodings into the mnemonics programmers write (MSP430), reports
//! code/data edges, stack changes and switch tables to an analysis host, and
//! renders assembler text. [`pipeline::Pipeline`] runs those stages per
//! address; the sweep strategies and output formats build on it.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::fs;
//! use procmod::{
//!     cursor::Image,
//!     decoder::ProcessorDecoder,
//!     parser::GoblinParser,
//!     pipeline::Session,
//!     strategy::Strategy,
//!     BinaryParser, Config,
//! };
//!
//! let binary_data = fs::read("path/to/driver.efi").unwrap();
//! let metadata = GoblinParser::new().parse(&binary_data).unwrap();
//!
//! let mut config = Config::default();
//! config.pointer_size = metadata.pointer_size;
//! let decoder = ProcessorDecoder::for_architecture(metadata.architecture, &config).unwrap();
//!
//! let mut session = Session::new();
//! for (region, base) in metadata.get_executable_data(&binary_data) {
//!     let image = Image::new(region, base);
//!     let disassembly = Strategy::Linear.run(&image, &decoder, &mut session).unwrap();
//!     // ...
//! }
//! ```

pub mod analysis;
pub mod arch;
pub mod bits;
pub mod config;
pub mod cursor;
pub mod decoder;
pub mod format;
pub mod operand;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod strategy;

pub use crate::config::Config;

/// Represents an address in memory
pub type Address = u64;

use std::fmt;

use clap::ValueEnum;

use crate::analysis::{AnalysisHost, CodeRef, FlowKind, StackTracker, SymbolResolver, Xref, XrefKind};
use crate::arch::ebc::PointerSize;
use crate::cursor::Image;

/// Longest instruction of any supported set: EBC `MOVqq` with two 64-bit
/// indexes.
pub const MAX_INSTRUCTION_SIZE: usize = 18;

/// One decoded, analyzed and rendered instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insn {
    /// Address of the instruction
    pub addr: Address,
    /// Size of the instruction in bytes
    pub size: u8,
    /// Mnemonic including size and condition suffixes
    pub mnemonic: String,
    /// Operands as printed
    pub operands: String,
    /// Mnemonic and operands laid out in the processor's columns
    pub text: String,
    /// Raw bytes of the instruction (up to MAX_INSTRUCTION_SIZE)
    pub bytes: [u8; MAX_INSTRUCTION_SIZE],
    /// Short description of the mnemonic, where the processor has one
    pub comment: Option<&'static str>,
    pub flow: FlowKind,
    /// Edges leaving this instruction, fallthrough included
    pub xrefs: Vec<Xref>,
}

impl Insn {
    /// Returns the instruction bytes, up to the actual instruction size.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.size as usize]
    }

    /// Address of the following instruction.
    pub fn end(&self) -> Address {
        self.addr + self.size as Address
    }

    /// Does execution leave the straight-line path here?
    pub fn is_branch(&self) -> bool {
        self.flow != FlowKind::Falls
    }

    pub fn is_return(&self) -> bool {
        self.flow == FlowKind::Stop
    }

    /// Jump targets reported by the analyzer, in emission order.
    pub fn branch_targets(&self) -> Vec<Address> {
        self.code_targets(CodeRef::Jump)
    }

    pub fn call_targets(&self) -> Vec<Address> {
        self.code_targets(CodeRef::Call)
    }

    fn code_targets(&self, kind: CodeRef) -> Vec<Address> {
        let mut targets = Vec::new();
        for xref in &self.xrefs {
            if xref.kind == XrefKind::Code(kind) && !targets.contains(&xref.to) {
                targets.push(xref.to);
            }
        }
        targets
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Decoder trait: one instruction set behind a uniform, type-erased face.
pub trait Decoder: Send + Sync {
    fn architecture(&self) -> Architecture;

    /// Decode and render the instruction at `at` without analysing it.
    ///
    /// # Returns
    /// Some(Insn) if an instruction was successfully decoded, None otherwise
    fn decode(&self, image: &Image<'_>, at: Address, names: &(dyn SymbolResolver + Sync)) -> Option<Insn>;

    /// Decode the instruction at `at`, report its analysis to `host` and
    /// render it with the host's names.
    fn analyze(
        &self,
        image: &Image<'_>,
        at: Address,
        host: &mut dyn AnalysisHost,
        stack: &mut StackTracker,
    ) -> Option<Insn>;

    /// Length of alignment padding at `at`, or 0.
    fn align_len(&self, _image: &Image<'_>, _at: Address) -> usize {
        0
    }
}

/// One basic block for CFG strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Starting address of the basic block
    pub start: Address,
    /// Instructions within this basic block
    pub insns: Vec<Insn>,
    /// Successor addresses: jump targets, then the fallthrough
    pub succs: Vec<Address>,
}

impl BasicBlock {
    pub fn new(start: Address) -> Self {
        Self {
            start,
            insns: Vec::new(),
            succs: Vec::new(),
        }
    }

    /// Get the address past the last instruction in the block
    pub fn end_address(&self) -> Option<Address> {
        self.insns.last().map(Insn::end)
    }

    pub fn add_instruction(&mut self, insn: Insn) {
        self.insns.push(insn);
    }

    pub fn set_successors(&mut self, succs: Vec<Address>) {
        self.succs = succs;
    }

    pub fn last_instruction(&self) -> Option<&Insn> {
        self.insns.last()
    }

    /// Get the size of the block in bytes
    pub fn size(&self) -> usize {
        self.insns.iter().map(|i| i.size as usize).sum()
    }
}

/// Unified disassembly output.
#[derive(Debug, Clone)]
pub enum Disassembly {
    /// Linear stream of instructions
    Stream(Vec<Insn>),
    /// Control flow graph of basic blocks
    Cfg(Vec<BasicBlock>),
}

impl Disassembly {
    /// Get the total number of instructions
    pub fn instruction_count(&self) -> usize {
        match self {
            Disassembly::Stream(insns) => insns.len(),
            Disassembly::Cfg(blocks) => blocks.iter().map(|b| b.insns.len()).sum(),
        }
    }

    /// Get all instructions as a flat vector
    pub fn all_instructions(&self) -> Vec<Insn> {
        match self {
            Disassembly::Stream(insns) => insns.clone(),
            Disassembly::Cfg(blocks) => blocks.iter().flat_map(|b| b.insns.clone()).collect(),
        }
    }
}

/// Supported architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Architecture {
    /// EFI Byte Code
    Ebc,
    /// TI MSP430
    Msp430,
    /// Unknown architecture
    #[value(skip)]
    Unknown,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::Ebc => write!(f, "EBC"),
            Architecture::Msp430 => write!(f, "MSP430"),
            Architecture::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A section in the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name
    pub name: String,
    /// Load address of the section
    pub address: Address,
    /// Position of the section's bytes in the file
    pub offset: usize,
    /// Size of the section in bytes
    pub size: usize,
    /// Whether this section contains executable code
    pub executable: bool,
}

impl Section {
    pub fn new(name: String, address: Address, offset: usize, size: usize, executable: bool) -> Self {
        Self {
            name,
            address,
            offset,
            size,
            executable,
        }
    }

    /// Get the end address of this section
    pub fn end_address(&self) -> Address {
        self.address.saturating_add(self.size as Address)
    }

    /// The section's bytes, clipped to the file.
    pub fn data<'a>(&self, img: &'a [u8]) -> Option<&'a [u8]> {
        if self.offset >= img.len() {
            return None;
        }
        let end = self.offset.saturating_add(self.size).min(img.len());
        Some(&img[self.offset..end])
    }
}

/// Metadata describing a parsed binary.
#[derive(Debug, Clone)]
pub struct BinaryMetadata {
    /// Detected architecture
    pub architecture: Architecture,
    /// Entry point address, if available
    pub entry_point: Option<Address>,
    /// List of sections found in the binary
    pub sections: Vec<Section>,
    /// Address of the .text section, if found
    pub text_section: Option<Address>,
    /// Natural pointer size of an EBC image, from the PE optional header
    pub pointer_size: Option<PointerSize>,
    /// Named addresses: ELF symbols and PE exports
    pub symbols: Vec<(Address, String)>,
}

impl BinaryMetadata {
    /// Fallback metadata when no headers could be parsed.
    pub fn default_raw() -> Self {
        Self {
            architecture: Architecture::Unknown,
            entry_point: None,
            sections: Vec::new(),
            text_section: None,
            pointer_size: None,
            symbols: Vec::new(),
        }
    }

    /// Pick a reasonable base address (entry point, text section, or zero).
    pub fn get_base_address(&self) -> Address {
        self.entry_point.or(self.text_section).unwrap_or(0)
    }

    /// Return all executable regions (or the whole file at 0 if none).
    pub fn get_executable_data<'a>(&'a self, img: &'a [u8]) -> Vec<(&'a [u8], Address)> {
        const TEXT_NAMES: [&str; 2] = [".text", "CODE"];

        for name in TEXT_NAMES {
            if let Some((data, section)) = self
                .find_section(name)
                .and_then(|s| s.data(img).map(|d| (d, s)))
            {
                log::debug!(
                    "Found '{}' section at 0x{:x} ({} bytes)",
                    name,
                    section.address,
                    data.len()
                );
                return vec![(data, section.address)];
            }
        }

        let regions: Vec<(&[u8], Address)> = self
            .executable_sections()
            .into_iter()
            .filter_map(|s| s.data(img).map(|d| (d, s.address)))
            .collect();
        if !regions.is_empty() {
            log::debug!("Using {} executable sections", regions.len());
            return regions;
        }

        log::debug!("No suitable executable sections found, using whole file");
        vec![(img, 0)]
    }

    /// Find a section by name
    pub fn find_section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Get all executable sections
    pub fn executable_sections(&self) -> Vec<&Section> {
        self.sections.iter().filter(|s| s.executable).collect()
    }
}

/// Parser trait: turn raw bytes into `BinaryMetadata`.
pub trait BinaryParser: Send + Sync {
    fn parse(&self, data: &[u8]) -> Result<BinaryMetadata, DisassemblyError>;
}

/// Error type for disassembly operations
#[derive(Debug, thiserror::Error)]
pub enum DisassemblyError {
    /// Failed to parse binary format
    #[error("Failed to parse binary format: {0}")]
    ParsingError(String),

    /// Decoder error
    #[error("Decoder error: {0}")]
    DecoderError(String),

    /// Unsupported architecture
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(Architecture),

    /// Bad configuration value or file
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Output could not be produced
    #[error("Formatting error: {0}")]
    FormatError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::DataRef;

    pub(crate) fn insn(addr: Address, size: u8, mnemonic: &str, flow: FlowKind, xrefs: Vec<Xref>) -> Insn {
        Insn {
            addr,
            size,
            mnemonic: mnemonic.to_string(),
            operands: String::new(),
            text: mnemonic.to_string(),
            bytes: [0; MAX_INSTRUCTION_SIZE],
            comment: None,
            flow,
            xrefs,
        }
    }

    #[test]
    fn test_insn_targets() {
        let jnz = insn(
            0x1000,
            2,
            "jnz",
            FlowKind::Conditional,
            vec![
                Xref::code(0x1000, 0, 0x1010, CodeRef::Jump),
                Xref::data(0x1000, 0, 0x2000, DataRef::Read),
                Xref::code(0x1000, 0, 0x1002, CodeRef::Flow),
            ],
        );
        assert!(jnz.is_branch());
        assert!(!jnz.is_return());
        assert_eq!(jnz.branch_targets(), vec![0x1010]);
        assert!(jnz.call_targets().is_empty());
        assert_eq!(jnz.end(), 0x1002);
    }

    #[test]
    fn test_basic_block_operations() {
        let mut block = BasicBlock::new(0x1000);
        block.add_instruction(insn(0x1000, 2, "push", FlowKind::Falls, vec![]));
        block.add_instruction(insn(0x1002, 2, "ret", FlowKind::Stop, vec![]));

        assert_eq!(block.end_address(), Some(0x1004));
        assert_eq!(block.last_instruction().unwrap().mnemonic, "ret");
        assert_eq!(block.size(), 4);
    }

    #[test]
    fn test_disassembly_instruction_count() {
        let stream = Disassembly::Stream(vec![
            insn(0, 2, "nop", FlowKind::Falls, vec![]),
            insn(2, 2, "nop", FlowKind::Falls, vec![]),
        ]);
        assert_eq!(stream.instruction_count(), 2);

        let cfg = Disassembly::Cfg(vec![BasicBlock {
            start: 0,
            insns: vec![insn(0, 2, "ret", FlowKind::Stop, vec![])],
            succs: vec![],
        }]);
        assert_eq!(cfg.instruction_count(), 1);
        assert_eq!(cfg.all_instructions()[0].mnemonic, "ret");
    }

    #[test]
    fn test_executable_data_uses_file_offsets() {
        let img: Vec<u8> = (0u8..64).collect();
        let mut meta = BinaryMetadata::default_raw();
        meta.sections.push(Section::new(".data".into(), 0x4000, 0, 16, false));
        meta.sections.push(Section::new(".text".into(), 0xC000, 16, 8, true));

        let regions = meta.get_executable_data(&img);
        assert_eq!(regions, vec![(&img[16..24], 0xC000)]);

        let raw = BinaryMetadata::default_raw();
        assert_eq!(raw.get_executable_data(&img), vec![(&img[..], 0)]);
    }
}
