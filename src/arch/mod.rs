//! Instruction-set plumbing shared by the processor modules.
//!
//! A [`Processor`] owns everything that is specific to one instruction set:
//! its opcode tables, decode routines, the optional simplifier that folds
//! generic encodings into emulated mnemonics, the static analyzer and the
//! renderer. [`crate::pipeline::Pipeline`] drives the four stages.

pub mod ebc;
pub mod msp430;

use std::fmt;
use std::ops::BitOr;

use crate::analysis::{AnalysisHost, CodeRef, DataRef, Emulation, StackTracker, SymbolResolver, Xref};
use crate::cursor::Image;
use crate::operand::Operand;
use crate::render::Line;
use crate::{Address, Architecture, Config};

/// Why no instruction exists at an address.
///
/// Decode failures are expected on data interleaved with code; they are
/// reported as "no instruction here" and never abort a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("opcode 0x{0:02x} is not assigned")]
    UnknownOpcode(u16),

    #[error("reserved bit set in the {0} byte")]
    ReservedBit(&'static str),

    #[error("immediate width selector 0 is reserved")]
    ZeroWidth,

    #[error("index data combined with a direct register operand")]
    IndexedDirect,

    #[error("index encoding 0x{0:x} overlaps its width field")]
    InvalidIndex(u64),

    #[error("instruction runs past the end of the image at 0x{at:x}")]
    Truncated { at: Address },

    #[error("address 0x{0:x} is not word aligned")]
    Misaligned(Address),

    #[error("{0} is not a valid operand form")]
    InvalidForm(&'static str),
}

/// Per-mnemonic feature bits: which operands are read or written and how
/// the instruction affects control flow.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Feature(u16);

impl Feature {
    pub const NONE: Feature = Feature(0);
    pub const USE1: Feature = Feature(0x001);
    pub const USE2: Feature = Feature(0x002);
    pub const CHG1: Feature = Feature(0x004);
    pub const CHG2: Feature = Feature(0x008);
    /// Execution does not continue at the next instruction.
    pub const STOP: Feature = Feature(0x010);
    pub const CALL: Feature = Feature(0x020);
    pub const JUMP: Feature = Feature(0x040);
    pub const SHFT: Feature = Feature(0x080);

    pub const fn union(self, other: Feature) -> Feature {
        Feature(self.0 | other.0)
    }

    pub const fn contains(self, other: Feature) -> bool {
        self.0 & other.0 == other.0
    }

    /// Is operand `n` (0-based) read?
    pub fn uses(self, n: usize) -> bool {
        match n {
            0 => self.contains(Feature::USE1),
            1 => self.contains(Feature::USE2),
            _ => false,
        }
    }

    /// Is operand `n` (0-based) written?
    pub fn changes(self, n: usize) -> bool {
        match n {
            0 => self.contains(Feature::CHG1),
            1 => self.contains(Feature::CHG2),
            _ => false,
        }
    }
}

impl BitOr for Feature {
    type Output = Feature;

    fn bitor(self, rhs: Feature) -> Feature {
        self.union(rhs)
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Feature(0x{:03x})", self.0)
    }
}

/// Architecture-specific auxiliary flags of an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Aux(pub u16);

impl Aux {
    pub const NONE: Aux = Aux(0);

    pub const fn contains(self, other: Aux) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Aux) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Aux {
    type Output = Aux;

    fn bitor(self, rhs: Aux) -> Aux {
        Aux(self.0 | rhs.0)
    }
}

impl fmt::Debug for Aux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aux(0x{:04x})", self.0)
    }
}

/// One decoded instruction.
///
/// Built fresh by every decode; the simplifier consumes it and returns the
/// rewritten record. Nothing downstream mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction<I> {
    pub address: Address,
    pub length: u8,
    pub itype: I,
    pub operands: [Operand; 2],
    pub aux: Aux,
}

impl<I> Instruction<I> {
    /// Address of the following instruction.
    pub fn end(&self) -> Address {
        self.address + self.length as Address
    }

    pub fn op1(&self) -> &Operand {
        &self.operands[0]
    }

    pub fn op2(&self) -> &Operand {
        &self.operands[1]
    }
}

/// Everything the analyzer may touch while processing one instruction.
pub struct Context<'a> {
    pub image: Image<'a>,
    pub host: &'a mut dyn AnalysisHost,
    pub stack: &'a mut StackTracker,
    pub config: &'a Config,
    emitted: Vec<Xref>,
}

impl<'a> Context<'a> {
    pub fn new(
        image: Image<'a>,
        host: &'a mut dyn AnalysisHost,
        stack: &'a mut StackTracker,
        config: &'a Config,
    ) -> Self {
        Self {
            image,
            host,
            stack,
            config,
            emitted: Vec::new(),
        }
    }

    pub fn add_code_ref(&mut self, from: Address, offb: u8, to: Address, kind: CodeRef) {
        self.add_xref(Xref::code(from, offb, to, kind));
    }

    pub fn add_data_ref(&mut self, from: Address, offb: u8, to: Address, kind: DataRef) {
        self.add_xref(Xref::data(from, offb, to, kind));
    }

    fn add_xref(&mut self, xref: Xref) {
        self.host.add_xref(xref);
        self.emitted.push(xref);
    }

    /// Edges reported through this context, in emission order.
    pub fn take_emitted(&mut self) -> Vec<Xref> {
        std::mem::take(&mut self.emitted)
    }
}

/// One instruction set.
pub trait Processor: Send + Sync {
    /// Canonical mnemonic identity.
    type Itype: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    fn architecture(&self) -> Architecture;

    /// Decode without simplification.
    fn decode_raw(&self, image: &Image<'_>, at: Address) -> Result<Instruction<Self::Itype>, DecodeError>;

    /// Fold generic encodings into emulated mnemonics.
    fn simplify(&self, insn: Instruction<Self::Itype>) -> Instruction<Self::Itype> {
        insn
    }

    fn decode(&self, image: &Image<'_>, at: Address) -> Result<Instruction<Self::Itype>, DecodeError> {
        self.decode_raw(image, at).map(|insn| self.simplify(insn))
    }

    fn feature(&self, itype: Self::Itype) -> Feature;

    fn mnemonic(&self, itype: Self::Itype) -> &'static str;

    fn comment(&self, _itype: Self::Itype) -> Option<&'static str> {
        None
    }

    /// Derive edges, stack changes and switch tables for one instruction.
    /// The fallthrough edge is added by the caller from the returned flow.
    fn emulate(&self, insn: &Instruction<Self::Itype>, ctx: &mut Context<'_>) -> Emulation;

    /// Format the instruction. Must not change any analysis state.
    fn render(&self, insn: &Instruction<Self::Itype>, names: &dyn SymbolResolver) -> Line;

    /// Size of an alignment filler at `at`, or 0.
    fn align_len(&self, _image: &Image<'_>, _at: Address) -> usize {
        0
    }
}
