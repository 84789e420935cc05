//! EFI Byte Code.
//!
//! EBC is the portable byte code UEFI drivers ship in. Instructions are a
//! variable number of bytes; memory operands use a packed index whose
//! natural part scales with the pointer size of the image, so an [`Ebc`]
//! processor has to be built for a known [`PointerSize`].

mod decode;
mod emu;
pub mod index;
pub mod opcode;
mod out;

pub use self::index::{decode_index, DecodedIndex, PointerSize};
pub use self::opcode::Itype;

use crate::analysis::{Emulation, SymbolResolver};
use crate::arch::{Context, DecodeError, Feature, Instruction, Processor};
use crate::cursor::Image;
use crate::render::Line;
use crate::{Address, Architecture};

/// Register names by number: eight general registers, then the VM
/// registers.
pub const REGISTERS: [&str; 16] = [
    "SP", "R1", "R2", "R3", "R4", "R5", "R6", "R7", "FLAGS", "IP", "VM2", "VM3", "VM4", "VM5",
    "VM6", "VM7",
];

/// Number of the first VM register.
pub const FLAGS: u8 = 8;

pub fn register_name(reg: u8) -> &'static str {
    REGISTERS.get(reg as usize).copied().unwrap_or("?")
}

/// Auxiliary flags of EBC instructions.
pub mod aux {
    use crate::arch::Aux;

    pub const B: Aux = Aux(0x001);
    pub const W: Aux = Aux(0x002);
    pub const D: Aux = Aux(0x004);
    pub const Q: Aux = Aux(0x008);
    /// The mnemonic carries the width of operand 1.
    pub const OP1: Aux = Aux(0x010);
    pub const BITS32: Aux = Aux(0x020);
    pub const BITS64: Aux = Aux(0x040);
    /// Call into native code.
    pub const NATIVE: Aux = Aux(0x080);
    /// Taken when the condition flag is set.
    pub const CS: Aux = Aux(0x200);
    /// Taken when the condition flag is clear.
    pub const NCS: Aux = Aux(0x400);
}

/// The EBC processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ebc {
    pointer_size: PointerSize,
}

impl Ebc {
    pub fn new(pointer_size: PointerSize) -> Self {
        Self { pointer_size }
    }

    pub fn pointer_size(&self) -> PointerSize {
        self.pointer_size
    }
}

impl Processor for Ebc {
    type Itype = Itype;

    fn architecture(&self) -> Architecture {
        Architecture::Ebc
    }

    fn decode_raw(&self, image: &Image<'_>, at: Address) -> Result<Instruction<Itype>, DecodeError> {
        decode::decode(image, at, self.pointer_size)
    }

    fn feature(&self, itype: Itype) -> Feature {
        itype.feature()
    }

    fn mnemonic(&self, itype: Itype) -> &'static str {
        itype.name()
    }

    fn emulate(&self, insn: &Instruction<Itype>, ctx: &mut Context<'_>) -> Emulation {
        emu::emulate(insn, ctx)
    }

    fn render(&self, insn: &Instruction<Itype>, names: &dyn SymbolResolver) -> Line {
        out::render(insn, self.pointer_size, names)
    }

    /// A zero word pads code to 16-bit alignment.
    fn align_len(&self, image: &Image<'_>, at: Address) -> usize {
        if image.read_u16(at) == Some(0) {
            2
        } else {
            0
        }
    }
}
