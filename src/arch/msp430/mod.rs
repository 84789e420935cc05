//! Texas Instruments MSP430.
//!
//! A 16-bit RISC with three encoding formats. Constant generators in R2
//! and R3 let assemblers build common operations out of core
//! instructions, which [`simplify`] folds back into their emulated
//! mnemonics before analysis.

mod decode;
mod emu;
pub mod opcode;
mod out;
mod simplify;

pub use self::emu::match_switch;
pub use self::opcode::Itype;

use crate::analysis::{Emulation, SymbolResolver};
use crate::arch::{Context, DecodeError, Feature, Instruction, Processor};
use crate::cursor::Image;
use crate::render::Line;
use crate::{Address, Architecture};

pub const PC: u8 = 0;
pub const SP: u8 = 1;
pub const SR: u8 = 2;
/// Constant generator.
pub const R3: u8 = 3;

pub const REGISTERS: [&str; 16] = [
    "PC", "SP", "SR", "R3", "R4", "R5", "R6", "R7", "R8", "R9", "R10", "R11", "R12", "R13",
    "R14", "R15",
];

pub fn register_name(reg: u8) -> &'static str {
    REGISTERS.get(reg as usize).copied().unwrap_or("?")
}

/// 64K address space.
pub const ADDRESS_MASK: Address = 0xFFFF;

/// Operation size of MSP430 instructions.
pub mod aux {
    use crate::arch::Aux;

    pub const NOSUF: Aux = Aux(0);
    pub const WORD: Aux = Aux(1);
    pub const BYTE: Aux = Aux(2);
}

/// The MSP430 processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Msp430;

impl Processor for Msp430 {
    type Itype = Itype;

    fn architecture(&self) -> Architecture {
        Architecture::Msp430
    }

    fn decode_raw(&self, image: &Image<'_>, at: Address) -> Result<Instruction<Itype>, DecodeError> {
        decode::decode(image, at)
    }

    fn simplify(&self, insn: Instruction<Itype>) -> Instruction<Itype> {
        simplify::simplify(insn)
    }

    fn feature(&self, itype: Itype) -> Feature {
        itype.feature()
    }

    fn mnemonic(&self, itype: Itype) -> &'static str {
        itype.name()
    }

    fn comment(&self, itype: Itype) -> Option<&'static str> {
        Some(itype.comment())
    }

    fn emulate(&self, insn: &Instruction<Itype>, ctx: &mut Context<'_>) -> Emulation {
        emu::emulate(insn, ctx)
    }

    fn render(&self, insn: &Instruction<Itype>, names: &dyn SymbolResolver) -> Line {
        out::render(insn, names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_is_simplified() {
        let bytes = 0x9305u16.to_le_bytes();
        let image = Image::new(&bytes, 0);
        assert_eq!(Msp430.decode_raw(&image, 0).unwrap().itype, Itype::Cmp);
        assert_eq!(Msp430.decode(&image, 0).unwrap().itype, Itype::Tst);
        assert_eq!(Msp430.comment(Itype::Tst), Some("Test destination"));
    }

    #[test]
    fn test_register_names() {
        assert_eq!(register_name(SP), "SP");
        assert_eq!(register_name(15), "R15");
        assert_eq!(register_name(16), "?");
    }
}
