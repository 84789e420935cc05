//! MSP430 opcode tables.

use crate::arch::Feature;

/// Canonical MSP430 mnemonics, including the emulated ones produced by the
/// simplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Itype {
    // two-operand
    Mov,
    Add,
    Addc,
    Sub,
    Subc,
    Cmp,
    Dadd,
    Bit,
    Bic,
    Bis,
    Xor,
    And,
    // one-operand
    Rrc,
    Swpb,
    Rra,
    Sxt,
    Push,
    Call,
    Reti,
    // jumps
    Jnz,
    Jz,
    Jc,
    Jnc,
    Jn,
    Jge,
    Jl,
    Jmp,
    // emulated
    Adc,
    Br,
    Clr,
    Clrc,
    Clrn,
    Clrz,
    Dadc,
    Dec,
    Decd,
    Dint,
    Eint,
    Inc,
    Incd,
    Inv,
    Nop,
    Pop,
    Ret,
    Rla,
    Rlc,
    Sbc,
    Setc,
    Setn,
    Setz,
    Tst,
}

use Itype::*;

/// Format I by bits 15..12; 0-3 belong to the other formats.
pub(crate) static FORMAT_I: [Option<Itype>; 16] = [
    None,
    None,
    None,
    None,
    Some(Mov),
    Some(Add),
    Some(Addc),
    Some(Subc),
    Some(Sub),
    Some(Cmp),
    Some(Dadd),
    Some(Bit),
    Some(Bic),
    Some(Bis),
    Some(Xor),
    Some(And),
];

/// Format II by bits 9..7; 7 is unassigned.
pub(crate) static FORMAT_II: [Option<Itype>; 8] = [
    Some(Rrc),
    Some(Swpb),
    Some(Rra),
    Some(Sxt),
    Some(Push),
    Some(Call),
    Some(Reti),
    None,
];

/// Jumps by condition bits 12..10.
pub(crate) static JUMPS: [Itype; 8] = [Jnz, Jz, Jc, Jnc, Jn, Jge, Jl, Jmp];

impl Itype {
    pub fn name(self) -> &'static str {
        match self {
            Mov => "mov",
            Add => "add",
            Addc => "addc",
            Sub => "sub",
            Subc => "subc",
            Cmp => "cmp",
            Dadd => "dadd",
            Bit => "bit",
            Bic => "bic",
            Bis => "bis",
            Xor => "xor",
            And => "and",
            Rrc => "rrc",
            Swpb => "swpb",
            Rra => "rra",
            Sxt => "sxt",
            Push => "push",
            Call => "call",
            Reti => "reti",
            Jnz => "jnz",
            Jz => "jz",
            Jc => "jc",
            Jnc => "jnc",
            Jn => "jn",
            Jge => "jge",
            Jl => "jl",
            Jmp => "jmp",
            Adc => "adc",
            Br => "br",
            Clr => "clr",
            Clrc => "clrc",
            Clrn => "clrn",
            Clrz => "clrz",
            Dadc => "dadc",
            Dec => "dec",
            Decd => "decd",
            Dint => "dint",
            Eint => "eint",
            Inc => "inc",
            Incd => "incd",
            Inv => "inv",
            Nop => "nop",
            Pop => "pop",
            Ret => "ret",
            Rla => "rla",
            Rlc => "rlc",
            Sbc => "sbc",
            Setc => "setc",
            Setn => "setn",
            Setz => "setz",
            Tst => "tst",
        }
    }

    pub fn feature(self) -> Feature {
        const MODIFY1: Feature = Feature::USE1.union(Feature::CHG1);
        match self {
            Mov => Feature::USE1 | Feature::CHG2,
            Cmp | Bit => Feature::USE1 | Feature::USE2,
            Add | Addc | Sub | Subc | Dadd | Bic | Bis | Xor | And => {
                Feature::USE1 | Feature::USE2 | Feature::CHG2
            }
            Rrc | Swpb | Rra | Sxt => MODIFY1,
            Push | Call | Tst => Feature::USE1,
            Jnz | Jz | Jc | Jnc | Jn | Jge | Jl => Feature::USE1,
            Jmp | Br => Feature::USE1 | Feature::STOP,
            Reti | Ret => Feature::STOP,
            Adc | Dadc | Dec | Decd | Inc | Incd | Inv | Rla | Rlc | Sbc => MODIFY1,
            Clr | Pop => Feature::CHG1,
            Clrc | Clrn | Clrz | Dint | Eint | Nop | Setc | Setn | Setz => Feature::NONE,
        }
    }

    pub fn comment(self) -> &'static str {
        match self {
            Mov => "Move source to destination",
            Add => "Add source to destination",
            Addc => "Add source and carry to destination",
            Sub => "Subtract source from destination",
            Subc => "Subtract source with carry from destination",
            Cmp => "Compare source and destination",
            Dadd => "Add source decimally to destination",
            Bit => "Test bits set in source in destination",
            Bic => "Clear bits set in source in destination",
            Bis => "Set bits set in source in destination",
            Xor => "Exclusive OR source with destination",
            And => "Binary AND source and destination",
            Rrc => "Rotate right through C",
            Swpb => "Swap bytes",
            Rra => "Rotate right arithmetically",
            Sxt => "Extend sign (8 bits to 16)",
            Push => "Push onto stack",
            Call => "Call subroutine",
            Reti => "Return from interrupt",
            Jnz => "Jump if not zero/not equal",
            Jz => "Jump if zero/equal",
            Jc => "Jump if carry/higher or same (unsigned)",
            Jnc => "Jump if no carry/lower (unsigned)",
            Jn => "Jump if negative",
            Jge => "Jump if greater or equal (signed)",
            Jl => "Jump if less (signed)",
            Jmp => "Jump unconditionally",
            Adc => "Add carry to destination",
            Br => "Branch to destination",
            Clr => "Clear destination",
            Clrc => "Clear carry bit",
            Clrn => "Clear negative bit",
            Clrz => "Clear zero bit",
            Dadc => "Add carry decimally to destination",
            Dec => "Decrement destination",
            Decd => "Double-decrement destination",
            Dint => "Disable general interrupts",
            Eint => "Enable general interrupts",
            Inc => "Increment destination",
            Incd => "Double-increment destination",
            Inv => "Invert destination",
            Nop => "No operation",
            Pop => "Pop from the stack",
            Ret => "Return from subroutine",
            Rla => "Rotate left arithmetically",
            Rlc => "Rotate left through carry",
            Sbc => "Subtract borrow (=NOT carry) from destination",
            Setc => "Set carry bit",
            Setn => "Set negative bit",
            Setz => "Set zero bit",
            Tst => "Test destination",
        }
    }

    pub fn is_conditional_jump(self) -> bool {
        matches!(self, Jnz | Jz | Jc | Jnc | Jn | Jge | Jl)
    }
}
