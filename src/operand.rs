//! The operand model shared by both instruction sets.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::Address;

/// Data width of an operand or immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Width {
    #[default]
    Byte,
    Word,
    Dword,
    Qword,
}

impl Width {
    /// Map a 2-bit width selector (0 = byte … 3 = qword).
    pub fn from_selector(selector: u64) -> Self {
        match selector & 3 {
            0 => Width::Byte,
            1 => Width::Word,
            2 => Width::Dword,
            _ => Width::Qword,
        }
    }

    pub fn bytes(self) -> u64 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
            Width::Dword => 4,
            Width::Qword => 8,
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// Single-letter size tag used in mnemonic suffixes.
    pub fn letter(self) -> char {
        match self {
            Width::Byte => 'B',
            Width::Word => 'W',
            Width::Dword => 'D',
            Width::Qword => 'Q',
        }
    }

    /// Keep only the bits of `value` that fit this width.
    pub fn truncate(self, value: u64) -> u64 {
        match self {
            Width::Qword => value,
            w => value & ((1u64 << w.bits()) - 1),
        }
    }
}

/// Addressing nuances orthogonal to [`OperandKind`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpFlags(u8);

impl OpFlags {
    pub const NONE: OpFlags = OpFlags(0);
    /// `[reg + disp]` / `@reg`: the operand is the memory at the address.
    pub const INDIRECT: OpFlags = OpFlags(0x01);
    /// `@reg+`: register incremented after the access.
    pub const AUTOINC: OpFlags = OpFlags(0x02);
    /// Displacement is printed as a signed quantity.
    pub const SIGNED: OpFlags = OpFlags(0x04);
    /// Target was encoded relative to the next instruction.
    pub const RELATIVE: OpFlags = OpFlags(0x08);
    /// Call into native code rather than byte code.
    pub const NATIVE: OpFlags = OpFlags(0x10);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: OpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: OpFlags) {
        self.0 |= other.0;
    }
}

impl BitOr for OpFlags {
    type Output = OpFlags;

    fn bitor(self, rhs: OpFlags) -> OpFlags {
        OpFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpFlags {
    fn bitor_assign(&mut self, rhs: OpFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for OpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(OpFlags, &str); 5] = [
            (OpFlags::INDIRECT, "INDIRECT"),
            (OpFlags::AUTOINC, "AUTOINC"),
            (OpFlags::SIGNED, "SIGNED"),
            (OpFlags::RELATIVE, "RELATIVE"),
            (OpFlags::NATIVE, "NATIVE"),
        ];
        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "OpFlags({})", set.join(" | "))
    }
}

/// What an operand refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperandKind {
    /// Slot not used.
    #[default]
    Void,
    /// A register, by architecture register number.
    Register(u8),
    /// A literal value.
    Immediate(u64),
    /// Register plus displacement.
    Displacement { reg: u8, offset: i64 },
    /// Register indirect, optionally auto-incremented.
    Phrase { reg: u8 },
    /// A fixed data address.
    AbsoluteMemory(Address),
    /// A data address encoded relative to the program counter.
    SymbolicMemory(Address),
    /// A code address.
    Near(Address),
}

/// One operand slot of a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Operand {
    pub kind: OperandKind,
    pub width: Width,
    pub flags: OpFlags,
    /// Offset of the operand's encoding inside the instruction.
    pub offb: u8,
}

impl Operand {
    pub const VOID: Operand = Operand {
        kind: OperandKind::Void,
        width: Width::Byte,
        flags: OpFlags::NONE,
        offb: 0,
    };

    pub fn new(kind: OperandKind, width: Width) -> Self {
        Self {
            kind,
            width,
            flags: OpFlags::NONE,
            offb: 0,
        }
    }

    pub fn reg(reg: u8, width: Width) -> Self {
        Self::new(OperandKind::Register(reg), width)
    }

    pub fn imm(value: u64, width: Width) -> Self {
        Self::new(OperandKind::Immediate(value), width)
    }

    pub fn displ(reg: u8, offset: i64, width: Width) -> Self {
        Self::new(OperandKind::Displacement { reg, offset }, width)
    }

    pub fn phrase(reg: u8, width: Width) -> Self {
        Self::new(OperandKind::Phrase { reg }, width)
    }

    pub fn near(addr: Address, width: Width) -> Self {
        Self::new(OperandKind::Near(addr), width)
    }

    pub fn with_flags(mut self, flags: OpFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn at(mut self, offb: usize) -> Self {
        self.offb = offb as u8;
        self
    }

    pub fn is_void(&self) -> bool {
        self.kind == OperandKind::Void
    }

    pub fn is_reg(&self, reg: u8) -> bool {
        self.kind == OperandKind::Register(reg)
    }

    pub fn is_imm(&self, value: u64) -> bool {
        self.kind == OperandKind::Immediate(value)
    }

    /// `@reg+`
    pub fn is_autoinc(&self, reg: u8) -> bool {
        self.kind == OperandKind::Phrase { reg } && self.flags.contains(OpFlags::AUTOINC)
    }

    /// Structural equality, ignoring where the operand was encoded.
    pub fn same_as(&self, other: &Operand) -> bool {
        self.kind == other.kind && self.width == other.width && self.flags == other.flags
    }
}
