//! EBC opcode table.

use crate::arch::Feature;

/// Canonical EBC mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Itype {
    Break,
    Jmp,
    Jmp8,
    Call,
    Ret,
    Cmpeq,
    Cmplte,
    Cmpgte,
    Cmpulte,
    Cmpugte,
    Not,
    Neg,
    Add,
    Sub,
    Mul,
    Mulu,
    Div,
    Divu,
    Mod,
    Modu,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ashr,
    Extndb,
    Extndw,
    Extndd,
    Movbw,
    Movww,
    Movdw,
    Movqw,
    Movbd,
    Movwd,
    Movdd,
    Movqd,
    Movsnw,
    Movsnd,
    Movqq,
    Loadsp,
    Storesp,
    Push,
    Pop,
    Cmpieq,
    Cmpilte,
    Cmpigte,
    Cmpiulte,
    Cmpiugte,
    Movnw,
    Movnd,
    Pushn,
    Popn,
    Movi,
    Movin,
    Movrel,
}

/// Encoding family; selects the decode routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Form {
    Break,
    Jmp,
    Jmp8,
    Call,
    Ret,
    Cmp,
    Binop,
    Mov,
    Movsn,
    Loadsp,
    Storesp,
    Push,
    Cmpi,
    Movi,
    Movrel,
}

use Itype::*;

/// Mnemonic by the low six bits of the first byte.
#[rustfmt::skip]
static OPCODES: [Option<Itype>; 64] = [
    // 0x00
    Some(Break), Some(Jmp), Some(Jmp8), Some(Call),
    Some(Ret), Some(Cmpeq), Some(Cmplte), Some(Cmpgte),
    Some(Cmpulte), Some(Cmpugte), Some(Not), Some(Neg),
    Some(Add), Some(Sub), Some(Mul), Some(Mulu),
    // 0x10
    Some(Div), Some(Divu), Some(Mod), Some(Modu),
    Some(And), Some(Or), Some(Xor), Some(Shl),
    Some(Shr), Some(Ashr), Some(Extndb), Some(Extndw),
    Some(Extndd), Some(Movbw), Some(Movww), Some(Movdw),
    // 0x20
    Some(Movqw), Some(Movbd), Some(Movwd), Some(Movdd),
    Some(Movqd), Some(Movsnw), Some(Movsnd), None,
    Some(Movqq), Some(Loadsp), Some(Storesp), Some(Push),
    Some(Pop), Some(Cmpieq), Some(Cmpilte), Some(Cmpigte),
    // 0x30
    Some(Cmpiulte), Some(Cmpiugte), Some(Movnw), Some(Movnd),
    None, Some(Pushn), Some(Popn), Some(Movi),
    Some(Movin), Some(Movrel), None, None,
    None, None, None, None,
];

impl Itype {
    /// Look up the low six bits of an opcode byte.
    pub fn from_opcode(byte: u8) -> Option<Itype> {
        OPCODES[(byte & 0x3F) as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            Break => "BREAK",
            Jmp => "JMP",
            Jmp8 => "JMP8",
            Call => "CALL",
            Ret => "RET",
            Cmpeq => "CMPEQ",
            Cmplte => "CMPLTE",
            Cmpgte => "CMPGTE",
            Cmpulte => "CMPULTE",
            Cmpugte => "CMPUGTE",
            Not => "NOT",
            Neg => "NEG",
            Add => "ADD",
            Sub => "SUB",
            Mul => "MUL",
            Mulu => "MULU",
            Div => "DIV",
            Divu => "DIVU",
            Mod => "MOD",
            Modu => "MODU",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            Shl => "SHL",
            Shr => "SHR",
            Ashr => "ASHR",
            Extndb => "EXTNDB",
            Extndw => "EXTNDW",
            Extndd => "EXTNDD",
            Movbw => "MOVBW",
            Movww => "MOVWW",
            Movdw => "MOVDW",
            Movqw => "MOVQW",
            Movbd => "MOVBD",
            Movwd => "MOVWD",
            Movdd => "MOVDD",
            Movqd => "MOVQD",
            Movsnw => "MOVSNW",
            Movsnd => "MOVSND",
            Movqq => "MOVQQ",
            Loadsp => "LOADSP",
            Storesp => "STORESP",
            Push => "PUSH",
            Pop => "POP",
            Cmpieq => "CMPIEQ",
            Cmpilte => "CMPILTE",
            Cmpigte => "CMPIGTE",
            Cmpiulte => "CMPIULTE",
            Cmpiugte => "CMPIUGTE",
            Movnw => "MOVNW",
            Movnd => "MOVND",
            Pushn => "PUSHN",
            Popn => "POPN",
            Movi => "MOVI",
            Movin => "MOVIN",
            Movrel => "MOVREL",
        }
    }

    pub fn feature(self) -> Feature {
        const MODIFY: Feature = Feature::USE1.union(Feature::USE2).union(Feature::CHG1);
        const COMPARE: Feature = Feature::USE1.union(Feature::USE2);
        match self {
            Break | Push | Pop | Pushn | Popn => Feature::USE1,
            Jmp | Jmp8 => Feature::USE1 | Feature::JUMP,
            Call => Feature::USE1 | Feature::CALL,
            Ret => Feature::STOP,
            Cmpeq | Cmplte | Cmpgte | Cmpulte | Cmpugte => COMPARE,
            Cmpieq | Cmpilte | Cmpigte | Cmpiulte | Cmpiugte => COMPARE,
            Shl | Shr | Ashr => MODIFY | Feature::SHFT,
            _ => MODIFY,
        }
    }

    pub(crate) fn form(self) -> Form {
        match self {
            Break => Form::Break,
            Jmp => Form::Jmp,
            Jmp8 => Form::Jmp8,
            Call => Form::Call,
            Ret => Form::Ret,
            Cmpeq | Cmplte | Cmpgte | Cmpulte | Cmpugte => Form::Cmp,
            Not | Neg | Add | Sub | Mul | Mulu | Div | Divu | Mod | Modu | And | Or | Xor | Shl
            | Shr | Ashr | Extndb | Extndw | Extndd => Form::Binop,
            Movbw | Movww | Movdw | Movqw | Movbd | Movwd | Movdd | Movqd | Movqq | Movnw
            | Movnd => Form::Mov,
            Movsnw | Movsnd => Form::Movsn,
            Loadsp => Form::Loadsp,
            Storesp => Form::Storesp,
            Push | Pop | Pushn | Popn => Form::Push,
            Cmpieq | Cmpilte | Cmpigte | Cmpiulte | Cmpiugte => Form::Cmpi,
            Movi | Movin => Form::Movi,
            Movrel => Form::Movrel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_opcodes() {
        for op in [0x27u8, 0x34, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F] {
            assert_eq!(Itype::from_opcode(op), None, "opcode {op:#x}");
        }
        assert_eq!(OPCODES.iter().flatten().count(), 56);
    }

    #[test]
    fn test_selector_bits_ignored() {
        assert_eq!(Itype::from_opcode(0x81), Some(Jmp));
        assert_eq!(Itype::from_opcode(0xC9), Some(Cmpugte));
        assert_eq!(Itype::from_opcode(0x36), Some(Popn));
    }

    #[test]
    fn test_features() {
        assert!(Ret.feature().contains(Feature::STOP));
        assert!(Call.feature().contains(Feature::CALL));
        assert!(Add.feature().changes(0));
        assert!(!Cmpieq.feature().changes(0));
        assert!(Ashr.feature().contains(Feature::SHFT));
    }
}
