//! MSP430 assembler syntax.

use crate::analysis::SymbolResolver;
use crate::arch::Instruction;
use crate::operand::{OpFlags, Operand, OperandKind, Width};
use crate::render::{number, signed_number, Line, NumberStyle, Token};
use crate::Address;

use super::opcode::Itype;
use super::{aux, register_name, ADDRESS_MASK};

const MNEMONIC_COLUMN: usize = 12;
const STYLE: NumberStyle = NumberStyle::HSuffix;

fn address(addr: Address, names: &dyn SymbolResolver) -> Token {
    match names.name_of(addr) {
        Some(name) => Token::Name(name),
        None => Token::Unresolved {
            addr,
            text: number(addr, STYLE),
        },
    }
}

fn operand(insn: &Instruction<Itype>, n: usize, op: &Operand, names: &dyn SymbolResolver) -> Vec<Token> {
    let at = insn.address;
    match op.kind {
        OperandKind::Register(r) => vec![Token::Register(register_name(r))],
        OperandKind::Immediate(value) => {
            let value = if names.is_offset(at, n) {
                address(value & ADDRESS_MASK, names)
            } else {
                let width = if insn.aux == aux::BYTE {
                    Width::Byte
                } else {
                    Width::Word
                };
                Token::Number(number(width.truncate(value), STYLE))
            };
            vec![Token::Symbol("#"), value]
        }
        OperandKind::Near(addr) | OperandKind::SymbolicMemory(addr) => vec![address(addr, names)],
        OperandKind::AbsoluteMemory(addr) => vec![Token::Symbol("&"), address(addr, names)],
        OperandKind::Displacement { reg, offset } => {
            let base = if let Some(var) = names.frame_var(at, n) {
                Token::Name(var)
            } else if names.is_offset(at, n) {
                address(offset as u64 & ADDRESS_MASK, names)
            } else {
                Token::Number(signed_number(offset, STYLE, false))
            };
            vec![
                base,
                Token::Symbol("("),
                Token::Register(register_name(reg)),
                Token::Symbol(")"),
            ]
        }
        OperandKind::Phrase { reg } => {
            let mut tokens = vec![Token::Symbol("@"), Token::Register(register_name(reg))];
            if op.flags.contains(OpFlags::AUTOINC) {
                tokens.push(Token::Symbol("+"));
            }
            tokens
        }
        OperandKind::Void => Vec::new(),
    }
}

pub(super) fn render(insn: &Instruction<Itype>, names: &dyn SymbolResolver) -> Line {
    let suffix = match insn.aux {
        aux::BYTE => ".b",
        aux::WORD => ".w",
        _ => "",
    };
    let mut line = Line::new(format!("{}{}", insn.itype.name(), suffix), MNEMONIC_COLUMN);
    for (n, op) in insn.operands.iter().enumerate() {
        if op.is_void() {
            break;
        }
        line.push_operand(operand(insn, n, op, names));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Database, Routine, RoutineDb};
    use crate::arch::msp430::Msp430;
    use crate::arch::Processor;
    use crate::cursor::Image;

    fn text(words: &[u16], base: Address, db: &Database) -> String {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        let image = Image::new(&bytes, base);
        let insn = Msp430.decode(&image, base).unwrap();
        Msp430.render(&insn, db).to_string()
    }

    #[test]
    fn test_emulated_without_suffix() {
        let db = Database::new();
        assert_eq!(text(&[0x9305], 0, &db), "tst         R5");
        assert_eq!(text(&[0x4130], 0, &db), "ret");
        assert_eq!(text(&[0x4135], 0, &db), "pop         R5");
    }

    #[test]
    fn test_size_suffix_and_numbers() {
        let db = Database::new();
        // mov.w #0x1234, 4(R6)
        assert_eq!(
            text(&[0x40B6, 0x1234, 0x0004], 0, &db),
            "mov.w       #1234h, 4(R6)"
        );
        // and.b #0xFF, R5
        assert_eq!(text(&[0xF375], 0, &db), "and.b       #0FFh, R5");
        assert_eq!(text(&[0x5315], 0, &db), "inc.w       R5");
        assert_eq!(text(&[0x4566], 0, &db), "mov.b       @R5, R6");
        assert_eq!(text(&[0x4576], 0, &db), "mov.b       @R5+, R6");
    }

    #[test]
    fn test_negative_index() {
        let mut db = Database::new();
        assert_eq!(text(&[0x4415, 0xFFFE], 0, &db), "mov.w       -2(R4), R5");
        // a table base marked as an address prints as one
        db.set_name(0xC00C, "table");
        db.set_offset(0, 0);
        assert_eq!(text(&[0x4E10, 0xC00C], 0, &db), "br          table(R14)");
    }

    #[test]
    fn test_addresses() {
        let mut db = Database::new();
        db.set_name(0x0200, "counter");
        assert_eq!(text(&[0x4215, 0x0200], 0, &db), "mov.w       &counter, R5");
        assert_eq!(text(&[0x4215, 0x0300], 0, &db), "mov.w       &300h, R5");
        assert_eq!(text(&[0x3FFF], 0xC000, &db), "jmp         0C000h");
    }

    #[test]
    fn test_call_target_marked_as_offset() {
        let mut db = Database::new();
        db.set_name(0xC100, "init");
        assert_eq!(text(&[0x12B0, 0xC100], 0xC000, &db), "call        #0C100h");
        db.set_offset(0xC000, 0);
        assert_eq!(text(&[0x12B0, 0xC100], 0xC000, &db), "call        #init");
    }

    #[test]
    fn test_frame_variable() {
        let mut db = Database::new();
        db.add_routine(0, None);
        let routine = Routine {
            start: 0,
            end: None,
        };
        assert!(db.add_frame_var(&routine, 0, 0, 4));
        assert_eq!(text(&[0x4116, 0x0004], 0, &db), "mov.w       arg_2(SP), R6");
    }
}
