//! EBC assembler syntax.

use crate::analysis::SymbolResolver;
use crate::arch::Instruction;
use crate::operand::{OpFlags, Operand, OperandKind};
use crate::render::{number, signed_number, Line, NumberStyle, Token};
use crate::Address;

use super::opcode::Itype;
use super::{aux, register_name, PointerSize};

const MNEMONIC_COLUMN: usize = 15;
const STYLE: NumberStyle = NumberStyle::CPrefix;

/// Suffixes in output order: operand-1 width, 32/64, EX, immediate width,
/// condition.
fn postfix(insn: &Instruction<Itype>) -> String {
    let mut out = String::new();
    if insn.aux.contains(aux::OP1) {
        out.push(insn.op1().width.letter());
    }
    if insn.aux.contains(aux::BITS32) {
        out.push_str("32");
    } else if insn.aux.contains(aux::BITS64) {
        out.push_str("64");
    }
    if insn.aux.contains(aux::NATIVE) {
        out.push_str("EX");
    }
    for (flag, letter) in [(aux::B, 'B'), (aux::W, 'W'), (aux::D, 'D'), (aux::Q, 'Q')] {
        if insn.aux.contains(flag) {
            out.push(letter);
            break;
        }
    }
    if insn.aux.contains(aux::CS) {
        out.push_str("CS");
    } else if insn.aux.contains(aux::NCS) {
        out.push_str("CC");
    }
    out
}

fn address(addr: Address, names: &dyn SymbolResolver) -> Token {
    match names.name_of(addr) {
        Some(name) => Token::Name(name),
        None => Token::Unresolved {
            addr,
            text: number(addr, STYLE),
        },
    }
}

fn operand(
    insn: &Instruction<Itype>,
    n: usize,
    op: &Operand,
    ptr: PointerSize,
    names: &dyn SymbolResolver,
) -> Vec<Token> {
    match op.kind {
        OperandKind::Register(r) => vec![Token::Register(register_name(r))],
        OperandKind::Immediate(value) => {
            if names.is_offset(insn.address, n) {
                vec![address(ptr.mask(value), names)]
            } else if op.flags.contains(OpFlags::SIGNED) {
                vec![Token::Number(signed_number(value as i64, STYLE, false))]
            } else {
                vec![Token::Number(number(ptr.mask(value), STYLE))]
            }
        }
        OperandKind::Near(addr)
        | OperandKind::AbsoluteMemory(addr)
        | OperandKind::SymbolicMemory(addr) => vec![address(addr, names)],
        OperandKind::Displacement { reg, offset } => {
            let indirect = op.flags.contains(OpFlags::INDIRECT);
            let mut tokens = Vec::with_capacity(4);
            if indirect {
                tokens.push(Token::Symbol("["));
            }
            tokens.push(Token::Register(register_name(reg)));
            if offset != 0 {
                tokens.push(Token::Number(signed_number(offset, STYLE, true)));
            }
            if indirect {
                tokens.push(Token::Symbol("]"));
            }
            tokens
        }
        OperandKind::Phrase { reg } => vec![
            Token::Symbol("["),
            Token::Register(register_name(reg)),
            Token::Symbol("]"),
        ],
        OperandKind::Void => Vec::new(),
    }
}

pub(super) fn render(
    insn: &Instruction<Itype>,
    ptr: PointerSize,
    names: &dyn SymbolResolver,
) -> Line {
    let mnemonic = format!("{}{}", insn.itype.name(), postfix(insn));
    let mut line = Line::new(mnemonic, MNEMONIC_COLUMN);
    for (n, op) in insn.operands.iter().enumerate() {
        if op.is_void() {
            break;
        }
        line.push_operand(operand(insn, n, op, ptr, names));
    }
    line
}
