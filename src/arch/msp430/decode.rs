//! MSP430 instruction decoding.
//!
//! Every instruction starts with one 16-bit word; source and destination
//! extension words follow in that order.

use crate::arch::{Aux, DecodeError, Instruction};
use crate::bits::{bit, bits, sign_extend};
use crate::cursor::{Cursor, Image};
use crate::operand::{OpFlags, Operand, OperandKind, Width};
use crate::Address;

use super::opcode::{Itype, FORMAT_I, FORMAT_II, JUMPS};
use super::{aux, ADDRESS_MASK, PC, R3, SR};

type Decoded = Result<(Itype, [Operand; 2], Aux), DecodeError>;

pub(super) fn decode(image: &Image<'_>, at: Address) -> Result<Instruction<Itype>, DecodeError> {
    if at & 1 != 0 {
        return Err(DecodeError::Misaligned(at));
    }
    let mut cur = image.cursor(at);
    let word = u64::from(cur.next_u16()?);

    let (itype, operands, aux) = if bits(word, 15, 10) == 0b000100 {
        decode_single(&mut cur, word)
    } else if bits(word, 15, 13) == 0b001 {
        Ok(decode_jump(at, word))
    } else {
        decode_double(&mut cur, word)
    }?;

    Ok(Instruction {
        address: at,
        length: cur.consumed() as u8,
        itype,
        operands,
        aux,
    })
}

fn size_aux(byte: bool) -> Aux {
    if byte {
        aux::BYTE
    } else {
        aux::WORD
    }
}

/// Format I: `op src, dst`.
fn decode_double(cur: &mut Cursor<'_>, word: u64) -> Decoded {
    let itype = FORMAT_I[bits(word, 15, 12) as usize]
        .ok_or(DecodeError::UnknownOpcode(word as u16))?;
    let byte = bit(word, 6) != 0;
    let src = operand(cur, bits(word, 11, 8) as u8, bits(word, 5, 4), byte, true)?;
    let dst = operand(cur, bits(word, 3, 0) as u8, bit(word, 7), byte, false)?;
    Ok((itype, [src, dst], size_aux(byte)))
}

/// Format II: `op dst`.
fn decode_single(cur: &mut Cursor<'_>, word: u64) -> Decoded {
    let itype = FORMAT_II[bits(word, 9, 7) as usize]
        .ok_or(DecodeError::UnknownOpcode(word as u16))?;
    let byte = bit(word, 6) != 0;
    let mode = bits(word, 5, 4);
    let reg = bits(word, 3, 0) as u8;

    let size = match itype {
        Itype::Swpb | Itype::Sxt | Itype::Call | Itype::Reti if byte => {
            return Err(DecodeError::InvalidForm("byte-sized word operation"));
        }
        Itype::Swpb | Itype::Sxt | Itype::Call | Itype::Reti => aux::NOSUF,
        _ => size_aux(byte),
    };

    if itype == Itype::Reti {
        if mode != 0 || reg != 0 {
            return Err(DecodeError::InvalidForm("reti operand"));
        }
        return Ok((itype, [Operand::VOID; 2], size));
    }

    // push and call read their operand, so constant generators apply.
    let source = matches!(itype, Itype::Push | Itype::Call);
    let op = operand(cur, reg, mode, byte, source)?;
    Ok((itype, [op, Operand::VOID], size))
}

/// Jumps: 3-bit condition, signed 10-bit word offset from the next word.
fn decode_jump(at: Address, word: u64) -> (Itype, [Operand; 2], Aux) {
    let itype = JUMPS[bits(word, 12, 10) as usize];
    let offset = sign_extend(bits(word, 9, 0), 10) * 2;
    let target = (at as i64).wrapping_add(2).wrapping_add(offset) as u64 & ADDRESS_MASK;
    (
        itype,
        [Operand::near(target, Width::Word), Operand::VOID],
        aux::NOSUF,
    )
}

/// Decode one register/mode pair, consuming its extension word if any.
fn operand(cur: &mut Cursor<'_>, reg: u8, mode: u64, byte: bool, source: bool) -> Result<Operand, DecodeError> {
    let width = if byte { Width::Byte } else { Width::Word };

    if source {
        if reg == SR && mode >= 2 {
            return Ok(Operand::imm(if mode == 2 { 4 } else { 8 }, width));
        }
        if reg == R3 {
            let value = [0, 1, 2, 0xFFFF][mode as usize];
            return Ok(Operand::imm(value, width));
        }
    }

    let op = match mode {
        0 => Operand::reg(reg, Width::Word),
        1 => {
            let offb = cur.consumed();
            let word_at = cur.position();
            let x = u64::from(cur.next_u16()?);
            let kind = match reg {
                SR => OperandKind::AbsoluteMemory(x),
                PC => OperandKind::SymbolicMemory(word_at.wrapping_add(x) & ADDRESS_MASK),
                _ => OperandKind::Displacement {
                    reg,
                    offset: sign_extend(x, 16),
                },
            };
            Operand::new(kind, width).at(offb)
        }
        2 => Operand::phrase(reg, width).with_flags(OpFlags::INDIRECT),
        _ if reg == PC => {
            let offb = cur.consumed();
            Operand::imm(u64::from(cur.next_u16()?), width).at(offb)
        }
        _ => Operand::phrase(reg, width).with_flags(OpFlags::INDIRECT | OpFlags::AUTOINC),
    };
    Ok(op)
}
