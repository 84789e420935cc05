//! EBC instruction decoding.
//!
//! Byte 0 carries the opcode in its low six bits and form-specific
//! modifiers in bits 6 and 7; byte 1, when present, selects registers and
//! addressing. Immediates, indexes and branch targets follow in that order.

use crate::arch::{Aux, DecodeError, Instruction};
use crate::bits::sign_extend;
use crate::cursor::{Cursor, Image};
use crate::operand::{OpFlags, Operand, OperandKind, Width};
use crate::Address;

use super::index::{decode_index, PointerSize};
use super::opcode::{Form, Itype};
use super::{aux, FLAGS};

type Decoded = Result<([Operand; 2], Aux), DecodeError>;

pub(super) fn decode(
    image: &Image<'_>,
    at: Address,
    ptr: PointerSize,
) -> Result<Instruction<Itype>, DecodeError> {
    let mut cur = image.cursor(at);
    let byte0 = cur.next_u8()?;
    let itype =
        Itype::from_opcode(byte0).ok_or(DecodeError::UnknownOpcode(u16::from(byte0 & 0x3F)))?;

    let (operands, aux) = match itype.form() {
        Form::Break => decode_break(&mut cur),
        Form::Ret => decode_ret(&mut cur),
        Form::Jmp => decode_jmp(&mut cur, byte0, ptr),
        Form::Jmp8 => decode_jmp8(&mut cur, byte0, ptr),
        Form::Call => decode_call(&mut cur, byte0, ptr),
        Form::Cmp => decode_cmp(&mut cur, byte0, ptr),
        Form::Cmpi => decode_cmpi(&mut cur, byte0, ptr),
        Form::Binop => decode_binop(&mut cur, byte0, ptr),
        Form::Mov => decode_mov(&mut cur, byte0, ptr),
        Form::Movsn => decode_movsn(&mut cur, byte0, ptr),
        Form::Movi => decode_movi(&mut cur, byte0, ptr),
        Form::Movrel => decode_movrel(&mut cur, byte0, ptr),
        Form::Push => decode_push(&mut cur, byte0, ptr),
        Form::Loadsp => decode_loadsp(&mut cur),
        Form::Storesp => decode_storesp(&mut cur),
    }?;

    Ok(Instruction {
        address: at,
        length: cur.consumed() as u8,
        itype,
        operands,
        aux,
    })
}

fn has_data(byte0: u8) -> bool {
    byte0 & 0x80 != 0
}

/// Bit 6 of byte 0 clear selects the 32-bit form.
fn is_32(byte0: u8) -> bool {
    byte0 & 0x40 == 0
}

fn op_size(byte0: u8) -> (Width, Aux) {
    if is_32(byte0) {
        (Width::Dword, aux::BITS32)
    } else {
        (Width::Qword, aux::BITS64)
    }
}

fn size_aux(width: Width) -> Aux {
    match width {
        Width::Byte => aux::B,
        Width::Word => aux::W,
        Width::Dword => aux::D,
        Width::Qword => aux::Q,
    }
}

/// `Rn` or `@Rn`.
fn register(reg: u8, direct: bool, width: Width) -> Operand {
    if direct {
        Operand::reg(reg, width)
    } else {
        Operand::displ(reg, 0, width).with_flags(OpFlags::INDIRECT)
    }
}

/// Read an index of `width` and return its signed offset.
fn next_index(cur: &mut Cursor<'_>, width: Width, ptr: PointerSize) -> Result<i64, DecodeError> {
    let raw = cur.next_sized(width)?;
    Ok(decode_index(raw, width.bits(), ptr)?.signed_offset)
}

/// Register plus 16-bit data: an index when indirect, a plain signed
/// displacement otherwise.
fn displaced16(
    cur: &mut Cursor<'_>,
    reg: u8,
    direct: bool,
    width: Width,
    ptr: PointerSize,
) -> Result<Operand, DecodeError> {
    let offb = cur.consumed();
    let raw = cur.next_u16()?;
    let op = if direct {
        Operand::displ(reg, sign_extend(u64::from(raw), 16), width)
    } else {
        let offset = decode_index(u64::from(raw), 16, ptr)?.signed_offset;
        Operand::displ(reg, offset, width).with_flags(OpFlags::INDIRECT)
    };
    Ok(op.at(offb))
}

fn decode_break(cur: &mut Cursor<'_>) -> Decoded {
    let offb = cur.consumed();
    let code = cur.next_u8()?;
    let op = Operand::imm(u64::from(code), Width::Byte).at(offb);
    Ok(([op, Operand::VOID], Aux::NONE))
}

fn decode_ret(cur: &mut Cursor<'_>) -> Decoded {
    // second byte is padding
    cur.next_u8()?;
    Ok(([Operand::VOID; 2], Aux::NONE))
}

fn decode_storesp(cur: &mut Cursor<'_>) -> Decoded {
    let b = cur.next_u8()?;
    let vm = (b & 0x70) >> 4;
    let gp = b & 0x07;
    Ok((
        [Operand::reg(gp, Width::Qword), Operand::reg(FLAGS + vm, Width::Qword)],
        Aux::NONE,
    ))
}

fn decode_loadsp(cur: &mut Cursor<'_>) -> Decoded {
    let b = cur.next_u8()?;
    let gp = (b & 0x70) >> 4;
    let vm = b & 0x07;
    Ok((
        [Operand::reg(FLAGS + vm, Width::Qword), Operand::reg(gp, Width::Qword)],
        Aux::NONE,
    ))
}

/// PUSH, POP and their natural-size variants.
fn decode_push(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let natural = matches!(byte0 & 0x3F, 0x35 | 0x36);
    let b = cur.next_u8()?;
    let direct = b & 0x08 == 0;
    let r1 = b & 0x07;

    let (width, size) = if natural {
        (Width::Qword, Aux::NONE)
    } else {
        op_size(byte0)
    };
    let op = if has_data(byte0) {
        displaced16(cur, r1, direct, width, ptr)?
    } else {
        register(r1, direct, width)
    };
    Ok(([op, Operand::VOID], size))
}

fn decode_jmp(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let b = cur.next_u8()?;
    let conditional = b & 0x80 != 0;
    let cs = b & 0x40 != 0;
    let relative = b & 0x10 != 0;
    let direct = b & 0x08 == 0;
    let r1 = b & 0x07;

    let mut flags = if relative { OpFlags::RELATIVE } else { OpFlags::NONE };
    let op = if is_32(byte0) {
        if !direct && !has_data(byte0) {
            return Err(DecodeError::InvalidForm("indirect JMP32 without data"));
        }
        if has_data(byte0) {
            let offb = cur.consumed();
            let raw = u64::from(cur.next_u32()?);
            let mut value = if direct {
                sign_extend(raw, 32)
            } else {
                flags |= OpFlags::INDIRECT;
                decode_index(raw, 32, ptr)?.signed_offset
            };
            if relative {
                value = value.wrapping_add(cur.position() as i64);
            }
            let kind = if r1 == 0 {
                OperandKind::Near(ptr.mask(value as u64))
            } else {
                OperandKind::Displacement { reg: r1, offset: value }
            };
            Operand::new(kind, Width::Dword).at(offb)
        } else {
            Operand::reg(r1, Width::Dword)
        }
    } else {
        let offb = cur.consumed();
        let mut target = cur.next_u64()?;
        if relative {
            target = target.wrapping_add(cur.position());
        }
        Operand::near(ptr.mask(target), Width::Qword).at(offb)
    };

    let (_, mut mode) = op_size(byte0);
    if conditional {
        mode = mode | if cs { aux::CS } else { aux::NCS };
    }
    Ok(([op.with_flags(flags), Operand::VOID], mode))
}

fn decode_jmp8(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let offb = cur.consumed();
    let raw = cur.next_u8()?;
    let target = cur
        .position()
        .wrapping_add((sign_extend(u64::from(raw), 8) * 2) as u64);
    let op = Operand::near(ptr.mask(target), Width::Byte)
        .with_flags(OpFlags::RELATIVE)
        .at(offb);

    let condition = match (byte0 & 0x80 != 0, byte0 & 0x40 != 0) {
        (false, _) => Aux::NONE,
        (true, true) => aux::CS,
        (true, false) => aux::NCS,
    };
    Ok(([op, Operand::VOID], condition))
}

fn decode_call(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let b = cur.next_u8()?;
    let native = b & 0x20 != 0;
    let relative = b & 0x10 != 0;
    let direct = b & 0x08 == 0;
    let r1 = b & 0x07;

    let mut flags = OpFlags::NONE;
    if native {
        flags |= OpFlags::NATIVE;
    }
    if relative {
        flags |= OpFlags::RELATIVE;
    }

    let (_, size) = op_size(byte0);
    let op = if is_32(byte0) {
        if has_data(byte0) {
            let offb = cur.consumed();
            let raw = u64::from(cur.next_u32()?);
            let mut value = if direct {
                sign_extend(raw, 32)
            } else {
                flags |= OpFlags::INDIRECT;
                decode_index(raw, 32, ptr)?.signed_offset
            };
            if relative {
                value = value.wrapping_add(cur.position() as i64);
            }
            let kind = if r1 == 0 {
                OperandKind::Near(ptr.mask(value as u64))
            } else {
                OperandKind::Displacement { reg: r1, offset: value }
            };
            Operand::new(kind, Width::Dword).at(offb)
        } else {
            register(r1, direct, Width::Dword)
        }
    } else {
        let offb = cur.consumed();
        let mut target = cur.next_u64()?;
        if relative {
            target = target.wrapping_add(cur.position());
        }
        Operand::near(ptr.mask(target), Width::Qword).at(offb)
    };

    let mode = if native { size | aux::NATIVE } else { size };
    Ok(([op.with_flags(flags), Operand::VOID], mode))
}

/// CMPxx: register against register or 16-bit displaced operand.
fn decode_cmp(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let b = cur.next_u8()?;
    let op2_direct = b & 0x80 == 0;
    let r1 = b & 0x07;
    let r2 = (b & 0x70) >> 4;
    let (width, size) = op_size(byte0);

    let op1 = Operand::reg(r1, width);
    let op2 = if has_data(byte0) {
        displaced16(cur, r2, op2_direct, width, ptr)?
    } else {
        register(r2, op2_direct, width)
    };
    Ok(([op1, op2], size))
}

/// CMPIxx: operand 1 against a 16 or 32-bit immediate.
fn decode_cmpi(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let imm_width = if has_data(byte0) { Width::Dword } else { Width::Word };
    let (_, size) = op_size(byte0);

    let b = cur.next_u8()?;
    let indexed = b & 0x10 != 0;
    let direct = b & 0x08 == 0;
    let r1 = b & 0x07;
    if indexed && direct {
        return Err(DecodeError::IndexedDirect);
    }

    let op1 = if indexed {
        let offb = cur.consumed();
        let offset = next_index(cur, Width::Word, ptr)?;
        Operand::displ(r1, offset, imm_width)
            .with_flags(OpFlags::INDIRECT)
            .at(offb)
    } else {
        register(r1, direct, imm_width)
    };

    let offb = cur.consumed();
    let value = cur.next_sized(imm_width)?;
    let op2 = Operand::imm(value, imm_width).at(offb);
    Ok(([op1, op2], size | size_aux(imm_width)))
}

/// Two-operand arithmetic: `op1 = op1 <op> op2`.
fn decode_binop(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let b = cur.next_u8()?;
    let op2_direct = b & 0x80 == 0;
    let op1_direct = b & 0x08 == 0;
    let r1 = b & 0x07;
    let r2 = (b & 0x70) >> 4;
    let (width, size) = op_size(byte0);

    let op1 = register(r1, op1_direct, width);
    let op2 = if has_data(byte0) {
        displaced16(cur, r2, op2_direct, width, ptr)?
    } else {
        register(r2, op2_direct, width)
    };
    Ok(([op1, op2], size))
}

/// MOVxW, MOVxD, MOVQQ, MOVNW, MOVND: (index width, move width).
fn mov_widths(opcode: u8) -> Result<(Width, Width), DecodeError> {
    match opcode {
        0x1D..=0x20 => Ok((Width::Word, Width::from_selector(u64::from(opcode - 0x1D)))),
        0x21..=0x24 => Ok((Width::Dword, Width::from_selector(u64::from(opcode - 0x21)))),
        0x28 => Ok((Width::Qword, Width::Qword)),
        0x32 => Ok((Width::Word, Width::Qword)),
        0x33 => Ok((Width::Dword, Width::Qword)),
        _ => Err(DecodeError::InvalidForm("MOV opcode")),
    }
}

/// One side of a MOV: optionally indexed, optionally indirect.
fn mov_operand(
    cur: &mut Cursor<'_>,
    reg: u8,
    direct: bool,
    indexed: bool,
    index_width: Width,
    width: Width,
    ptr: PointerSize,
) -> Result<Operand, DecodeError> {
    if !indexed {
        return Ok(register(reg, direct, width).with_flags(OpFlags::SIGNED));
    }
    let offb = cur.consumed();
    let offset = next_index(cur, index_width, ptr)?;
    let mut flags = OpFlags::SIGNED;
    if !direct {
        flags |= OpFlags::INDIRECT;
    }
    Ok(Operand::displ(reg, offset, width).with_flags(flags).at(offb))
}

fn decode_mov(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let (index_width, width) = mov_widths(byte0 & 0x3F)?;
    let b = cur.next_u8()?;
    let op2_direct = b & 0x80 == 0;
    let op1_direct = b & 0x08 == 0;
    let r1 = b & 0x07;
    let r2 = (b & 0x70) >> 4;

    let op1 = mov_operand(cur, r1, op1_direct, byte0 & 0x80 != 0, index_width, width, ptr)?;
    let op2 = mov_operand(cur, r2, op2_direct, byte0 & 0x40 != 0, index_width, width, ptr)?;
    Ok(([op1, op2], Aux::NONE))
}

/// MOVSNW/MOVSND: signed natural moves. A direct second operand takes its
/// data as a plain signed immediate.
fn decode_movsn(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let index_width = match byte0 & 0x3F {
        0x25 => Width::Word,
        0x26 => Width::Dword,
        _ => return Err(DecodeError::InvalidForm("MOVSN opcode")),
    };
    let b = cur.next_u8()?;
    let op2_direct = b & 0x80 == 0;
    let op1_direct = b & 0x08 == 0;
    let r1 = b & 0x07;
    let r2 = (b & 0x70) >> 4;

    let op1 = mov_operand(cur, r1, op1_direct, byte0 & 0x80 != 0, index_width, Width::Qword, ptr)?;
    let op2 = if byte0 & 0x40 != 0 {
        let offb = cur.consumed();
        let raw = cur.next_sized(index_width)?;
        let op = if op2_direct {
            Operand::displ(r2, sign_extend(raw, index_width.bits()), Width::Qword)
        } else {
            let offset = decode_index(raw, index_width.bits(), ptr)?.signed_offset;
            Operand::displ(r2, offset, Width::Qword).with_flags(OpFlags::INDIRECT)
        };
        op.at(offb)
    } else {
        register(r2, op2_direct, Width::Qword)
    };
    Ok(([op1, op2], Aux::NONE))
}

/// Shared byte-1 layout of MOVI, MOVIN and MOVREL.
struct ImmediateTarget {
    width: Width,
    op1: Operand,
}

fn immediate_target(
    cur: &mut Cursor<'_>,
    byte0: u8,
    ptr: PointerSize,
) -> Result<ImmediateTarget, DecodeError> {
    let selector = u64::from(byte0 >> 6);
    if selector == 0 {
        return Err(DecodeError::ZeroWidth);
    }
    let b = cur.next_u8()?;
    if b & 0x80 != 0 {
        return Err(DecodeError::ReservedBit("operand"));
    }
    let indexed = b & 0x40 != 0;
    let move_width = Width::from_selector(u64::from((b & 0x30) >> 4));
    let direct = b & 0x08 == 0;
    let r1 = b & 0x07;
    if indexed && direct {
        return Err(DecodeError::IndexedDirect);
    }

    let op1 = if indexed {
        let offb = cur.consumed();
        let offset = next_index(cur, Width::Word, ptr)?;
        Operand::displ(r1, offset, move_width)
            .with_flags(OpFlags::INDIRECT)
            .at(offb)
    } else {
        register(r1, direct, move_width)
    };
    Ok(ImmediateTarget {
        width: Width::from_selector(selector),
        op1,
    })
}

/// MOVI (immediate) and MOVIN (natural index as immediate).
fn decode_movi(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let natural = byte0 & 0x3F == 0x38;
    let target = immediate_target(cur, byte0, ptr)?;
    let mut op1 = target.op1;

    let offb = cur.consumed();
    let raw = cur.next_sized(target.width)?;
    let op2 = if natural {
        op1.width = target.width;
        let offset = decode_index(raw, target.width.bits(), ptr)?.signed_offset;
        Operand::imm(offset as u64, target.width).with_flags(OpFlags::SIGNED)
    } else {
        Operand::imm(raw, target.width)
    };

    let mut mode = size_aux(target.width);
    if !natural {
        mode = mode | aux::OP1;
    }
    Ok(([op1, op2.at(offb)], mode))
}

/// MOVREL: operand 1 receives an address relative to the next instruction.
fn decode_movrel(cur: &mut Cursor<'_>, byte0: u8, ptr: PointerSize) -> Decoded {
    let target = immediate_target(cur, byte0, ptr)?;
    let mut op1 = target.op1;
    op1.width = Width::Qword;

    let offb = cur.consumed();
    let raw = cur.next_sized(target.width)?;
    let delta = sign_extend(raw, target.width.bits());
    let addr = ptr.mask(cur.position().wrapping_add(delta as u64));
    let op2 = Operand::new(OperandKind::AbsoluteMemory(addr), target.width)
        .with_flags(OpFlags::RELATIVE)
        .at(offb);
    Ok(([op1, op2], size_aux(target.width)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ebc::index::pack;

    fn decode_at(bytes: &[u8], base: Address) -> Result<Instruction<Itype>, DecodeError> {
        decode(&Image::new(bytes, base), base, PointerSize::Four)
    }

    #[test]
    fn test_jmp32_absolute() {
        let insn = decode_at(&[0x81, 0x00, 0x10, 0x00, 0x00, 0x00], 0x1000).unwrap();
        assert_eq!(insn.itype, Itype::Jmp);
        assert_eq!(insn.length, 6);
        assert_eq!(insn.op1().kind, OperandKind::Near(0x10));
        assert_eq!(insn.op1().offb, 2);
        assert_eq!(insn.aux, aux::BITS32);
    }

    #[test]
    fn test_jmp32_relative_conditional() {
        let insn = decode_at(&[0x81, 0xD0, 0xFA, 0xFF, 0xFF, 0xFF], 0x2000).unwrap();
        // -6 from the end of the 6-byte instruction
        assert_eq!(insn.op1().kind, OperandKind::Near(0x2000));
        assert!(insn.aux.contains(aux::CS));
        assert!(insn.op1().flags.contains(OpFlags::RELATIVE));
    }

    #[test]
    fn test_jmp32_indirect_needs_data() {
        assert_eq!(
            decode_at(&[0x01, 0x08], 0).unwrap_err(),
            DecodeError::InvalidForm("indirect JMP32 without data")
        );
        let insn = decode_at(&[0x01, 0x03], 0).unwrap();
        assert_eq!(insn.op1().kind, OperandKind::Register(3));
        assert_eq!(insn.length, 2);
    }

    #[test]
    fn test_jmp64_honors_relative() {
        let mut bytes = vec![0xC1, 0x10];
        bytes.extend_from_slice(&0x20u64.to_le_bytes());
        let insn = decode(&Image::new(&bytes, 0x100), 0x100, PointerSize::Eight).unwrap();
        assert_eq!(insn.length, 10);
        assert_eq!(insn.op1().kind, OperandKind::Near(0x100 + 10 + 0x20));
        assert_eq!(insn.aux, aux::BITS64);
    }

    #[test]
    fn test_jmp8_backwards() {
        // JMP8cc -2 words
        let insn = decode_at(&[0x82, 0xFE], 0x500).unwrap();
        assert_eq!(insn.op1().kind, OperandKind::Near(0x500 + 2 - 4));
        assert_eq!(insn.aux, aux::NCS);
    }

    #[test]
    fn test_reserved_opcode_fails() {
        assert_eq!(
            decode_at(&[0x27, 0x00, 0x00], 0).unwrap_err(),
            DecodeError::UnknownOpcode(0x27)
        );
        assert!(decode_at(&[0xFF, 0x00], 0).is_err());
    }

    #[test]
    fn test_movi_width_rules() {
        // MOVIww R1, 0x1234
        let insn = decode_at(&[0x77, 0x11, 0x34, 0x12], 0).unwrap();
        assert_eq!(insn.itype, Itype::Movi);
        assert_eq!(insn.op1().kind, OperandKind::Register(1));
        assert_eq!(insn.op1().width, Width::Word);
        assert_eq!(insn.op2().kind, OperandKind::Immediate(0x1234));
        assert_eq!(insn.aux, aux::W | aux::OP1);

        assert_eq!(decode_at(&[0x37, 0x01, 0x00], 0).unwrap_err(), DecodeError::ZeroWidth);
        assert_eq!(
            decode_at(&[0x77, 0x81, 0, 0], 0).unwrap_err(),
            DecodeError::ReservedBit("operand")
        );
        assert_eq!(
            decode_at(&[0x77, 0x41, 0, 0, 0, 0], 0).unwrap_err(),
            DecodeError::IndexedDirect
        );
    }

    #[test]
    fn test_movi_indexed() {
        // MOVIbw @R2(+1,+2), 5
        let index = pack(false, 1, 2, 1, 16) as u16;
        let mut bytes = vec![0x77, 0x4A];
        bytes.extend_from_slice(&index.to_le_bytes());
        bytes.extend_from_slice(&5u16.to_le_bytes());
        let insn = decode_at(&bytes, 0).unwrap();
        assert_eq!(insn.length, 6);
        assert_eq!(
            insn.op1().kind,
            OperandKind::Displacement { reg: 2, offset: 6 }
        );
        assert!(insn.op1().flags.contains(OpFlags::INDIRECT));
        assert_eq!(insn.op2().offb, 4);
    }

    #[test]
    fn test_movrel_target() {
        // MOVRELw R1, -4
        let insn = decode_at(&[0x79, 0x01, 0xFC, 0xFF], 0x100).unwrap();
        assert_eq!(insn.op2().kind, OperandKind::AbsoluteMemory(0x100));
    }

    #[test]
    fn test_mov_with_indexes() {
        let idx1 = pack(false, 0, 8, 0, 16) as u16;
        let idx2 = pack(true, 0, 4, 0, 16) as u16;
        // MOVww @R1(+8), @R2(-4)
        let mut bytes = vec![0xDE, 0xA9];
        bytes.extend_from_slice(&idx1.to_le_bytes());
        bytes.extend_from_slice(&idx2.to_le_bytes());
        let insn = decode_at(&bytes, 0).unwrap();
        assert_eq!(insn.itype, Itype::Movww);
        assert_eq!(insn.length, 6);
        assert_eq!(insn.op1().kind, OperandKind::Displacement { reg: 1, offset: 8 });
        assert_eq!(insn.op2().kind, OperandKind::Displacement { reg: 2, offset: -4 });
        assert_eq!(insn.op2().offb, 4);
    }

    #[test]
    fn test_mov_indexed_operand_takes_move_width() {
        let idx = pack(false, 0, 8, 0, 32) as u32;
        // MOVbd @R1(+8), R2
        let mut bytes = vec![0xA1, 0x29];
        bytes.extend_from_slice(&idx.to_le_bytes());
        let insn = decode_at(&bytes, 0).unwrap();
        assert_eq!(insn.itype, Itype::Movbd);
        assert_eq!(insn.length, 6);
        assert_eq!(insn.op1().kind, OperandKind::Displacement { reg: 1, offset: 8 });
        assert_eq!(insn.op1().width, Width::Byte);
        assert!(insn.op2().is_reg(2));
    }

    #[test]
    fn test_loadsp_storesp_registers() {
        let insn = decode_at(&[0x29, 0x10], 0).unwrap();
        assert_eq!(insn.op1().kind, OperandKind::Register(FLAGS));
        assert_eq!(insn.op2().kind, OperandKind::Register(1));
        let insn = decode_at(&[0x2A, 0x12], 0).unwrap();
        assert_eq!(insn.op1().kind, OperandKind::Register(2));
        assert_eq!(insn.op2().kind, OperandKind::Register(FLAGS + 1));
    }

    #[test]
    fn test_call_native_relative() {
        let insn = decode_at(&[0x83, 0x30, 0x00, 0x01, 0x00, 0x00], 0x1000).unwrap();
        assert_eq!(insn.op1().kind, OperandKind::Near(0x1000 + 6 + 0x100));
        assert!(insn.aux.contains(aux::NATIVE));
        assert!(insn.op1().flags.contains(OpFlags::NATIVE));
    }

    #[test]
    fn test_truncated_data() {
        assert_eq!(
            decode_at(&[0x81, 0x00, 0x10], 0).unwrap_err(),
            DecodeError::Truncated { at: 2 }
        );
    }

    #[test]
    fn test_cmpi_immediate_after_index() {
        // CMPI32weq @R1(+0), 7 with an index word
        let idx = pack(false, 0, 0, 0, 16) as u16;
        let mut bytes = vec![0x2D, 0x19];
        bytes.extend_from_slice(&idx.to_le_bytes());
        bytes.extend_from_slice(&7u16.to_le_bytes());
        let insn = decode_at(&bytes, 0).unwrap();
        assert_eq!(insn.length, 6);
        assert_eq!(insn.op2().kind, OperandKind::Immediate(7));
        assert_eq!(insn.aux, aux::BITS32 | aux::W);
    }
}
