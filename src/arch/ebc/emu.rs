//! EBC cross-reference generation.

use crate::analysis::{CodeRef, DataRef, Emulation, FlowKind};
use crate::arch::{Context, Feature, Instruction};
use crate::operand::OperandKind;

use super::aux;
use super::opcode::Itype;

pub(super) fn emulate(insn: &Instruction<Itype>, ctx: &mut Context<'_>) -> Emulation {
    let feature = insn.itype.feature();
    for n in 0..insn.operands.len() {
        if feature.uses(n) {
            handle_operand(insn, n, true, ctx);
        }
        if feature.changes(n) {
            handle_operand(insn, n, false, ctx);
        }
    }
    Emulation::new(flow(insn, feature))
}

fn flow(insn: &Instruction<Itype>, feature: Feature) -> FlowKind {
    if feature.contains(Feature::STOP) {
        return FlowKind::Stop;
    }
    match insn.itype {
        Itype::Jmp | Itype::Jmp8 if insn.aux.intersects(aux::CS | aux::NCS) => {
            FlowKind::Conditional
        }
        Itype::Jmp | Itype::Jmp8 => FlowKind::Unconditional,
        _ => FlowKind::Falls,
    }
}

fn handle_operand(insn: &Instruction<Itype>, n: usize, read: bool, ctx: &mut Context<'_>) {
    let op = insn.operands[n];
    let at = insn.address;
    let access = if read { DataRef::Read } else { DataRef::Write };
    let is_offset = ctx.host.is_offset(at, n);

    match op.kind {
        OperandKind::Immediate(value) if is_offset => {
            ctx.add_data_ref(at, op.offb, value, DataRef::Offset);
        }
        OperandKind::Displacement { offset, .. } if is_offset => {
            ctx.add_data_ref(at, op.offb, offset as u64, access);
        }
        OperandKind::AbsoluteMemory(addr) | OperandKind::SymbolicMemory(addr) => {
            ctx.add_data_ref(at, op.offb, addr, access);
        }
        OperandKind::Near(addr) => {
            let kind = if insn.itype == Itype::Call {
                CodeRef::Call
            } else {
                CodeRef::Jump
            };
            ctx.add_code_ref(at, op.offb, addr, kind);
        }
        _ => {}
    }
}
