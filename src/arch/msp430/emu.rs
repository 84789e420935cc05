//! MSP430 static analysis: edges, stack deltas and switch tables.

use crate::analysis::{
    AnalysisHost, CodeRef, DataRef, Emulation, FlowKind, SwitchDescriptor, XrefKind,
};
use crate::arch::{Context, Feature, Instruction, Processor};
use crate::bits::sign_extend;
use crate::cursor::Image;
use crate::operand::{OperandKind, Width};
use crate::Address;

use super::opcode::Itype::{self, *};
use super::{aux, Msp430, ADDRESS_MASK, PC, SP};

/// `mov.w x, PC` that escaped simplification.
fn is_movpc(insn: &Instruction<Itype>) -> bool {
    insn.itype == Mov && insn.op2().is_reg(PC) && insn.aux == aux::WORD
}

fn is_branch(insn: &Instruction<Itype>) -> bool {
    insn.itype == Br || is_movpc(insn)
}

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

    let flow = if insn.itype == Jmp || is_branch(insn) {
        FlowKind::Unconditional
    } else if feature.contains(Feature::STOP) {
        FlowKind::Stop
    } else if insn.itype.is_conditional_jump() {
        FlowKind::Conditional
    } else {
        FlowKind::Falls
    };

    let mut emulation = Emulation::new(flow);
    if flow.falls_through() {
        if ctx.config.trace_stack {
            trace_sp(insn, ctx);
        }
    } else {
        if ctx.config.detect_switches {
            emulation.switch = check_switch(insn, ctx);
        }
        if ctx.config.trace_stack {
            recalc_sp(insn, ctx);
        }
    }
    emulation
}

fn handle_operand(insn: &Instruction<Itype>, n: usize, read: bool, ctx: &mut Context<'_>) {
    let op = insn.operands[n];
    let at = insn.address;
    let access = if read { DataRef::Read } else { DataRef::Write };

    match op.kind {
        OperandKind::Immediate(value) => {
            let value = value & ADDRESS_MASK;
            let target = if insn.itype == Call {
                Some(CodeRef::Call)
            } else if is_branch(insn) {
                Some(CodeRef::Jump)
            } else {
                None
            };
            if let Some(kind) = target {
                ctx.add_code_ref(at, op.offb, value, kind);
                if !ctx.host.is_defined_arg(at, n) {
                    ctx.host.mark_offset(at, n);
                }
            }
            if ctx.host.is_offset(at, n) {
                ctx.add_data_ref(at, op.offb, value, DataRef::Offset);
            }
        }
        OperandKind::Displacement { reg, offset } => {
            if ctx.host.is_offset(at, n) {
                ctx.add_data_ref(at, op.offb, offset as u64 & ADDRESS_MASK, access);
            } else if reg == SP && ctx.config.create_frame_vars && !ctx.host.is_defined_arg(at, n)
            {
                if let Some(routine) = ctx.host.routine_at(at) {
                    let sp_offset = ctx.stack.delta_at(&routine, at) + offset;
                    ctx.host.add_frame_var(&routine, at, n, sp_offset);
                }
            }
        }
        OperandKind::AbsoluteMemory(addr) => {
            ctx.host.create_data(addr, op.width);
            ctx.add_data_ref(at, op.offb, addr, access);
        }
        OperandKind::SymbolicMemory(addr) => {
            ctx.add_data_ref(at, op.offb, addr, DataRef::Offset);
        }
        OperandKind::Near(addr) => {
            ctx.add_code_ref(at, op.offb, addr, CodeRef::Jump);
        }
        _ => {}
    }
}

/// Stack-pointer change made by `insn`, if it is one we can see.
fn sp_change(insn: &Instruction<Itype>) -> Option<i64> {
    let word = insn.aux == aux::WORD;
    match insn.itype {
        Add | Addc | Sub | Subc if word && insn.op2().is_reg(SP) => {
            let OperandKind::Immediate(value) = insn.op1().kind else {
                return None;
            };
            let delta = sign_extend(value, 16);
            Some(if matches!(insn.itype, Sub | Subc) {
                -delta
            } else {
                delta
            })
        }
        Inc | Incd | Dec | Decd if word && insn.op1().is_reg(SP) => Some(match insn.itype {
            Inc => 1,
            Incd => 2,
            Dec => -1,
            _ => -2,
        }),
        Push => Some(-2),
        Pop => Some(2),
        _ if insn.op1().is_autoinc(SP) => Some(2),
        _ => None,
    }
}

fn trace_sp(insn: &Instruction<Itype>, ctx: &mut Context<'_>) {
    let Some(delta) = sp_change(insn) else {
        return;
    };
    let Some(routine) = ctx.host.routine_at(insn.address) else {
        return;
    };
    let next = insn.end();
    let delta = ctx.host.fixed_delta(next).unwrap_or(delta);
    ctx.stack.add_point(&routine, next, delta);
}

/// The next instruction is not reached from this one; take its delta from
/// the jumps that reach it.
fn recalc_sp(insn: &Instruction<Itype>, ctx: &mut Context<'_>) {
    let next = insn.end();
    let Some(routine) = ctx.host.routine_at(insn.address) else {
        return;
    };
    if let Some(pinned) = ctx.host.fixed_delta(next) {
        ctx.stack.add_point(&routine, next, pinned);
        return;
    }
    let sources: Vec<Address> = ctx
        .host
        .code_refs_to(next)
        .into_iter()
        .filter(|x| x.kind == XrefKind::Code(CodeRef::Jump))
        .map(|x| x.from)
        .collect();
    ctx.stack.recalc(&routine, next, &sources);
}

fn check_switch(insn: &Instruction<Itype>, ctx: &mut Context<'_>) -> Option<SwitchDescriptor> {
    let at = insn.address;
    if ctx.host.has_switch(at) {
        return None;
    }
    let switch = match_switch(insn, &ctx.image, &*ctx.host)?;
    let offb = insn.op1().offb;

    ctx.host.mark_offset(at, 0);
    ctx.host.register_switch(at, switch);
    ctx.add_data_ref(at, offb, switch.jump_table, DataRef::Offset);
    for case in 0..switch.case_count {
        let slot = switch.jump_table + case * 2;
        let Some(target) = ctx.image.read_u16(slot) else {
            log::trace!("switch table at 0x{:x} leaves the image", switch.jump_table);
            break;
        };
        ctx.host.create_data(slot, Width::Word);
        ctx.add_code_ref(at, offb, u64::from(target), CodeRef::Jump);
    }
    Some(switch)
}

/// Recognize the compiler's jump-table dispatch ending in `insn`:
///
/// ```text
/// cmp.w   #n, Rx
/// jnc     default
/// mov.w   Rx, Ry      ; optional
/// add.w   Ry, Ry      ; or rla.w Ry
/// br      table(Ry)
/// ```
///
/// Earlier instructions are re-decoded from the image; `insn` is not
/// touched.
pub fn match_switch(
    insn: &Instruction<Itype>,
    image: &Image<'_>,
    host: &dyn AnalysisHost,
) -> Option<SwitchDescriptor> {
    if !is_branch(insn) {
        return None;
    }
    let OperandKind::Displacement { reg: ry, offset } = insn.op1().kind else {
        return None;
    };
    let previous = |insn: &Instruction<Itype>| -> Option<Instruction<Itype>> {
        let head = host.prev_head(insn.address)?;
        Msp430.decode(image, head).ok()
    };

    let shift = previous(insn)?;
    let doubled = shift.aux == aux::WORD
        && match shift.itype {
            Add => shift.op1().is_reg(ry) && shift.op2().is_reg(ry),
            Rla => shift.op1().is_reg(ry),
            _ => false,
        };
    if !doubled {
        log::trace!("0x{:x}: no index scaling before table branch", insn.address);
        return None;
    }

    let mut guard = previous(&shift)?;
    let mut rx = ry;
    if guard.itype == Mov && guard.aux == aux::WORD && guard.op2().is_reg(ry) {
        if let OperandKind::Register(src) = guard.op1().kind {
            rx = src;
            guard = previous(&guard)?;
        }
    }

    let (Jnc, OperandKind::Near(default_target)) = (guard.itype, guard.op1().kind) else {
        log::trace!("0x{:x}: no bounds jump before table branch", insn.address);
        return None;
    };

    let cmp = previous(&guard)?;
    if cmp.itype != Cmp || cmp.aux != aux::WORD || !cmp.op2().is_reg(rx) {
        log::trace!("0x{:x}: no bounds check on R{}", insn.address, rx);
        return None;
    }
    let OperandKind::Immediate(case_count) = cmp.op1().kind else {
        return None;
    };

    Some(SwitchDescriptor {
        jump_table: offset as u64 & ADDRESS_MASK,
        register: rx,
        case_count,
        default_target,
        low_case: 0,
        start: cmp.address,
        element_width: Width::Word,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Database, Routine, RoutineDb, StackTracker, SymbolResolver, Xref};
    use crate::Config;

    fn bytes(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Decode and analyze `count` instructions from `base` in order, the
    /// way the pipeline does.
    fn sweep(
        code: &[u16],
        base: Address,
        count: usize,
        db: &mut Database,
        stack: &mut StackTracker,
    ) -> Vec<(Instruction<Itype>, Emulation, Vec<Xref>)> {
        let data = bytes(code);
        let image = Image::new(&data, base);
        let config = Config::default();
        let mut out = Vec::new();
        let mut at = base;
        for _ in 0..count {
            let insn = Msp430.decode(&image, at).unwrap();
            db.add_head(at, insn.length);
            let mut ctx = Context::new(image, &mut *db, &mut *stack, &config);
            let emu = Msp430.emulate(&insn, &mut ctx);
            if emu.flow.falls_through() {
                ctx.add_code_ref(at, 0, insn.end(), CodeRef::Flow);
            }
            out.push((insn, emu, ctx.take_emitted()));
            at = insn.end();
        }
        out
    }

    #[test]
    fn test_call_marks_target() {
        let mut db = Database::new();
        let mut stack = StackTracker::new();
        let out = sweep(&[0x12B0, 0xC100], 0xC000, 1, &mut db, &mut stack);
        let (_, emu, xrefs) = &out[0];
        assert_eq!(emu.flow, FlowKind::Falls);
        assert_eq!(
            xrefs[..2],
            [
                Xref::code(0xC000, 2, 0xC100, CodeRef::Call),
                Xref::data(0xC000, 2, 0xC100, DataRef::Offset),
            ]
        );
        assert!(db.is_offset(0xC000, 0));
        assert!(db.routine_at(0xC100).is_some());
    }

    #[test]
    fn test_flow_kinds() {
        let mut db = Database::new();
        let mut stack = StackTracker::new();
        // jnz +1, jmp +0, ret
        let out = sweep(&[0x2001, 0x3C00, 0x4130], 0, 3, &mut db, &mut stack);
        assert_eq!(out[0].1.flow, FlowKind::Conditional);
        assert_eq!(out[1].1.flow, FlowKind::Unconditional);
        assert_eq!(out[2].1.flow, FlowKind::Stop);
        assert_eq!(
            out[2].2,
            Vec::<Xref>::new(),
            "ret emits no edges and no fallthrough"
        );
    }

    #[test]
    fn test_push_pop_balance() {
        let mut db = Database::new();
        db.add_routine(0x100, None);
        let mut stack = StackTracker::new();
        sweep(&[0x1205, 0x4135], 0x100, 2, &mut db, &mut stack);
        let routine = db.routine_at(0x100).unwrap();
        assert_eq!(stack.delta_at(&routine, 0x102), -2);
        assert_eq!(stack.delta_at(&routine, 0x104), 0);
    }

    #[test]
    fn test_pinned_delta_is_kept() {
        let mut db = Database::new();
        db.add_routine(0x100, None);
        // the user knows the push also reserved a word
        db.pin_delta(0x102, -4);
        let mut stack = StackTracker::new();
        sweep(&[0x1205, 0x4135], 0x100, 2, &mut db, &mut stack);
        let routine = db.routine_at(0x100).unwrap();
        assert_eq!(stack.point(&routine, 0x102), Some(-4));
        assert_eq!(stack.delta_at(&routine, 0x104), -2);
    }

    #[test]
    fn test_pinned_delta_after_return() {
        let mut db = Database::new();
        db.add_routine(0, None);
        db.pin_delta(4, -6);
        let mut stack = StackTracker::new();
        // push R5 ; ret ; <4>
        sweep(&[0x1205, 0x4130], 0, 2, &mut db, &mut stack);
        let routine = db.routine_at(0).unwrap();
        assert_eq!(stack.point(&routine, 4), Some(-6));
        assert_eq!(stack.delta_at(&routine, 4), -8);
    }

    #[test]
    fn test_frame_adjustment() {
        let mut db = Database::new();
        db.add_routine(0, None);
        let mut stack = StackTracker::new();
        // sub #6, SP ; add #6, SP
        sweep(&[0x8031, 0x0006, 0x5031, 0x0006], 0, 2, &mut db, &mut stack);
        let routine = db.routine_at(0).unwrap();
        assert_eq!(stack.delta_at(&routine, 4), -6);
        assert_eq!(stack.delta_at(&routine, 8), 0);
    }

    #[test]
    fn test_decd_sp_is_traced() {
        let mut db = Database::new();
        db.add_routine(0, None);
        let mut stack = StackTracker::new();
        // sub #2, SP simplifies to decd SP
        let out = sweep(&[0x8321], 0, 1, &mut db, &mut stack);
        assert_eq!(out[0].0.itype, Decd);
        assert_eq!(stack.delta_at(&db.routine_at(0).unwrap(), 2), -2);
    }

    #[test]
    fn test_recalc_after_return() {
        let mut db = Database::new();
        db.add_routine(0, None);
        let mut stack = StackTracker::new();
        // push R5 ; jnz 8 ; pop R5 ; ret ; <8>
        sweep(&[0x1205, 0x2002, 0x4135, 0x4130], 0, 4, &mut db, &mut stack);
        let routine = Routine {
            start: 0,
            end: None,
        };
        assert_eq!(stack.delta_at(&routine, 6), 0);
        assert_eq!(stack.delta_at(&routine, 8), -2);
    }

    #[test]
    fn test_stack_argument() {
        let mut db = Database::new();
        db.add_routine(0, None);
        let mut stack = StackTracker::new();
        // push R5 ; mov 4(SP), R6
        sweep(&[0x1205, 0x4116, 0x0004], 0, 2, &mut db, &mut stack);
        assert_eq!(db.frame_var(2, 0).as_deref(), Some("arg_0"));
    }

    #[test]
    fn test_negative_stack_index_is_local() {
        let mut db = Database::new();
        db.add_routine(0, None);
        let mut stack = StackTracker::new();
        // mov -2(SP), R5
        sweep(&[0x4115, 0xFFFE], 0, 1, &mut db, &mut stack);
        let routine = db.routine_at(0).unwrap();
        assert_eq!(db.frame_var(0, 0).as_deref(), Some("var_2"));
        assert_eq!(db.frame_vars(&routine), vec![(-2, "var_2".to_string())]);
    }

    #[test]
    fn test_absolute_creates_data() {
        let mut db = Database::new();
        let mut stack = StackTracker::new();
        // mov &0x0200, R5 ; mov R5, &0x0202
        let out = sweep(&[0x4215, 0x0200, 0x4582, 0x0202], 0, 2, &mut db, &mut stack);
        assert_eq!(db.data_at(0x200), Some(Width::Word));
        assert_eq!(db.data_at(0x202), Some(Width::Word));
        assert_eq!(out[0].2[0], Xref::data(0, 2, 0x200, DataRef::Read));
        assert_eq!(out[1].2[0], Xref::data(4, 2, 0x202, DataRef::Write));
    }

    const DISPATCH: [u16; 10] = [
        0x922F, // cmp #4, R15
        0x2C0E, // jnc 0xC020
        0x4F0E, // mov R15, R14
        0x5E0E, // add R14, R14
        0x4E10, 0xC00C, // br 0xC00C(R14)
        0xC014, 0xC016, 0xC018, 0xC01A,
    ];

    #[test]
    fn test_switch_idiom() {
        let mut db = Database::new();
        let mut stack = StackTracker::new();
        let out = sweep(&DISPATCH, 0xC000, 5, &mut db, &mut stack);
        let (br, emu, xrefs) = &out[4];
        assert_eq!(br.itype, Br);

        let expected = SwitchDescriptor {
            jump_table: 0xC00C,
            register: 15,
            case_count: 4,
            default_target: 0xC020,
            low_case: 0,
            start: 0xC000,
            element_width: Width::Word,
        };
        assert_eq!(emu.switch, Some(expected));
        assert_eq!(db.switch_at(0xC008), Some(&expected));
        assert!(db.is_offset(0xC008, 0));
        let targets: Vec<Address> = xrefs
            .iter()
            .filter(|x| x.kind == XrefKind::Code(CodeRef::Jump))
            .map(|x| x.to)
            .collect();
        assert_eq!(targets, vec![0xC014, 0xC016, 0xC018, 0xC01A]);
        assert_eq!(db.data_at(0xC00E), Some(Width::Word));
    }

    #[test]
    fn test_switch_wrong_register() {
        let mut code = DISPATCH;
        code[0] = 0x922D; // cmp #4, R13
        let mut db = Database::new();
        let mut stack = StackTracker::new();
        let out = sweep(&code, 0xC000, 5, &mut db, &mut stack);
        assert_eq!(out[4].1.switch, None);
        assert_eq!(db.switches().count(), 0);
    }

    #[test]
    fn test_match_switch_leaves_record_alone() {
        let mut db = Database::new();
        let mut stack = StackTracker::new();
        let data = bytes(&DISPATCH);
        let image = Image::new(&data, 0xC000);
        // populate instruction heads without switch detection
        let out = sweep(&DISPATCH[..4], 0xC000, 4, &mut db, &mut stack);
        assert_eq!(out.len(), 4);
        db.add_head(0xC008, 4);

        let br = Msp430.decode(&image, 0xC008).unwrap();
        let before = br;
        let switch = match_switch(&br, &image, &db).unwrap();
        assert_eq!(br, before);
        assert_eq!(switch.register, 15);
        // without the instruction heads the lookback finds nothing
        assert_eq!(match_switch(&br, &image, &Database::new()), None);
    }
}
