//! Emulated mnemonics.
//!
//! MSP430 has no dedicated encodings for `clr`, `ret`, `inc` and friends;
//! assemblers emit a core instruction with a constant-generator operand.
//! Each core mnemonic has an ordered list of rules and the first match
//! rewrites the instruction.

use crate::arch::{Aux, Instruction};
use crate::operand::Operand;

use super::aux;
use super::opcode::Itype::{self, *};
use super::{PC, R3, SP, SR};

/// What happens to the operands of a matched instruction. The second slot
/// is always emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rewrite {
    /// No operands remain.
    Clear,
    /// The destination becomes the only operand.
    PromoteSecond,
    /// The source stays as the only operand.
    KeepFirst,
}

type Predicate = fn(&Operand, &Operand, Aux) -> bool;

struct Rule {
    matches: Predicate,
    itype: Itype,
    rewrite: Rewrite,
}

const fn rule(matches: Predicate, itype: Itype, rewrite: Rewrite) -> Rule {
    Rule {
        matches,
        itype,
        rewrite,
    }
}

fn src_is<const V: u64>(src: &Operand, _: &Operand, _: Aux) -> bool {
    src.is_imm(V)
}

fn status_bit<const V: u64>(src: &Operand, dst: &Operand, _: Aux) -> bool {
    src.is_imm(V) && dst.is_reg(SR)
}

fn same_operands(src: &Operand, dst: &Operand, _: Aux) -> bool {
    src.same_as(dst)
}

fn zero_to_cg(src: &Operand, dst: &Operand, _: Aux) -> bool {
    src.is_imm(0) && dst.is_reg(R3)
}

fn pop_to_pc(src: &Operand, dst: &Operand, _: Aux) -> bool {
    src.is_autoinc(SP) && dst.is_reg(PC)
}

fn pop_any(src: &Operand, _: &Operand, _: Aux) -> bool {
    src.is_autoinc(SP)
}

fn move_to_pc(_: &Operand, dst: &Operand, size: Aux) -> bool {
    dst.is_reg(PC) && size == aux::WORD
}

use Rewrite::*;

static ADDC: [Rule; 2] = [
    rule(src_is::<0>, Adc, PromoteSecond),
    rule(same_operands, Rlc, KeepFirst),
];

static MOV: [Rule; 5] = [
    rule(zero_to_cg, Nop, Clear),
    rule(src_is::<0>, Clr, PromoteSecond),
    rule(pop_to_pc, Ret, Clear),
    rule(pop_any, Pop, PromoteSecond),
    rule(move_to_pc, Br, KeepFirst),
];

static BIC: [Rule; 4] = [
    rule(status_bit::<1>, Clrc, Clear),
    rule(status_bit::<2>, Clrz, Clear),
    rule(status_bit::<4>, Clrn, Clear),
    rule(status_bit::<8>, Dint, Clear),
];

static BIS: [Rule; 4] = [
    rule(status_bit::<1>, Setc, Clear),
    rule(status_bit::<2>, Setz, Clear),
    rule(status_bit::<4>, Setn, Clear),
    rule(status_bit::<8>, Eint, Clear),
];

static DADD: [Rule; 1] = [rule(src_is::<0>, Dadc, PromoteSecond)];

static SUB: [Rule; 2] = [
    rule(src_is::<1>, Dec, PromoteSecond),
    rule(src_is::<2>, Decd, PromoteSecond),
];

static SUBC: [Rule; 1] = [rule(src_is::<0>, Sbc, PromoteSecond)];

static ADD: [Rule; 3] = [
    rule(src_is::<1>, Inc, PromoteSecond),
    rule(src_is::<2>, Incd, PromoteSecond),
    rule(same_operands, Rla, KeepFirst),
];

static XOR: [Rule; 1] = [rule(src_is::<0xFFFF>, Inv, PromoteSecond)];

static CMP: [Rule; 1] = [rule(src_is::<0>, Tst, PromoteSecond)];

fn rules(itype: Itype) -> &'static [Rule] {
    match itype {
        Addc => &ADDC,
        Mov => &MOV,
        Bic => &BIC,
        Bis => &BIS,
        Dadd => &DADD,
        Sub => &SUB,
        Subc => &SUBC,
        Add => &ADD,
        Xor => &XOR,
        Cmp => &CMP,
        _ => &[],
    }
}

/// Mnemonics printed without a `.b`/`.w` suffix.
fn suffixless(itype: Itype) -> bool {
    matches!(
        itype,
        Ret | Br | Clrc | Clrn | Clrz | Dint | Eint | Nop | Pop | Setc | Setn | Setz | Tst
    )
}

/// Rewrite `insn` into its emulated form, if one applies.
pub(super) fn simplify(mut insn: Instruction<Itype>) -> Instruction<Itype> {
    let [src, dst] = insn.operands;
    let Some(rule) = rules(insn.itype)
        .iter()
        .find(|rule| (rule.matches)(&src, &dst, insn.aux))
    else {
        return insn;
    };

    insn.itype = rule.itype;
    insn.operands = match rule.rewrite {
        Clear => [Operand::VOID; 2],
        PromoteSecond => [dst, Operand::VOID],
        KeepFirst => [src, Operand::VOID],
    };
    if suffixless(insn.itype) {
        insn.aux = aux::NOSUF;
    }
    insn
}
