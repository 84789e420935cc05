//! Static analysis results and the host they are reported to.

mod database;
mod host;
mod stack;
mod xref;

pub use self::database::Database;
pub use self::host::{AnalysisHost, Routine, RoutineDb, SymbolResolver, XrefSink};
pub use self::stack::StackTracker;
pub use self::xref::{CodeRef, DataRef, Xref, XrefKind};

use serde::{Deserialize, Serialize};

use crate::operand::Width;
use crate::Address;

/// How execution leaves an instruction.
///
/// Exactly one applies to every instruction; only `Falls` and
/// `Conditional` get a fallthrough edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    /// Continues at the next instruction.
    #[default]
    Falls,
    /// Branches to its target or continues at the next instruction.
    Conditional,
    /// Always branches away.
    Unconditional,
    /// Returns or otherwise stops the flow.
    Stop,
}

impl FlowKind {
    pub fn falls_through(self) -> bool {
        matches!(self, FlowKind::Falls | FlowKind::Conditional)
    }
}

/// A recognized jump-table dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwitchDescriptor {
    /// Base of the table of case targets.
    pub jump_table: Address,
    /// Register holding the switch expression.
    pub register: u8,
    pub case_count: u64,
    /// Target taken when the expression is out of range.
    pub default_target: Address,
    pub low_case: u64,
    /// Address of the bounds check that starts the idiom.
    pub start: Address,
    pub element_width: Width,
}

/// Analyzer outcome for one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Emulation {
    pub flow: FlowKind,
    pub switch: Option<SwitchDescriptor>,
}

impl Emulation {
    pub fn new(flow: FlowKind) -> Self {
        Self { flow, switch: None }
    }
}
