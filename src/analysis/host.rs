//! The boundary between the analyzer and whatever stores its results.
//!
//! [`super::Database`] is the in-memory implementation used by the sweep
//! strategies and the CLI.

use crate::operand::Width;
use crate::Address;

use super::{SwitchDescriptor, Xref};

/// A routine known to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Routine {
    pub start: Address,
    /// Exclusive end, if the routine has been bounded.
    pub end: Option<Address>,
}

/// Name lookup used while rendering.
pub trait SymbolResolver {
    /// Display name of `addr`, if it has one.
    fn name_of(&self, addr: Address) -> Option<String>;

    /// Has operand `n` of the instruction at `at` been marked as an address?
    fn is_offset(&self, at: Address, n: usize) -> bool;

    /// Stack variable bound to operand `n` of the instruction at `at`.
    fn frame_var(&self, at: Address, n: usize) -> Option<String>;
}

/// Receives edges produced by the analyzer.
pub trait XrefSink {
    fn add_xref(&mut self, xref: Xref);
}

/// Routine and stack-frame queries.
pub trait RoutineDb {
    fn routine_at(&self, addr: Address) -> Option<Routine>;

    /// Best-effort creation of a stack variable at `sp_offset` bytes from the
    /// stack pointer on routine entry. Returns whether one was bound.
    fn add_frame_var(&mut self, routine: &Routine, at: Address, n: usize, sp_offset: i64) -> bool;

    /// Stack change the user pinned at `addr`, if any.
    fn fixed_delta(&self, addr: Address) -> Option<i64>;

    /// Has the user pinned the stack delta at `addr`?
    fn is_fixed_delta(&self, addr: Address) -> bool {
        self.fixed_delta(addr).is_some()
    }
}

/// Everything the analyzer needs from its host.
pub trait AnalysisHost: SymbolResolver + XrefSink + RoutineDb {
    /// View of the host as a name resolver for rendering.
    fn resolver(&self) -> &dyn SymbolResolver;

    /// Has the user chosen a representation for operand `n` at `at`?
    fn is_defined_arg(&self, at: Address, n: usize) -> bool;

    /// Display operand `n` at `at` as an address.
    fn mark_offset(&mut self, at: Address, n: usize);

    /// Create a data item of `width` at `addr`.
    fn create_data(&mut self, addr: Address, width: Width);

    /// Start of the instruction that ends exactly at `addr`.
    fn prev_head(&self, addr: Address) -> Option<Address>;

    /// Record an instruction of `len` bytes at `addr`.
    fn add_head(&mut self, addr: Address, len: u8);

    /// Code edges that arrive at `addr`.
    fn code_refs_to(&self, addr: Address) -> Vec<Xref>;

    fn has_switch(&self, at: Address) -> bool;

    fn register_switch(&mut self, at: Address, switch: SwitchDescriptor);

    /// Queue the instruction at `at` for naming: it refers to an address
    /// without a name.
    fn mark_unnamed(&mut self, at: Address);
}
