//! In-memory analysis host.

use std::collections::{BTreeMap, BTreeSet};

use crate::operand::Width;
use crate::Address;

use super::{
    AnalysisHost, CodeRef, Routine, RoutineDb, SwitchDescriptor, SymbolResolver, Xref, XrefKind,
    XrefSink,
};

/// Address-keyed store of everything the analyzer reports.
///
/// Writes to the same key replace the previous value.
#[derive(Debug, Clone, Default)]
pub struct Database {
    names: BTreeMap<Address, String>,
    xrefs: BTreeSet<Xref>,
    refs_to: BTreeMap<Address, BTreeSet<Xref>>,
    offsets: BTreeSet<(Address, usize)>,
    defined_args: BTreeSet<(Address, usize)>,
    routines: BTreeMap<Address, Option<Address>>,
    frame_vars: BTreeMap<Address, BTreeMap<i64, String>>,
    operand_vars: BTreeMap<(Address, usize), String>,
    fixed_deltas: BTreeMap<Address, i64>,
    data: BTreeMap<Address, Width>,
    switches: BTreeMap<Address, SwitchDescriptor>,
    heads: BTreeMap<Address, u8>,
    unnamed: BTreeSet<Address>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, addr: Address, name: impl Into<String>) {
        self.names.insert(addr, name.into());
    }

    /// Declare a routine. `end` is exclusive.
    pub fn add_routine(&mut self, start: Address, end: Option<Address>) {
        self.routines.insert(start, end);
    }

    pub fn routines(&self) -> Vec<Routine> {
        self.routines
            .iter()
            .map(|(&start, &end)| Routine { start, end })
            .collect()
    }

    /// Pin the stack change taking effect at `addr` to `delta`, as a user
    /// would. Tracking records this value instead of the one it derives.
    pub fn pin_delta(&mut self, addr: Address, delta: i64) {
        self.fixed_deltas.insert(addr, delta);
    }

    /// Mark operand `n` at `at` as having a user-chosen representation.
    pub fn define_operand(&mut self, at: Address, n: usize) {
        self.defined_args.insert((at, n));
    }

    /// Mark operand `n` at `at` as an address, as a user would.
    pub fn set_offset(&mut self, at: Address, n: usize) {
        self.offsets.insert((at, n));
        self.defined_args.insert((at, n));
    }

    pub fn xrefs(&self) -> impl Iterator<Item = &Xref> {
        self.xrefs.iter()
    }

    pub fn xrefs_from(&self, from: Address) -> Vec<Xref> {
        self.xrefs.iter().filter(|x| x.from == from).copied().collect()
    }

    pub fn xrefs_to(&self, to: Address) -> Vec<Xref> {
        self.refs_to
            .get(&to)
            .map(|refs| refs.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn data_at(&self, addr: Address) -> Option<Width> {
        self.data.get(&addr).copied()
    }

    pub fn switch_at(&self, at: Address) -> Option<&SwitchDescriptor> {
        self.switches.get(&at)
    }

    pub fn switches(&self) -> impl Iterator<Item = (&Address, &SwitchDescriptor)> {
        self.switches.iter()
    }

    pub fn head_len(&self, addr: Address) -> Option<u8> {
        self.heads.get(&addr).copied()
    }

    /// Stack variables of a routine by their offset from the entry stack
    /// pointer.
    pub fn frame_vars(&self, routine: &Routine) -> Vec<(i64, String)> {
        self.frame_vars
            .get(&routine.start)
            .map(|vars| vars.iter().map(|(o, n)| (*o, n.clone())).collect())
            .unwrap_or_default()
    }

    /// Instructions that refer to an address without a name.
    pub fn unnamed(&self) -> Vec<Address> {
        self.unnamed.iter().copied().collect()
    }
}

impl SymbolResolver for Database {
    fn name_of(&self, addr: Address) -> Option<String> {
        self.names.get(&addr).cloned()
    }

    fn is_offset(&self, at: Address, n: usize) -> bool {
        self.offsets.contains(&(at, n))
    }

    fn frame_var(&self, at: Address, n: usize) -> Option<String> {
        self.operand_vars.get(&(at, n)).cloned()
    }
}

impl XrefSink for Database {
    fn add_xref(&mut self, xref: Xref) {
        if xref.kind == XrefKind::Code(CodeRef::Call) {
            self.routines.entry(xref.to).or_insert(None);
        }
        self.xrefs.insert(xref);
        self.refs_to.entry(xref.to).or_default().insert(xref);
    }
}

impl RoutineDb for Database {
    fn routine_at(&self, addr: Address) -> Option<Routine> {
        let (&start, &end) = self.routines.range(..=addr).next_back()?;
        match end {
            Some(end) if addr >= end => None,
            _ => Some(Routine { start, end }),
        }
    }

    fn add_frame_var(&mut self, routine: &Routine, at: Address, n: usize, sp_offset: i64) -> bool {
        // return address slot
        if (0..2).contains(&sp_offset) {
            return false;
        }
        let name = if sp_offset < 0 {
            format!("var_{:X}", -sp_offset)
        } else {
            format!("arg_{:X}", sp_offset - 2)
        };
        self.frame_vars
            .entry(routine.start)
            .or_default()
            .insert(sp_offset, name.clone());
        self.operand_vars.insert((at, n), name);
        true
    }

    fn fixed_delta(&self, addr: Address) -> Option<i64> {
        self.fixed_deltas.get(&addr).copied()
    }
}

impl AnalysisHost for Database {
    fn resolver(&self) -> &dyn SymbolResolver {
        self
    }

    fn is_defined_arg(&self, at: Address, n: usize) -> bool {
        self.defined_args.contains(&(at, n))
    }

    fn mark_offset(&mut self, at: Address, n: usize) {
        self.offsets.insert((at, n));
    }

    fn create_data(&mut self, addr: Address, width: Width) {
        self.data.entry(addr).or_insert(width);
    }

    fn prev_head(&self, addr: Address) -> Option<Address> {
        let (&head, &len) = self.heads.range(..addr).next_back()?;
        (head + len as Address == addr).then_some(head)
    }

    fn add_head(&mut self, addr: Address, len: u8) {
        self.heads.insert(addr, len);
    }

    fn code_refs_to(&self, addr: Address) -> Vec<Xref> {
        self.refs_to
            .get(&addr)
            .map(|refs| refs.iter().filter(|x| x.is_code()).copied().collect())
            .unwrap_or_default()
    }

    fn has_switch(&self, at: Address) -> bool {
        self.switches.contains_key(&at)
    }

    fn register_switch(&mut self, at: Address, switch: SwitchDescriptor) {
        self.switches.insert(at, switch);
    }

    fn mark_unnamed(&mut self, at: Address) {
        self.unnamed.insert(at);
    }
}
