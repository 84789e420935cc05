//! Recursive descent disassembly strategy

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::cursor::Image;
use crate::pipeline::Session;
use crate::{Address, BasicBlock, Decoder, Disassembly, DisassemblyError};

/// Recursive-descent disassembly into a Control Flow Graph (CFG).
///
/// Starts from every routine the session knows inside the image, or from
/// the image base when there are none, and follows the jump and call
/// edges the analyzer reports. Switch tables recognized on the way add
/// their case targets as jump edges.
///
/// # Arguments
/// * `image` - The loaded bytes to disassemble
/// * `decoder` - The decoder to use for disassembly
/// * `session` - Supplies the starting routines and receives the analysis
///
/// # Returns
/// A CFG representation of the disassembled code
pub fn run(image: &Image<'_>, decoder: &dyn Decoder, session: &mut Session) -> Result<Disassembly, DisassemblyError> {
    let mut roots: Vec<Address> = session
        .db
        .routines()
        .iter()
        .map(|r| r.start)
        .filter(|&start| image.contains(start))
        .collect();
    if roots.is_empty() {
        roots.push(image.base());
    }
    log::debug!(
        "Starting recursive descent disassembly of {} bytes from {} roots",
        image.len(),
        roots.len()
    );

    let blocks = recursive_disassemble(image, decoder, session, &roots);

    log::debug!("Recursive descent complete: {} basic blocks", blocks.len());
    Ok(Disassembly::Cfg(blocks))
}

/// Run recursive disassembly from a specific entry point
pub fn run_from(
    image: &Image<'_>,
    decoder: &dyn Decoder,
    session: &mut Session,
    entry_point: Address,
) -> Result<Disassembly, DisassemblyError> {
    log::debug!("Starting recursive descent disassembly from 0x{:x}", entry_point);

    let blocks = recursive_disassemble(image, decoder, session, &[entry_point]);

    log::debug!("Recursive descent complete: {} basic blocks", blocks.len());
    Ok(Disassembly::Cfg(blocks))
}

/// Core recursive disassembly algorithm
fn recursive_disassemble(
    image: &Image<'_>,
    decoder: &dyn Decoder,
    session: &mut Session,
    roots: &[Address],
) -> Vec<BasicBlock> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<Address> = roots.iter().copied().collect();
    // every address known to start a block, so blocks split at merge points
    let mut leaders: BTreeSet<Address> = roots.iter().copied().collect();
    let mut blocks = Vec::new();

    while let Some(addr) = queue.pop_front() {
        if !image.contains(addr) || !seen.insert(addr) {
            continue;
        }

        let mut block = BasicBlock::new(addr);
        let mut at = addr;
        let mut ends_in_flow = false;
        while let Some(insn) = decoder.analyze(image, at, &mut session.db, &mut session.stack) {
            let targets = insn.branch_targets();
            for target in targets.iter().chain(insn.call_targets().iter()) {
                if leaders.insert(*target) {
                    queue.push_back(*target);
                }
            }

            at = insn.end();
            let falls = insn.flow.falls_through();
            let stop = insn.is_branch();
            block.add_instruction(insn);

            if stop {
                let mut succs = targets;
                if falls {
                    succs.push(at);
                    if leaders.insert(at) {
                        queue.push_back(at);
                    }
                }
                block.set_successors(succs);
                break;
            }
            if leaders.contains(&at) {
                ends_in_flow = true;
                break;
            }
        }
        if ends_in_flow {
            block.set_successors(vec![at]);
        }

        // Only keep blocks with at least one instruction
        if !block.insns.is_empty() {
            blocks.push(block);
        }
    }

    blocks.sort_by_key(|b| b.start);
    blocks
}
