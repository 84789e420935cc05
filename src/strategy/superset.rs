//! Superset disassembly strategy
//!
//! Decodes an instruction at every offset of the image. Offsets are
//! independent of each other, so the work is spread over rayon's pool in
//! batches; nothing is reported to the session.

use std::time::Instant;

use rayon::prelude::*;

use crate::cursor::Image;
use crate::pipeline::Session;
use crate::{Address, Decoder, Disassembly, DisassemblyError, Insn};

/// Offsets per parallel batch
const BATCH_SIZE: usize = 4096;

/// Superset disassembly
///
/// # Arguments
/// * `image` - The loaded bytes to disassemble
/// * `decoder` - The decoder to use for disassembly
/// * `session` - Supplies names for rendering; left unchanged
///
/// # Returns
/// A stream of every instruction that decodes, sorted by address
pub fn run(image: &Image<'_>, decoder: &dyn Decoder, session: &mut Session) -> Result<Disassembly, DisassemblyError> {
    log::debug!("Starting superset disassembly on {} bytes", image.len());
    let start_time = Instant::now();
    let names = &session.db;

    let mut instructions = Vec::with_capacity(image.len() / 4);
    let batch_count = image.len().div_ceil(BATCH_SIZE);
    for batch_idx in 0..batch_count {
        let start_offset = batch_idx * BATCH_SIZE;
        let end_offset = std::cmp::min(start_offset + BATCH_SIZE, image.len());

        let batch: Vec<Insn> = (start_offset..end_offset)
            .into_par_iter()
            .filter_map(|offset| decoder.decode(image, image.base() + offset as Address, names))
            .collect();
        log::trace!(
            "Batch {}/{}: {} instructions",
            batch_idx + 1,
            batch_count,
            batch.len()
        );
        instructions.extend(batch);
    }

    // Sort by address for deterministic output
    instructions.sort_by_key(|insn| insn.addr);

    log::debug!(
        "Superset disassembly completed in {:?}: {} instructions",
        start_time.elapsed(),
        instructions.len()
    );
    Ok(Disassembly::Stream(instructions))
}
