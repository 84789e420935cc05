//! Linear-sweep disassembly strategy

use std::time::Instant;

use crate::cursor::Image;
use crate::pipeline::Session;
use crate::{Address, Decoder, Disassembly, DisassemblyError};

/// Linear sweep: analyze every instruction in increasing address order.
///
/// Analysis feeds on earlier results (stack deltas, previous heads for the
/// switch lookback), so the sweep is sequential. Alignment fillers are
/// stepped over before decoding; a byte that decodes to nothing is skipped.
///
/// # Arguments
/// * `image` - The loaded bytes to disassemble
/// * `decoder` - The decoder to use for disassembly
/// * `session` - Receives the analysis results
///
/// # Returns
/// A stream of disassembled instructions
pub fn run(image: &Image<'_>, decoder: &dyn Decoder, session: &mut Session) -> Result<Disassembly, DisassemblyError> {
    log::debug!(
        "Starting linear sweep on {} bytes at 0x{:x}",
        image.len(),
        image.base()
    );
    let start_time = Instant::now();

    let mut insns = Vec::new();
    let mut skipped = 0usize;
    let mut at = image.base();
    while at < image.end() {
        let pad = decoder.align_len(image, at);
        if pad > 0 {
            at += pad as Address;
            continue;
        }
        match decoder.analyze(image, at, &mut session.db, &mut session.stack) {
            Some(insn) => {
                at += insn.size as Address;
                insns.push(insn);
            }
            None => {
                at += 1;
                skipped += 1;
            }
        }
    }

    log::debug!(
        "Linear sweep completed in {:?}: {} instructions, skipped {} bytes",
        start_time.elapsed(),
        insns.len(),
        skipped
    );
    Ok(Disassembly::Stream(insns))
}
