//! Drives decode, simplify, analyze and render for one processor.

use crate::analysis::{
    AnalysisHost, CodeRef, Database, Emulation, StackTracker, SymbolResolver, Xref,
};
use crate::arch::{Context, Instruction, Processor};
use crate::cursor::Image;
use crate::render::Line;
use crate::{Address, Architecture, Config, Decoder, Insn, MAX_INSTRUCTION_SIZE};

/// Analysis state shared by every step of a sweep.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub db: Database,
    pub stack: StackTracker,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Outcome of running one address through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step<I> {
    pub insn: Instruction<I>,
    pub emulation: Emulation,
    /// Edges reported for the instruction, fallthrough last.
    pub xrefs: Vec<Xref>,
    pub line: Line,
}

/// A processor plus the settings its analyzer runs with.
#[derive(Debug, Clone)]
pub struct Pipeline<P> {
    processor: P,
    config: Config,
}

impl<P: Processor> Pipeline<P> {
    pub fn new(processor: P, config: Config) -> Self {
        Self { processor, config }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Length of the instruction at `at`, or 0 if none decodes there.
    pub fn decode_len(&self, image: &Image<'_>, at: Address) -> usize {
        match self.processor.decode(image, at) {
            Ok(insn) => insn.length as usize,
            Err(err) => {
                log::trace!("no instruction at 0x{:x}: {}", at, err);
                0
            }
        }
    }

    /// Decode, analyze and render the instruction at `at`.
    pub fn step(
        &self,
        image: &Image<'_>,
        at: Address,
        host: &mut dyn AnalysisHost,
        stack: &mut StackTracker,
    ) -> Option<Step<P::Itype>> {
        let insn = match self.processor.decode(image, at) {
            Ok(insn) => insn,
            Err(err) => {
                log::trace!("no instruction at 0x{:x}: {}", at, err);
                return None;
            }
        };
        host.add_head(insn.address, insn.length);

        let (emulation, mut xrefs) = {
            let mut ctx = Context::new(*image, &mut *host, &mut *stack, &self.config);
            let emulation = self.processor.emulate(&insn, &mut ctx);
            (emulation, ctx.take_emitted())
        };
        if emulation.flow.falls_through() {
            let flow = Xref::code(insn.address, 0, insn.end(), CodeRef::Flow);
            host.add_xref(flow);
            xrefs.push(flow);
        }

        let line = self.processor.render(&insn, host.resolver());
        if !line.unresolved().is_empty() {
            host.mark_unnamed(insn.address);
        }

        Some(Step {
            insn,
            emulation,
            xrefs,
            line,
        })
    }

    fn to_insn(&self, image: &Image<'_>, step: Step<P::Itype>) -> Insn {
        let Step {
            insn,
            emulation,
            xrefs,
            line,
        } = step;

        let mut bytes = [0u8; MAX_INSTRUCTION_SIZE];
        let len = (insn.length as usize).min(MAX_INSTRUCTION_SIZE);
        if let Some(raw) = image.slice(insn.address, len) {
            bytes[..len].copy_from_slice(raw);
        }

        Insn {
            addr: insn.address,
            size: insn.length,
            mnemonic: line.mnemonic().to_string(),
            operands: line.operands_text(),
            text: line.to_string(),
            bytes,
            comment: self.processor.comment(insn.itype),
            flow: emulation.flow,
            xrefs,
        }
    }
}

impl<P: Processor> Decoder for Pipeline<P> {
    fn architecture(&self) -> Architecture {
        self.processor.architecture()
    }

    /// Analyzes against a scratch host so the result depends only on the
    /// bytes; `names` is consulted for rendering alone.
    fn decode(&self, image: &Image<'_>, at: Address, names: &(dyn SymbolResolver + Sync)) -> Option<Insn> {
        let mut scratch = Session::new();
        let step = self.step(image, at, &mut scratch.db, &mut scratch.stack)?;
        let line = self.processor.render(&step.insn, names);
        Some(self.to_insn(image, Step { line, ..step }))
    }

    fn analyze(
        &self,
        image: &Image<'_>,
        at: Address,
        host: &mut dyn AnalysisHost,
        stack: &mut StackTracker,
    ) -> Option<Insn> {
        let step = self.step(image, at, host, stack)?;
        Some(self.to_insn(image, step))
    }

    fn align_len(&self, image: &Image<'_>, at: Address) -> usize {
        self.processor.align_len(image, at)
    }
}
