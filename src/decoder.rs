//! Architecture selection behind the [`Decoder`] trait.

use std::fmt;

use crate::analysis::{AnalysisHost, StackTracker, SymbolResolver};
use crate::arch::ebc::{Ebc, PointerSize};
use crate::arch::msp430::Msp430;
use crate::cursor::Image;
use crate::pipeline::Pipeline;
use crate::{Address, Architecture, Config, Decoder, DisassemblyError, Insn};

/// One pipeline per supported instruction set.
#[derive(Clone)]
pub enum ProcessorDecoder {
    Ebc(Pipeline<Ebc>),
    Msp430(Pipeline<Msp430>),
}

impl fmt::Debug for ProcessorDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessorDecoder::Ebc(p) => write!(f, "Ebc({})", p.processor().pointer_size()),
            ProcessorDecoder::Msp430(_) => write!(f, "Msp430"),
        }
    }
}

impl ProcessorDecoder {
    /// Build the decoder for `arch`. EBC images without a known pointer
    /// size decode with 4-byte naturals.
    pub fn for_architecture(arch: Architecture, config: &Config) -> Result<Self, DisassemblyError> {
        match arch {
            Architecture::Ebc => {
                let pointer_size = config.pointer_size.unwrap_or_else(|| {
                    log::debug!("No pointer size given, assuming {}", PointerSize::default());
                    PointerSize::default()
                });
                Ok(ProcessorDecoder::Ebc(Pipeline::new(
                    Ebc::new(pointer_size),
                    config.clone(),
                )))
            }
            Architecture::Msp430 => Ok(ProcessorDecoder::Msp430(Pipeline::new(
                Msp430,
                config.clone(),
            ))),
            Architecture::Unknown => Err(DisassemblyError::UnsupportedArchitecture(arch)),
        }
    }

    fn inner(&self) -> &dyn Decoder {
        match self {
            ProcessorDecoder::Ebc(p) => p,
            ProcessorDecoder::Msp430(p) => p,
        }
    }
}

impl Decoder for ProcessorDecoder {
    fn architecture(&self) -> Architecture {
        self.inner().architecture()
    }

    fn decode(&self, image: &Image<'_>, at: Address, names: &(dyn SymbolResolver + Sync)) -> Option<Insn> {
        self.inner().decode(image, at, names)
    }

    fn analyze(
        &self,
        image: &Image<'_>,
        at: Address,
        host: &mut dyn AnalysisHost,
        stack: &mut StackTracker,
    ) -> Option<Insn> {
        self.inner().analyze(image, at, host, stack)
    }

    fn align_len(&self, image: &Image<'_>, at: Address) -> usize {
        self.inner().align_len(image, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Database;

    #[test]
    fn test_for_architecture() {
        let config = Config::default();
        let ebc = ProcessorDecoder::for_architecture(Architecture::Ebc, &config).unwrap();
        assert_eq!(ebc.architecture(), Architecture::Ebc);
        assert_eq!(format!("{:?}", ebc), "Ebc(4)");

        let msp = ProcessorDecoder::for_architecture(Architecture::Msp430, &config).unwrap();
        assert_eq!(msp.architecture(), Architecture::Msp430);

        assert!(matches!(
            ProcessorDecoder::for_architecture(Architecture::Unknown, &config),
            Err(DisassemblyError::UnsupportedArchitecture(Architecture::Unknown))
        ));
    }

    #[test]
    fn test_pointer_size_from_config() {
        let config = Config {
            pointer_size: Some(PointerSize::Eight),
            ..Config::default()
        };
        let ProcessorDecoder::Ebc(pipeline) =
            ProcessorDecoder::for_architecture(Architecture::Ebc, &config).unwrap()
        else {
            panic!("expected an EBC decoder");
        };
        assert_eq!(pipeline.processor().pointer_size(), PointerSize::Eight);
    }

    #[test]
    fn test_delegates_alignment() {
        let decoder = ProcessorDecoder::for_architecture(Architecture::Ebc, &Config::default()).unwrap();
        let bytes = [0x00, 0x00, 0x04, 0x00];
        let image = Image::new(&bytes, 0);
        assert_eq!(decoder.align_len(&image, 0), 2);

        let db = Database::new();
        // RET
        let insn = decoder.decode(&image, 2, &db).unwrap();
        assert_eq!(insn.mnemonic, "RET");
        assert!(insn.is_return());
    }
}
