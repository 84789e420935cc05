//! Disassembly strategies

use std::fmt;

use clap::ValueEnum;

use crate::cursor::Image;
use crate::pipeline::Session;
use crate::{Decoder, Disassembly, DisassemblyError};

/// Available disassembly strategies.
#[derive(Copy, Clone, ValueEnum, Debug, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Linear sweep with analysis
    #[default]
    Linear,
    /// Superset disassembly (an instruction at every offset)
    Superset,
    /// Recursive descent along analyzer code edges
    Recursive,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Linear => write!(f, "Linear sweep"),
            Strategy::Superset => write!(f, "Superset"),
            Strategy::Recursive => write!(f, "Recursive descent"),
        }
    }
}

impl Strategy {
    /// Run the selected strategy on `image` using `decoder`, reporting
    /// analysis results into `session`.
    pub fn run(
        &self,
        image: &Image<'_>,
        decoder: &dyn Decoder,
        session: &mut Session,
    ) -> Result<Disassembly, DisassemblyError> {
        match self {
            Strategy::Linear => linear::run(image, decoder, session),
            Strategy::Superset => superset::run(image, decoder, session),
            Strategy::Recursive => recursive::run(image, decoder, session),
        }
    }

    /// Return all available strategies
    pub fn all() -> &'static [Strategy] {
        &[Strategy::Linear, Strategy::Superset, Strategy::Recursive]
    }
}

pub mod linear;
pub mod recursive;
pub mod superset;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::ProcessorDecoder;
    use crate::{Architecture, Config};

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::Linear.to_string(), "Linear sweep");
        assert_eq!(Strategy::Recursive.to_string(), "Recursive descent");
        assert_eq!(Strategy::default(), Strategy::Linear);
    }

    #[test]
    fn test_every_strategy_finds_straight_line_code() {
        // push R5; pop R5; ret
        let bytes = [0x05, 0x12, 0x35, 0x41, 0x30, 0x41];
        let image = Image::new(&bytes, 0xC000);
        let decoder = ProcessorDecoder::for_architecture(Architecture::Msp430, &Config::default()).unwrap();

        for strategy in Strategy::all() {
            let mut session = Session::new();
            let result = strategy.run(&image, &decoder, &mut session).unwrap();
            let mnemonics: Vec<String> = result
                .all_instructions()
                .into_iter()
                .filter(|i| i.addr % 2 == 0)
                .map(|i| i.mnemonic)
                .collect();
            assert_eq!(mnemonics, ["push.w", "pop", "ret"], "{}", strategy);
        }
    }
}
