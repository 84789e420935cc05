//! CSV output formatter

use serde::Serialize;

use super::{hex_bytes, DisassemblyFormatter};
use crate::analysis::FlowKind;
use crate::{Address, Disassembly, DisassemblyError, Insn};

/// One CSV row per instruction
#[derive(Serialize)]
struct Row<'a> {
    base_address: String,
    section_type: &'static str,
    /// Empty for stream disassembly
    block_address: Option<String>,
    address: String,
    size: u8,
    mnemonic: &'a str,
    operands: &'a str,
    bytes: String,
    flow: FlowKind,
    comment: Option<&'static str>,
}

impl<'a> Row<'a> {
    fn new(base_addr: Address, section_type: &'static str, block: Option<Address>, insn: &'a Insn) -> Self {
        Self {
            base_address: format!("0x{:x}", base_addr),
            section_type,
            block_address: block.map(|b| format!("0x{:x}", b)),
            address: format!("0x{:x}", insn.addr),
            size: insn.size,
            mnemonic: &insn.mnemonic,
            operands: &insn.operands,
            bytes: hex_bytes(insn),
            flow: insn.flow,
            comment: insn.comment,
        }
    }
}

fn csv_error(e: impl std::fmt::Display) -> DisassemblyError {
    DisassemblyError::FormatError(format!("CSV error: {}", e))
}

impl DisassemblyFormatter for super::CsvFormatter {
    fn format(&self, disassembly: &Disassembly, base_addr: Address) -> Result<String, DisassemblyError> {
        let mut writer = ::csv::Writer::from_writer(Vec::new());

        match disassembly {
            Disassembly::Stream(insns) => {
                for insn in insns {
                    writer
                        .serialize(Row::new(base_addr, "stream", None, insn))
                        .map_err(csv_error)?;
                }
            }
            Disassembly::Cfg(blocks) => {
                for block in blocks {
                    for insn in &block.insns {
                        writer
                            .serialize(Row::new(base_addr, "cfg", Some(block.start), insn))
                            .map_err(csv_error)?;
                    }
                }
            }
        }

        let bytes = writer.into_inner().map_err(csv_error)?;
        String::from_utf8(bytes).map_err(csv_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::tests::{create_test_blocks, create_test_instructions, insn};
    use crate::format::CsvFormatter;

    #[test]
    fn test_csv_stream() {
        let disasm = Disassembly::Stream(create_test_instructions());
        let text = CsvFormatter.format(&disasm, 0xC000).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "base_address,section_type,block_address,address,size,mnemonic,operands,bytes,flow,comment"
        );
        assert_eq!(lines[1], "0xc000,stream,,0xc000,2,push.w,R5,05 12,falls,Push onto stack");
        assert_eq!(lines[3], "0xc000,stream,,0xc004,2,ret,,30 41,stop,");
    }

    #[test]
    fn test_csv_cfg_and_quoting() {
        let mut blocks = create_test_blocks();
        blocks[1]
            .insns
            .push(insn(0xC006, &[0xB6, 0x40, 0x34, 0x12, 0x04, 0x00], "mov.w", "#1234h, 4(R6)", FlowKind::Falls));
        let text = CsvFormatter.format(&Disassembly::Cfg(blocks), 0xC000).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[3].starts_with("0xc000,cfg,0xc004,0xc004,"));
        assert!(lines[4].contains("\"#1234h, 4(R6)\""), "{}", lines[4]);
    }
}
