//! JSON and JSON Lines output formatters

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{hex_bytes, DisassemblyFormatter};
use crate::analysis::FlowKind;
use crate::{Address, BasicBlock, Disassembly, DisassemblyError, Insn};

/// Serializable cross-reference for JSON output
#[derive(Serialize, Deserialize)]
struct XrefJson {
    /// Edge kind ("jump", "read", ...)
    kind: String,
    /// Target address
    to: String,
}

/// Serializable instruction for JSON output
#[derive(Serialize, Deserialize)]
struct InstructionJson {
    /// Address of the instruction
    address: String,
    /// Size of the instruction in bytes
    size: u8,
    /// Mnemonic with its suffixes (e.g., "mov.b", "MOVqw")
    mnemonic: String,
    /// Operands as printed
    operands: String,
    /// Bytes of the instruction as hex string
    bytes: String,
    /// How execution leaves the instruction
    flow: FlowKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    xrefs: Vec<XrefJson>,
}

/// Serializable basic block for JSON output
#[derive(Serialize, Deserialize)]
struct BasicBlockJson {
    /// Starting address of the block
    start: String,
    /// Instructions in this block
    instructions: Vec<InstructionJson>,
    /// Successor blocks
    successors: Vec<String>,
}

/// Serializable section for JSON output
#[derive(Serialize, Deserialize)]
struct SectionJson {
    /// Base address of the section
    base_address: String,
    /// Type of disassembly ("stream" or "cfg")
    #[serde(rename = "type")]
    disasm_type: String,
    /// Instructions (for Stream disassembly)
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<Vec<InstructionJson>>,
    /// Basic blocks (for CFG disassembly)
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<Vec<BasicBlockJson>>,
}

/// Serializable disassembly result for JSON output
#[derive(Serialize, Deserialize)]
struct DisassemblyJson {
    /// Sections in the disassembly
    sections: Vec<SectionJson>,
}

fn json_error(e: serde_json::Error) -> DisassemblyError {
    DisassemblyError::FormatError(format!("JSON serialization error: {}", e))
}

impl DisassemblyFormatter for super::JsonFormatter {
    fn format(&self, disassembly: &Disassembly, base_addr: Address) -> Result<String, DisassemblyError> {
        let section = match disassembly {
            Disassembly::Stream(insns) => SectionJson {
                base_address: format!("0x{:x}", base_addr),
                disasm_type: "stream".to_string(),
                instructions: Some(insns.iter().map(instruction_to_json).collect()),
                blocks: None,
            },
            Disassembly::Cfg(blocks) => SectionJson {
                base_address: format!("0x{:x}", base_addr),
                disasm_type: "cfg".to_string(),
                instructions: None,
                blocks: Some(blocks.iter().map(block_to_json).collect()),
            },
        };

        let result = DisassemblyJson {
            sections: vec![section],
        };
        serde_json::to_string_pretty(&result).map_err(json_error)
    }
}

impl DisassemblyFormatter for super::JsonLinesFormatter {
    fn format(&self, disassembly: &Disassembly, base_addr: Address) -> Result<String, DisassemblyError> {
        let mut output = String::new();
        let base_addr_str = format!("0x{:x}", base_addr);

        let mut emit = |value: serde_json::Value| -> Result<(), DisassemblyError> {
            output.push_str(&serde_json::to_string(&value).map_err(json_error)?);
            output.push('\n');
            Ok(())
        };

        match disassembly {
            Disassembly::Stream(insns) => {
                for insn in insns {
                    let mut value = serde_json::to_value(instruction_to_json(insn)).map_err(json_error)?;
                    value["type"] = json!("instruction");
                    value["base_address"] = json!(base_addr_str);
                    emit(value)?;
                }
            }
            Disassembly::Cfg(blocks) => {
                for block in blocks {
                    emit(json!({
                        "type": "block",
                        "base_address": base_addr_str,
                        "start": format!("0x{:x}", block.start),
                        "successors": block.succs.iter().map(|succ| format!("0x{:x}", succ)).collect::<Vec<_>>()
                    }))?;

                    for insn in &block.insns {
                        let mut value = serde_json::to_value(instruction_to_json(insn)).map_err(json_error)?;
                        value["type"] = json!("instruction");
                        value["base_address"] = json!(base_addr_str);
                        value["block_start"] = json!(format!("0x{:x}", block.start));
                        emit(value)?;
                    }
                }
            }
        }

        Ok(output)
    }
}

/// Convert an instruction to JSON format
fn instruction_to_json(insn: &Insn) -> InstructionJson {
    InstructionJson {
        address: format!("0x{:x}", insn.addr),
        size: insn.size,
        mnemonic: insn.mnemonic.clone(),
        operands: insn.operands.clone(),
        bytes: hex_bytes(insn),
        flow: insn.flow,
        comment: insn.comment.map(str::to_string),
        xrefs: insn
            .xrefs
            .iter()
            .map(|x| XrefJson {
                kind: x.kind.to_string(),
                to: format!("0x{:x}", x.to),
            })
            .collect(),
    }
}

/// Convert a basic block to JSON format
fn block_to_json(block: &BasicBlock) -> BasicBlockJson {
    BasicBlockJson {
        start: format!("0x{:x}", block.start),
        instructions: block.insns.iter().map(instruction_to_json).collect(),
        successors: block.succs.iter().map(|succ| format!("0x{:x}", *succ)).collect(),
    }
}
