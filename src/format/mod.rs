//! Output formats for disassembly results

mod csv;
mod json;

pub use self::csv::*;
pub use self::json::*;

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::{Address, Disassembly, DisassemblyError, Insn};

/// Supported output formats for disassembly results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Assembler listing (default)
    #[default]
    Text,
    /// JSON format (hierarchical)
    Json,
    /// JSON Lines format (one JSON object per line)
    #[value(name = "jsonl", alias = "json-lines")]
    JsonLines,
    /// CSV format (comma-separated values)
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonLines => write!(f, "jsonl"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "jsonlines" => Ok(OutputFormat::JsonLines),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl OutputFormat {
    /// Get all available output formats
    pub fn available_formats() -> &'static [Self] {
        &[
            OutputFormat::Text,
            OutputFormat::Json,
            OutputFormat::JsonLines,
            OutputFormat::Csv,
        ]
    }

    /// Get a formatter for this output format
    pub fn get_formatter(&self) -> Box<dyn DisassemblyFormatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
            OutputFormat::JsonLines => Box::new(JsonLinesFormatter),
            OutputFormat::Csv => Box::new(CsvFormatter),
        }
    }
}

/// Formatter trait for disassembly output
pub trait DisassemblyFormatter {
    /// Format a disassembly result
    fn format(&self, disassembly: &Disassembly, base_addr: Address) -> Result<String, DisassemblyError>;
}

/// Format disassembly as an assembler listing
pub struct TextFormatter;

/// Format disassembly in JSON
pub struct JsonFormatter;

/// Format disassembly in JSON Lines
pub struct JsonLinesFormatter;

/// Format disassembly in CSV
pub struct CsvFormatter;

/// Instruction bytes as space-separated hex pairs.
pub(crate) fn hex_bytes(insn: &Insn) -> String {
    insn.bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn listing_line(insn: &Insn, indent: &str) -> String {
    let mut line = format!("{}0x{:08x}: {:<24} {}", indent, insn.addr, hex_bytes(insn), insn.text);
    if let Some(comment) = insn.comment {
        let width = line.len().max(indent.len() + 72);
        line = format!("{:<width$} ; {}", line, comment);
    }
    line.push('\n');
    line
}

impl DisassemblyFormatter for TextFormatter {
    fn format(&self, disassembly: &Disassembly, base_addr: Address) -> Result<String, DisassemblyError> {
        let mut output = String::new();

        match disassembly {
            Disassembly::Stream(insns) => {
                output.push_str(&format!("Disassembly at 0x{:x}:\n\n", base_addr));
                for insn in insns {
                    output.push_str(&listing_line(insn, ""));
                }
            }
            Disassembly::Cfg(blocks) => {
                output.push_str(&format!("Control Flow Graph at 0x{:x}:\n\n", base_addr));
                for block in blocks {
                    output.push_str(&format!("Block at 0x{:08x}:\n", block.start));
                    for insn in &block.insns {
                        output.push_str(&listing_line(insn, "  "));
                    }

                    if block.succs.is_empty() {
                        output.push_str("  No successors (terminal block)\n");
                    } else {
                        let succs: Vec<String> = block.succs.iter().map(|s| format!("0x{:08x}", s)).collect();
                        output.push_str(&format!("  Successors: {}\n", succs.join(", ")));
                    }
                    output.push('\n');
                }
            }
        }

        Ok(output)
    }
}
