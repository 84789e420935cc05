//! Code and data cross-references.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Address;

/// Kinds of control-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeRef {
    Call,
    Jump,
    /// Ordinary fallthrough to the next instruction.
    Flow,
}

/// Kinds of data edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataRef {
    Read,
    Write,
    /// The address is taken, not dereferenced.
    Offset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XrefKind {
    Code(CodeRef),
    Data(DataRef),
}

/// An edge from the instruction at `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Xref {
    pub from: Address,
    /// Offset of the referring operand inside the instruction.
    pub offb: u8,
    pub to: Address,
    pub kind: XrefKind,
}

impl Xref {
    pub fn code(from: Address, offb: u8, to: Address, kind: CodeRef) -> Self {
        Self {
            from,
            offb,
            to,
            kind: XrefKind::Code(kind),
        }
    }

    pub fn data(from: Address, offb: u8, to: Address, kind: DataRef) -> Self {
        Self {
            from,
            offb,
            to,
            kind: XrefKind::Data(kind),
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self.kind, XrefKind::Code(_))
    }
}

impl fmt::Display for XrefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            XrefKind::Code(CodeRef::Call) => "call",
            XrefKind::Code(CodeRef::Jump) => "jump",
            XrefKind::Code(CodeRef::Flow) => "flow",
            XrefKind::Data(DataRef::Read) => "read",
            XrefKind::Data(DataRef::Write) => "write",
            XrefKind::Data(DataRef::Offset) => "offset",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Xref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:0x{:x}", self.kind, self.to)
    }
}
