//! Rendered instruction text.
//!
//! Renderers build a [`Line`] out of [`Token`]s instead of a flat string so
//! that callers can tell names, registers and unresolved addresses apart.

use std::fmt;

use crate::Address;

/// One piece of an operand's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Punctuation such as `#`, `@`, `[` or `+`.
    Symbol(&'static str),
    Register(&'static str),
    Number(String),
    /// A symbol or frame-variable name.
    Name(String),
    /// An address for which no name exists, printed as a raw literal.
    Unresolved { addr: Address, text: String },
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Symbol(s) | Token::Register(s) => f.write_str(s),
            Token::Number(s) | Token::Name(s) => f.write_str(s),
            Token::Unresolved { text, .. } => f.write_str(text),
        }
    }
}

/// A rendered instruction: the mnemonic with its suffixes, then operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    mnemonic: String,
    column: usize,
    operands: Vec<Vec<Token>>,
}

impl Line {
    /// Start a line whose operands begin at `column`.
    pub fn new(mnemonic: impl Into<String>, column: usize) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            column,
            operands: Vec::new(),
        }
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn push_operand(&mut self, tokens: Vec<Token>) {
        self.operands.push(tokens);
    }

    pub fn operands(&self) -> &[Vec<Token>] {
        &self.operands
    }

    /// Operands joined the way they are printed.
    pub fn operands_text(&self) -> String {
        self.operands
            .iter()
            .map(|tokens| tokens.iter().map(ToString::to_string).collect::<String>())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Addresses that were printed without a name.
    pub fn unresolved(&self) -> Vec<Address> {
        self.operands
            .iter()
            .flatten()
            .filter_map(|t| match t {
                Token::Unresolved { addr, .. } => Some(*addr),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            return f.write_str(&self.mnemonic);
        }
        // at least one space between mnemonic and operands
        let width = self.column.max(self.mnemonic.len() + 1);
        write!(f, "{:<width$}{}", self.mnemonic, self.operands_text())
    }
}

/// Hex notation of an assembler dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberStyle {
    /// `0x1F`
    CPrefix,
    /// `1Fh`, `0FFh`
    HSuffix,
}

/// Format an unsigned value. Values below 10 are printed in decimal.
pub fn number(value: u64, style: NumberStyle) -> String {
    if value < 10 {
        return value.to_string();
    }
    match style {
        NumberStyle::CPrefix => format!("0x{value:X}"),
        NumberStyle::HSuffix => {
            let digits = format!("{value:X}");
            if digits.starts_with(|c: char| c.is_ascii_alphabetic()) {
                format!("0{digits}h")
            } else {
                format!("{digits}h")
            }
        }
    }
}

/// Format a signed value, with an explicit `+` when `force_sign` is set.
pub fn signed_number(value: i64, style: NumberStyle, force_sign: bool) -> String {
    let magnitude = number(value.unsigned_abs(), style);
    if value < 0 {
        format!("-{magnitude}")
    } else if force_sign {
        format!("+{magnitude}")
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, NumberStyle::CPrefix, "0")]
    #[case(9, NumberStyle::HSuffix, "9")]
    #[case(10, NumberStyle::CPrefix, "0xA")]
    #[case(0x10, NumberStyle::CPrefix, "0x10")]
    #[case(0x10, NumberStyle::HSuffix, "10h")]
    #[case(0xFF, NumberStyle::HSuffix, "0FFh")]
    #[case(0xC000, NumberStyle::HSuffix, "0C000h")]
    fn test_number(#[case] value: u64, #[case] style: NumberStyle, #[case] expected: &str) {
        assert_eq!(number(value, style), expected);
    }

    #[test]
    fn test_signed_number() {
        assert_eq!(signed_number(-0x20, NumberStyle::CPrefix, true), "-0x20");
        assert_eq!(signed_number(8, NumberStyle::CPrefix, true), "+8");
        assert_eq!(signed_number(0x1A, NumberStyle::HSuffix, false), "1Ah");
        assert_eq!(signed_number(i64::MIN, NumberStyle::CPrefix, false), "-0x8000000000000000");
    }

    #[test]
    fn test_line_layout() {
        let mut line = Line::new("mov.w", 12);
        line.push_operand(vec![Token::Symbol("#"), Token::Number("0x10".into())]);
        line.push_operand(vec![Token::Register("R5")]);
        assert_eq!(line.to_string(), "mov.w       #0x10, R5");
        assert_eq!(Line::new("ret", 12).to_string(), "ret");
    }

    #[test]
    fn test_unresolved_tokens() {
        let mut line = Line::new("JMP32", 15);
        line.push_operand(vec![Token::Unresolved {
            addr: 0x1234,
            text: "0x1234".into(),
        }]);
        assert_eq!(line.unresolved(), vec![0x1234]);
        assert_eq!(line.operands_text(), "0x1234");
    }
}
