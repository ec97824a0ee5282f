//! Operand classification and the small shared parsing helpers.
//!
//! Classification looks only at the operand's shape — a leading `#`, an exact
//! register name, a `[` anywhere, or anything else — so both passes can derive
//! the addressing mode from the verbatim operand text. Deeper validation
//! (numeric form, matrix shape) happens where the operand is consumed.

use ecpu::{AddressingMode, RegisterId};

/// A classified operand, borrowing the source text it was derived from.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Operand<'a> {
    /// `#n`; holds the text after the `#`.
    Immediate(&'a str),
    /// A symbol reference.
    Direct(&'a str),
    /// `LABEL[rX][rY]`; holds the full operand text.
    Matrix(&'a str),
    Register(RegisterId),
}

impl<'a> Operand<'a> {
    pub fn classify(text: &'a str) -> Operand<'a> {
        if let Some(rest) = text.strip_prefix('#') {
            return Operand::Immediate(rest);
        }
        if let Ok(register) = text.parse::<RegisterId>() {
            return Operand::Register(register);
        }
        if text.contains('[') {
            return Operand::Matrix(text);
        }

        Operand::Direct(text)
    }

    pub fn mode(&self) -> AddressingMode {
        match self {
            Operand::Immediate(_) => AddressingMode::Immediate,
            Operand::Direct(_) => AddressingMode::Direct,
            Operand::Matrix(_) => AddressingMode::Matrix,
            Operand::Register(_) => AddressingMode::Register,
        }
    }
}

/// A syntactically valid matrix operand.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct MatrixOperand<'a> {
    pub label: &'a str,
    pub row: RegisterId,
    pub column: RegisterId,
}

/// Parse `LABEL[rX][rY]`: exactly two bracket pairs, both holding registers,
/// nothing after the second. Returns `None` for any other shape.
pub fn parse_matrix(text: &str) -> Option<MatrixOperand<'_>> {
    let (label, rest) = text.split_once('[')?;
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    let (row, rest) = rest.split_once(']')?;
    let rest = rest.trim_start().strip_prefix('[')?;
    let (column, rest) = rest.split_once(']')?;
    if !rest.trim().is_empty() {
        return None;
    }

    Some(MatrixOperand {
        label,
        row: row.trim().parse().ok()?,
        column: column.trim().parse().ok()?,
    })
}

/// Split instruction operand text on its single allowed comma. A lone operand
/// is the destination. Returns `None` when more than one comma appears.
pub fn split_operands(text: &str) -> Option<(Option<&str>, Option<&str>)> {
    let text = text.trim();

    match text.split_once(',') {
        None => Some((None, non_empty(text))),
        Some((src, dst)) => {
            if dst.contains(',') {
                return None;
            }
            Some((non_empty(src.trim()), non_empty(dst.trim())))
        }
    }
}

/// First whitespace-delimited token and whatever follows it.
pub fn split_first(text: &str) -> (&str, Option<&str>) {
    match text.split_once(' ') {
        Some((first, rest)) => (first, non_empty(rest.trim())),
        None => (text, None),
    }
}

pub fn non_empty(text: &str) -> Option<&str> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Decimal digits with an optional `+`/`-` prefix.
pub fn is_valid_number(text: &str) -> bool {
    let digits = text
        .strip_prefix('+')
        .or_else(|| text.strip_prefix('-'))
        .unwrap_or(text);

    !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit())
}

/// Parse a signed decimal number. `None` means the form is wrong; a value of
/// absurd magnitude saturates so that range checks still fire.
pub fn parse_number(text: &str) -> Option<i64> {
    if !is_valid_number(text) {
        return None;
    }

    Some(text.parse::<i64>().unwrap_or(if text.starts_with('-') {
        i64::min_value()
    } else {
        i64::max_value()
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use ecpu::AddressingMode;

    #[test]
    fn classification() {
        assert_eq!(Operand::classify("#5").mode(), AddressingMode::Immediate);
        assert_eq!(Operand::classify("#x").mode(), AddressingMode::Immediate);
        assert_eq!(Operand::classify("r3"), Operand::Register(RegisterId::R3));
        assert_eq!(Operand::classify("M[r1][r2]").mode(), AddressingMode::Matrix);
        assert_eq!(Operand::classify("LABEL").mode(), AddressingMode::Direct);
        // not registers: out of range or too long
        assert_eq!(Operand::classify("r8").mode(), AddressingMode::Direct);
        assert_eq!(Operand::classify("r12").mode(), AddressingMode::Direct);
    }

    #[test]
    fn matrix_shapes() {
        let matrix = parse_matrix("M[r1][r2]").unwrap();
        assert_eq!(matrix.label, "M");
        assert_eq!(matrix.row, RegisterId::R1);
        assert_eq!(matrix.column, RegisterId::R2);

        assert!(parse_matrix("M[ r1 ] [ r2 ]").is_some());
        assert!(parse_matrix("M[r1]").is_none());
        assert!(parse_matrix("M[r1][r2][r3]").is_none());
        assert!(parse_matrix("M[r1][x]").is_none());
        assert!(parse_matrix("M[1][r2]").is_none());
        assert!(parse_matrix("[r1][r2]").is_none());
        assert!(parse_matrix("M[r1][r2]x").is_none());
    }

    #[test]
    fn operand_splitting() {
        assert_eq!(split_operands(""), Some((None, None)));
        assert_eq!(split_operands("r1"), Some((None, Some("r1"))));
        assert_eq!(split_operands("r1, r2"), Some((Some("r1"), Some("r2"))));
        assert_eq!(split_operands(" #-1 , r3 "), Some((Some("#-1"), Some("r3"))));
        assert_eq!(split_operands(", r2"), Some((None, Some("r2"))));
        assert_eq!(split_operands("r1, r2, r3"), None);
    }

    #[test]
    fn number_forms() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("+42"), Some(42));
        assert_eq!(parse_number("-512"), Some(-512));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("12x"), None);
        assert_eq!(parse_number("1 2"), None);
        assert!(parse_number("99999999999999999999").unwrap() > 511);
    }
}
