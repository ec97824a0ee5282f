//! Instruction records and operand-word emission for the first pass.
//!
//! Words that depend on symbol addresses are emitted as zero placeholders;
//! the second pass patches them using the operand text kept in the
//! [`Command`](struct.Command.html).

use crate::image::CodeImage;
use crate::operands::{parse_matrix, parse_number, Operand};
use crate::{Diagnostic, Stage};
use ecpu::constants::{MAX_IMMEDIATE_VAL, MIN_IMMEDIATE_VAL};
use ecpu::{
    make_destination_register_word, make_immediate_word, make_register_pair_word,
    make_source_register_word, Opcode, RegisterId, Word,
};

/// One encoded instruction line, recorded for the second pass.
#[derive(Clone, PartialEq, Debug)]
pub struct Command {
    pub label: Option<String>,
    /// IC of the opcode word.
    pub address: Word,
    /// Total words, opcode word included.
    pub length: Word,
    pub opcode: Opcode,
    /// Verbatim operand text; the second pass re-derives the addressing
    /// modes from these.
    pub src: Option<String>,
    pub dst: Option<String>,
}

/// Emit the extra words for an instruction's operands, source first. Two
/// register operands share one word. Numeric problems are diagnosed but
/// still emit a word, so IC always advances by the computed length.
pub fn emit_operands(
    image: &mut CodeImage,
    ic: &mut Word,
    src: Option<Operand<'_>>,
    dst: Option<Operand<'_>>,
    line_number: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let (Some(Operand::Register(src_reg)), Some(Operand::Register(dst_reg))) = (src, dst) {
        image.emit(ic, make_register_pair_word(src_reg, dst_reg));
        return;
    }

    if let Some(operand) = src {
        emit_operand(image, ic, operand, true, line_number, diagnostics);
    }
    if let Some(operand) = dst {
        emit_operand(image, ic, operand, false, line_number, diagnostics);
    }
}

fn emit_operand(
    image: &mut CodeImage,
    ic: &mut Word,
    operand: Operand<'_>,
    is_source: bool,
    line_number: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match operand {
        Operand::Register(register) => {
            let word = if is_source {
                make_source_register_word(register)
            } else {
                make_destination_register_word(register)
            };
            image.emit(ic, word);
        }
        Operand::Immediate(digits) => {
            let value = match parse_number(digits) {
                None => {
                    diagnostics.push(Diagnostic::error(
                        Stage::FirstPass,
                        format!("invalid immediate '#{}' at line {}", digits, line_number),
                    ));
                    0
                }
                Some(value) => {
                    if value < MIN_IMMEDIATE_VAL || value > MAX_IMMEDIATE_VAL {
                        diagnostics.push(Diagnostic::error(
                            Stage::FirstPass,
                            format!(
                                "immediate value {} out of range ({} to {}) at line {}",
                                value, MIN_IMMEDIATE_VAL, MAX_IMMEDIATE_VAL, line_number
                            ),
                        ));
                    }
                    value
                }
            };
            image.emit(ic, make_immediate_word(value));
        }
        // symbol address unknown until the second pass
        Operand::Direct(_) => image.emit(ic, 0),
        Operand::Matrix(text) => {
            // base-address placeholder, then the index registers
            image.emit(ic, 0);
            let (row, column) = match parse_matrix(text) {
                Some(matrix) => (matrix.row, matrix.column),
                None => {
                    diagnostics.push(Diagnostic::error(
                        Stage::FirstPass,
                        format!("invalid matrix syntax '{}' at line {}", text, line_number),
                    ));
                    (RegisterId::R0, RegisterId::R0)
                }
            };
            image.emit(ic, make_register_pair_word(row, column));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ecpu::constants::IC_INIT;

    fn emit(src: Option<&str>, dst: Option<&str>) -> (Vec<Word>, Word, Vec<Diagnostic>) {
        let mut image = CodeImage::new();
        let mut ic = IC_INIT;
        let mut diagnostics = Vec::new();

        emit_operands(
            &mut image,
            &mut ic,
            src.map(Operand::classify),
            dst.map(Operand::classify),
            1,
            &mut diagnostics,
        );

        (image.code_words(ic).to_vec(), ic - IC_INIT, diagnostics)
    }

    #[test]
    fn two_registers_share_a_word() {
        let (words, count, diagnostics) = emit(Some("r1"), Some("r2"));

        assert_eq!(words, vec![0b0001_0010_00]);
        assert_eq!(count, 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn lone_registers_take_their_own_field() {
        let (words, ..) = emit(Some("r3"), Some("LABEL"));
        assert_eq!(words, vec![0b0011_0000_00, 0]);

        let (words, ..) = emit(None, Some("r3"));
        assert_eq!(words, vec![0b0000_0011_00]);
    }

    #[test]
    fn immediate_and_placeholder() {
        let (words, count, diagnostics) = emit(Some("#-1"), Some("LABEL"));

        assert_eq!(words, vec![0b11111111_00, 0]);
        assert_eq!(count, 2);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn matrix_emits_placeholder_then_indices() {
        let (words, count, diagnostics) = emit(Some("M[r1][r2]"), Some("r0"));

        assert_eq!(words, vec![0, 0b0001_0010_00, 0]);
        assert_eq!(count, 3);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn bad_immediates_still_advance_ic() {
        let (words, count, diagnostics) = emit(Some("#12x"), None);
        assert_eq!(words, vec![0]);
        assert_eq!(count, 1);
        assert_eq!(diagnostics.len(), 1);

        let (words, count, diagnostics) = emit(Some("#300"), None);
        assert_eq!(count, 1);
        assert_eq!(words, vec![make_immediate_word(300)]);
        assert!(diagnostics[0].message.contains("out of range"));
    }

    #[test]
    fn bad_matrix_shape_still_advances_ic() {
        let (words, count, diagnostics) = emit(Some("M[r1]"), None);

        assert_eq!(words, vec![0, 0]);
        assert_eq!(count, 2);
        assert_eq!(diagnostics.len(), 1);
    }
}
