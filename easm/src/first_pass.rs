//! The first pass: classify every line, validate it, place symbols, and emit
//! the partially encoded code image. Errors are collected, not fatal — the
//! pass keeps going so one run reports as much as possible.

use crate::cleaner::clean_line;
use crate::directives::{parse_mat, parse_string_literal, parse_value_list, Directive};
use crate::image::CodeImage;
use crate::instructions::{emit_operands, Command};
use crate::operands::{split_first, split_operands, Operand};
use crate::symbols::{is_legal_name, is_reserved, SymbolKind, SymbolTable};
use crate::{Diagnostic, Stage};
use ecpu::constants::{DC_INIT, IC_INIT, MAX_LABEL_LENGTH, MEMORY_WORDS};
use ecpu::{instruction_length, make_first_word, Opcode, Word};
use matches::debug_assert_matches;

/// Everything the first pass learns about one file.
pub struct FirstPass {
    pub symbols: SymbolTable,
    pub commands: Vec<Command>,
    pub directives: Vec<Directive>,
    pub image: CodeImage,
    pub icf: Word,
    pub dcf: Word,
}

pub fn run(source: &str) -> (FirstPass, Vec<Diagnostic>) {
    let mut pass = Pass {
        symbols: SymbolTable::new(),
        commands: Vec::new(),
        directives: Vec::new(),
        image: CodeImage::new(),
        ic: IC_INIT,
        dc: DC_INIT,
        diagnostics: Vec::new(),
    };

    for (index, raw) in source.lines().enumerate() {
        pass.process_line(&clean_line(raw), index + 1);
    }

    let icf = pass.ic;
    let dcf = pass.dc;

    // the data segment starts where the code segment ends
    pass.symbols.relocate_data(icf);

    // icf carries the IC_INIT offset, so it does not measure memory use by
    // itself; the commands' lengths do, and they keep counting even after
    // the image stops storing words at the bound
    let code_words: usize = pass
        .commands
        .iter()
        .map(|command| command.length as usize)
        .sum();
    let words_used = code_words + dcf as usize;
    if words_used > MEMORY_WORDS {
        pass.error(
            Stage::FirstPass,
            format!(
                "memory overflow: program requires {} words but the maximum is {}",
                words_used, MEMORY_WORDS
            ),
        );
    }

    (
        FirstPass {
            symbols: pass.symbols,
            commands: pass.commands,
            directives: pass.directives,
            image: pass.image,
            icf,
            dcf,
        },
        pass.diagnostics,
    )
}

struct Pass {
    symbols: SymbolTable,
    commands: Vec<Command>,
    directives: Vec<Directive>,
    image: CodeImage,
    ic: Word,
    dc: Word,
    diagnostics: Vec<Diagnostic>,
}

impl Pass {
    fn process_line(&mut self, line: &str, line_number: usize) {
        if line.is_empty() {
            return;
        }

        let (label, content) = self.consume_label(line, line_number);
        if content.is_empty() {
            self.error(
                Stage::FirstPass,
                format!(
                    "missing directive or instruction after label at line {}",
                    line_number
                ),
            );
            return;
        }

        let (head, ops) = split_first(content);
        match head {
            ".data" | ".string" | ".mat" | ".extern" | ".entry" => {
                self.process_directive(head, ops, label, line_number)
            }
            _ => self.process_instruction(head, ops, label, line_number),
        }
    }

    /// Detect a leading `NAME:` token. An illegal label is diagnosed and
    /// dropped; parsing continues with the rest of the line either way.
    fn consume_label<'a>(&mut self, line: &'a str, line_number: usize) -> (Option<String>, &'a str) {
        let (first, rest) = split_first(line);
        let name = match first.strip_suffix(':') {
            Some(name) => name,
            None => return (None, line),
        };
        let content = rest.unwrap_or("");

        if name.chars().count() > MAX_LABEL_LENGTH {
            self.error(
                Stage::FirstPass,
                format!(
                    "label '{}' at line {} exceeds the maximum length of {} characters",
                    name, line_number, MAX_LABEL_LENGTH
                ),
            );
            return (None, content);
        }
        if !is_legal_name(name) || is_reserved(name) {
            self.error(
                Stage::FirstPass,
                format!("illegal label '{}' at line {}", name, line_number),
            );
            return (None, content);
        }

        (Some(name.to_owned()), content)
    }

    fn process_directive(
        &mut self,
        name: &str,
        ops: Option<&str>,
        label: Option<String>,
        line_number: usize,
    ) {
        debug_assert_matches!(name, ".data" | ".string" | ".mat" | ".extern" | ".entry");

        if matches!(name, ".data" | ".string" | ".mat") {
            // the label marks the current DC, even if the payload turns out bad
            if let Some(label) = &label {
                self.define_symbol(label, self.dc, SymbolKind::Data);
            }

            let ops = match ops {
                Some(text) => self.check_trailing_comma(text, line_number),
                None => {
                    self.error(
                        Stage::FirstPass,
                        format!("missing operand(s) in line {}", line_number),
                    );
                    return;
                }
            };

            let words = match name {
                ".data" => Some(parse_value_list(
                    ops,
                    ".data",
                    line_number,
                    &mut self.diagnostics,
                )),
                ".string" => parse_string_literal(ops, line_number, &mut self.diagnostics),
                _ => parse_mat(ops, line_number, &mut self.diagnostics),
            };

            if let Some(words) = words {
                let address = self.dc;
                self.dc = self.dc.saturating_add(words.len() as Word);
                self.directives.push(Directive::Data {
                    label,
                    address,
                    words,
                });
            }
            return;
        }

        if label.is_some() {
            self.warning(
                Stage::FirstPass,
                format!("label before {} is ignored at line {}", name, line_number),
            );
        }

        let ops = match ops {
            Some(text) => self.check_trailing_comma(text, line_number).trim(),
            None => {
                self.error(
                    Stage::FirstPass,
                    format!("{} requires a symbol name at line {}", name, line_number),
                );
                return;
            }
        };

        if name == ".extern" {
            self.define_symbol(ops, 0, SymbolKind::External);
            self.directives.push(Directive::Extern {
                name: ops.to_owned(),
            });
        } else {
            // whether the entry symbol exists is only knowable after the
            // whole file has been read; the second pass checks
            self.directives.push(Directive::Entry {
                name: ops.to_owned(),
            });
        }
    }

    fn process_instruction(
        &mut self,
        mnemonic: &str,
        ops: Option<&str>,
        label: Option<String>,
        line_number: usize,
    ) {
        let opcode = match mnemonic.parse::<Opcode>() {
            Ok(opcode) => opcode,
            Err(_) => {
                self.error(
                    Stage::FirstPass,
                    format!("unknown opcode '{}' at line {}", mnemonic, line_number),
                );
                return;
            }
        };

        let (src, dst) = match split_operands(ops.unwrap_or("")) {
            Some(operands) => operands,
            None => {
                self.error(
                    Stage::FirstPass,
                    format!("too many operands at line {}", line_number),
                );
                return;
            }
        };

        let expected = opcode.expects_src() as usize + opcode.expects_dst() as usize;
        let actual = src.is_some() as usize + dst.is_some() as usize;
        if expected != actual {
            self.error(
                Stage::FirstPass,
                format!(
                    "wrong number of operands at line {}, expected {} but {} received",
                    line_number, expected, actual
                ),
            );
            return;
        }

        let src_operand = src.map(Operand::classify);
        let dst_operand = dst.map(Operand::classify);

        if let Some(operand) = src_operand {
            if opcode.allowed_src() & operand.mode().mask() == 0 {
                self.error(
                    Stage::FirstPass,
                    format!("illegal source operand at line {}", line_number),
                );
                return;
            }
        }
        if let Some(operand) = dst_operand {
            if opcode.allowed_dst() & operand.mode().mask() == 0 {
                self.error(
                    Stage::FirstPass,
                    format!("illegal destination operand at line {}", line_number),
                );
                return;
            }
        }

        let address = self.ic;
        if let Some(name) = &label {
            self.define_symbol(name, address, SymbolKind::Code);
        }

        let src_mode = src_operand.map(|operand| operand.mode());
        let dst_mode = dst_operand.map(|operand| operand.mode());
        self.commands.push(Command {
            label,
            address,
            length: instruction_length(src_mode, dst_mode),
            opcode,
            src: src.map(str::to_owned),
            dst: dst.map(str::to_owned),
        });

        self.image
            .emit(&mut self.ic, make_first_word(opcode, src_mode, dst_mode));
        emit_operands(
            &mut self.image,
            &mut self.ic,
            src_operand,
            dst_operand,
            line_number,
            &mut self.diagnostics,
        );
    }

    fn define_symbol(&mut self, name: &str, address: Word, kind: SymbolKind) {
        if let Err(err) = self.symbols.add(name, address, kind) {
            self.error(Stage::Symbol, err.to_string());
        }
    }

    /// Diagnose a trailing comma and hand back the text without it.
    fn check_trailing_comma<'a>(&mut self, text: &'a str, line_number: usize) -> &'a str {
        let trimmed = text.trim_end();
        match trimmed.strip_suffix(',') {
            Some(stripped) => {
                self.error(
                    Stage::FirstPass,
                    format!("trailing comma at line {}", line_number),
                );
                stripped
            }
            None => text,
        }
    }

    fn error(&mut self, stage: Stage, message: String) {
        self.diagnostics.push(Diagnostic::error(stage, message));
    }

    fn warning(&mut self, stage: Stage, message: String) {
        self.diagnostics.push(Diagnostic::warning(stage, message));
    }
}
