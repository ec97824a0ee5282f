//! The second pass: walk the recorded commands, resolve every symbolic
//! operand against the symbol table, patch addresses and A/R/E tags into the
//! placeholder words, and build the output files in memory.

use crate::directives::Directive;
use crate::first_pass::FirstPass;
use crate::image::CodeImage;
use crate::operands::{parse_matrix, Operand};
use crate::symbols::{SymbolKind, SymbolTable};
use crate::{Diagnostic, Stage};
use ecpu::constants::IC_INIT;
use ecpu::{make_symbol_word, Are, Word};
use obfile::{ObjectFile, SymbolRef};

/// The in-memory result of a successful assembly. The driver turns this into
/// the `.ob` file, plus `.ent`/`.ext` when their lists are non-empty.
#[derive(Debug)]
pub struct Assembly {
    pub object: ObjectFile,
    pub entries: Vec<SymbolRef>,
    /// One entry per external reference site, in code order.
    pub externals: Vec<SymbolRef>,
    pub warnings: Vec<Diagnostic>,
}

pub fn run(first: &mut FirstPass) -> (Assembly, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut externals = Vec::new();

    resolve_symbols(first, &mut externals, &mut diagnostics);
    let entries = collect_entries(first, &mut diagnostics);

    let data = first
        .directives
        .iter()
        .flat_map(|directive| directive.data_words().iter().copied())
        .collect();
    let object = ObjectFile::from(first.image.code_words(first.icf).to_vec(), data);

    (
        Assembly {
            object,
            entries,
            externals,
            warnings: Vec::new(),
        },
        diagnostics,
    )
}

fn resolve_symbols(
    first: &mut FirstPass,
    externals: &mut Vec<SymbolRef>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let FirstPass {
        ref mut image,
        ref symbols,
        ref commands,
        ..
    } = *first;

    for command in commands {
        let src = command.src.as_deref().map(Operand::classify);
        let dst = command.dst.as_deref().map(Operand::classify);

        // the first extra word sits right after the opcode word
        let mut index = (command.address - IC_INIT + 1) as usize;

        // two registers share one packed word, already absolute
        if let (Some(Operand::Register(_)), Some(Operand::Register(_))) = (src, dst) {
            image.mark_absolute(index);
            continue;
        }

        for operand in src.into_iter().chain(dst) {
            resolve_operand(operand, &mut index, image, symbols, externals, diagnostics);
        }
    }
}

fn resolve_operand(
    operand: Operand<'_>,
    index: &mut usize,
    image: &mut CodeImage,
    symbols: &SymbolTable,
    externals: &mut Vec<SymbolRef>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match operand {
        Operand::Immediate(_) | Operand::Register(_) => {
            image.mark_absolute(*index);
            *index += 1;
        }
        Operand::Direct(name) => {
            resolve_direct(name, *index, image, symbols, externals, diagnostics);
            *index += 1;
        }
        Operand::Matrix(text) => {
            match parse_matrix(text) {
                Some(matrix) => {
                    resolve_direct(matrix.label, *index, image, symbols, externals, diagnostics)
                }
                None => diagnostics.push(Diagnostic::error(
                    Stage::SecondPass,
                    format!("invalid matrix operand '{}'", text),
                )),
            }
            *index += 1;
            // the register-pair word carries no symbol
            image.mark_absolute(*index);
            *index += 1;
        }
    }
}

fn resolve_direct(
    name: &str,
    index: usize,
    image: &mut CodeImage,
    symbols: &SymbolTable,
    externals: &mut Vec<SymbolRef>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let symbol = match symbols.find(name) {
        Some(symbol) => symbol,
        None => {
            diagnostics.push(Diagnostic::error(
                Stage::SecondPass,
                format!("undefined symbol '{}'", name),
            ));
            image.set(index, 0);
            return;
        }
    };

    if symbol.kind == SymbolKind::External {
        // the linker fills the payload; record where it has to
        image.set(index, Are::External.bits());
        externals.push(SymbolRef {
            name: name.to_owned(),
            address: IC_INIT + index as Word,
        });
    } else {
        image.set(index, make_symbol_word(symbol.address, Are::Relocatable));
    }
}

fn collect_entries(first: &FirstPass, diagnostics: &mut Vec<Diagnostic>) -> Vec<SymbolRef> {
    let mut entries = Vec::new();

    for directive in &first.directives {
        let name = match directive {
            Directive::Entry { name } => name,
            _ => continue,
        };

        match first.symbols.find(name) {
            None => diagnostics.push(Diagnostic::error(
                Stage::SecondPass,
                format!("entry symbol '{}' not found", name),
            )),
            Some(symbol) if symbol.kind == SymbolKind::External => {
                diagnostics.push(Diagnostic::error(
                    Stage::SecondPass,
                    format!("entry symbol '{}' is declared as external", name),
                ))
            }
            Some(symbol) => entries.push(SymbolRef {
                name: name.clone(),
                address: symbol.address,
            }),
        }
    }

    entries
}
