//! The three text files emitted per assembled source: the object file
//! (`.ob`), the entry symbols (`.ent`), and the external references (`.ext`).
//!
//! An object file holds one `<address> <word>` line per occupied memory word,
//! both fields spelled as five base-4 letters. Code words come first, starting
//! at address 100, immediately followed by the data words. Entry and external
//! files hold `<label> <address>` lines.

use ecpu::constants::IC_INIT;
use ecpu::encoding::to_base4_letters;
use ecpu::Word;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// The fully assembled memory image: code segment, then data segment.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectFile {
    code: Vec<Word>,
    data: Vec<Word>,
}

impl ObjectFile {
    pub fn from(code: Vec<Word>, data: Vec<Word>) -> ObjectFile {
        ObjectFile { code, data }
    }

    pub fn code(&self) -> &[Word] {
        &self.code[..]
    }

    pub fn data(&self) -> &[Word] {
        &self.data[..]
    }
}

/// One `<label> <address>` line of an entries or externals file.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolRef {
    pub name: String,
    pub address: Word,
}

pub fn write<W: Write>(writer: &mut W, object: &ObjectFile) -> std::io::Result<()> {
    for (offset, word) in object.code.iter().enumerate() {
        writeln!(
            writer,
            "{} {}",
            to_base4_letters(IC_INIT + offset as Word),
            to_base4_letters(*word)
        )?;
    }

    let data_base = IC_INIT + object.code.len() as Word;
    for (offset, word) in object.data.iter().enumerate() {
        writeln!(
            writer,
            "{} {}",
            to_base4_letters(data_base + offset as Word),
            to_base4_letters(*word)
        )?;
    }

    Ok(())
}

pub fn write_refs<W: Write>(writer: &mut W, refs: &[SymbolRef]) -> std::io::Result<()> {
    for reference in refs {
        writeln!(
            writer,
            "{} {}",
            reference.name,
            to_base4_letters(reference.address)
        )?;
    }

    Ok(())
}

pub trait WriteObExt: Write + Sized {
    fn write_object(&mut self, object: &ObjectFile) -> std::io::Result<()> {
        write(self, object)
    }

    fn write_symbol_refs(&mut self, refs: &[SymbolRef]) -> std::io::Result<()> {
        write_refs(self, refs)
    }
}

impl<W: Write + Sized> WriteObExt for W {}

pub fn write_file<P: AsRef<Path>>(path: P, object: &ObjectFile) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_object(object)?;
    writer.flush()
}

pub fn write_refs_file<P: AsRef<Path>>(path: P, refs: &[SymbolRef]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_symbol_refs(refs)?;
    writer.flush()
}
