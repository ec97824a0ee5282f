//! The per-file symbol table: an append-only map from label name to address
//! and kind, with the name rules shared by labels and macro names.

use ecpu::constants::MAX_LABEL_LENGTH;
use ecpu::{Opcode, RegisterId, Word};
use std::collections::HashMap;
use std::fmt;

const DIRECTIVE_NAMES: [&str; 5] = ["data", "string", "mat", "extern", "entry"];
const MACRO_KEYWORDS: [&str; 2] = ["mcro", "mcroend"];

/// True for every word the language claims for itself: the sixteen opcode
/// mnemonics, the register names, the directive names without their dot, and
/// the macro keywords.
pub fn is_reserved(name: &str) -> bool {
    name.parse::<Opcode>().is_ok()
        || name.parse::<RegisterId>().is_ok()
        || DIRECTIVE_NAMES.contains(&name)
        || MACRO_KEYWORDS.contains(&name)
}

/// Names start with an ASCII letter and continue with letters and digits.
pub fn is_legal_name(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }

    chars.all(|ch| ch.is_ascii_alphanumeric())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SymbolKind {
    Code,
    Data,
    External,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Symbol {
    pub address: Word,
    pub kind: SymbolKind,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SymbolError {
    IllegalName(String),
    TooLong(String),
    Reserved(String),
    DefinedAsExternal(String),
    DuplicateExtern(String),
    Duplicate(String),
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SymbolError::IllegalName(name) => {
                write!(f, "'{}' is not a legal symbol name", name)
            }
            SymbolError::TooLong(name) => write!(
                f,
                "symbol name '{}' is too long, names are limited to {} characters",
                name, MAX_LABEL_LENGTH
            ),
            SymbolError::Reserved(name) => {
                write!(f, "'{}' is a reserved word and cannot name a symbol", name)
            }
            SymbolError::DefinedAsExternal(name) => write!(
                f,
                "symbol '{}' was declared as external and cannot be defined in this file",
                name
            ),
            SymbolError::DuplicateExtern(name) => {
                write!(f, "duplicate extern declaration for symbol '{}'", name)
            }
            SymbolError::Duplicate(name) => {
                write!(f, "duplicate declaration for symbol '{}'", name)
            }
        }
    }
}

impl std::error::Error for SymbolError {}

#[derive(Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Define a symbol. Symbols never move once inserted; redefinition is an
    /// error, with extern/extern and extern/local conflicts called out
    /// separately.
    pub fn add(&mut self, name: &str, address: Word, kind: SymbolKind) -> Result<(), SymbolError> {
        if name.chars().count() > MAX_LABEL_LENGTH {
            return Err(SymbolError::TooLong(name.to_owned()));
        }
        if !is_legal_name(name) {
            return Err(SymbolError::IllegalName(name.to_owned()));
        }
        if is_reserved(name) {
            return Err(SymbolError::Reserved(name.to_owned()));
        }

        if let Some(existing) = self.symbols.get(name) {
            let error = match (existing.kind, kind) {
                (SymbolKind::External, SymbolKind::External) => SymbolError::DuplicateExtern,
                (SymbolKind::External, _) => SymbolError::DefinedAsExternal,
                _ => SymbolError::Duplicate,
            };
            return Err(error(name.to_owned()));
        }

        self.symbols.insert(name.to_owned(), Symbol { address, kind });
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Move every data symbol behind the code segment by adding the final
    /// instruction counter to its address.
    pub fn relocate_data(&mut self, icf: Word) {
        for symbol in self.symbols.values_mut() {
            if symbol.kind == SymbolKind::Data {
                symbol.address = symbol.address.saturating_add(icf);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use matches::assert_matches;

    #[test]
    fn add_and_find() {
        let mut table = SymbolTable::new();
        table.add("MAIN", 100, SymbolKind::Code).unwrap();

        assert_eq!(
            table.find("MAIN"),
            Some(&Symbol {
                address: 100,
                kind: SymbolKind::Code
            })
        );
        assert_eq!(table.find("OTHER"), None);
    }

    #[test]
    fn rejects_bad_names() {
        let mut table = SymbolTable::new();

        assert_matches!(
            table.add("1BAD", 0, SymbolKind::Code),
            Err(SymbolError::IllegalName(_))
        );
        assert_matches!(
            table.add("BA-D", 0, SymbolKind::Code),
            Err(SymbolError::IllegalName(_))
        );
        assert_matches!(table.add("", 0, SymbolKind::Code), Err(SymbolError::IllegalName(_)));
        assert_matches!(
            table.add("mov", 0, SymbolKind::Code),
            Err(SymbolError::Reserved(_))
        );
        assert_matches!(
            table.add("r3", 0, SymbolKind::Code),
            Err(SymbolError::Reserved(_))
        );
        assert_matches!(
            table.add("mcroend", 0, SymbolKind::Code),
            Err(SymbolError::Reserved(_))
        );
        assert_matches!(
            table.add(&"A".repeat(31), 0, SymbolKind::Code),
            Err(SymbolError::TooLong(_))
        );
        assert!(table.add(&"A".repeat(30), 0, SymbolKind::Code).is_ok());
    }

    #[test]
    fn conflict_kinds_are_distinguished() {
        let mut table = SymbolTable::new();
        table.add("X", 0, SymbolKind::External).unwrap();
        table.add("Y", 104, SymbolKind::Data).unwrap();

        assert_matches!(
            table.add("X", 0, SymbolKind::External),
            Err(SymbolError::DuplicateExtern(_))
        );
        assert_matches!(
            table.add("X", 120, SymbolKind::Code),
            Err(SymbolError::DefinedAsExternal(_))
        );
        assert_matches!(
            table.add("Y", 7, SymbolKind::Data),
            Err(SymbolError::Duplicate(_))
        );
    }

    #[test]
    fn relocation_only_moves_data() {
        let mut table = SymbolTable::new();
        table.add("C", 100, SymbolKind::Code).unwrap();
        table.add("D", 3, SymbolKind::Data).unwrap();
        table.add("E", 0, SymbolKind::External).unwrap();

        table.relocate_data(104);

        assert_eq!(table.find("C").unwrap().address, 100);
        assert_eq!(table.find("D").unwrap().address, 107);
        assert_eq!(table.find("E").unwrap().address, 0);
    }

    #[test]
    fn register_like_names_past_r7_are_fine() {
        assert!(!is_reserved("r8"));
        assert!(is_reserved("r0"));
        assert!(is_reserved("entry"));
        assert!(is_legal_name("r8"));
    }
}
