use std::{error::Error, fmt};

/// Error returned when a source token does not name any variant of an enum.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Failed to parse \"{}\" as {}.",
            &self.value, &self.enum_name
        )
    }
}

impl Error for ParseEnumError {}

/// Parse an enum from the spelling used in assembly source text.
///
/// Derivable with `util_derive::EnumFromStr`, which matches the lowercase
/// variant name (mnemonics and register names are lowercase in source).
pub trait EnumFromStr: Sized {
    fn from_str(s: &str) -> Result<Self, ParseEnumError>;
}
