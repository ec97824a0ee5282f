use crate::{constants, Word};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive;
use util::EnumFromStr;
use util_derive::EnumFromStr;

/// Instruction set of the ECPU.
///
/// Every encoded instruction starts with one opcode word, followed by zero to
/// four extra words carrying the operands:
///
/// | Word        | Bits 9-6 | Bits 5-4 | Bits 3-2 | Bits 1-0 |
/// |-------------|----------|----------|----------|----------|
/// | opcode word | opcode   | src mode | dst mode | A/R/E    |
///
/// | Extra word      | Bits 9-2                    | Bits 1-0 |
/// |-----------------|-----------------------------|----------|
/// | immediate       | signed 8-bit value          | A/R/E    |
/// | symbol address  | 8-bit address               | A/R/E    |
/// | register(s)     | src/row in 9-6, dst/col 5-2 | A/R/E    |
///
/// An absent operand leaves its mode field saturated (`0b11`).
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, EnumFromStr)]
pub enum Opcode {
    //  Mnemonic | Operands  | Notes
    //-----------+-----------+---------------------------------------------
    MOV,  // | src, dst  | dst = src
    CMP,  // | src, dst  | compare, dst may also be immediate
    ADD,  // | src, dst  | dst += src
    SUB,  // | src, dst  | dst -= src
    LEA,  // | src, dst  | src must be addressable (no immediate/register)
    CLR,  // | dst       | dst = 0
    NOT,  // | dst       | dst = ~dst
    INC,  // | dst       | dst += 1
    DEC,  // | dst       | dst -= 1
    JMP,  // | dst       | jump
    BNE,  // | dst       | branch if not equal
    JSR,  // | dst       | jump to subroutine
    RED,  // | dst       | read a character into dst
    PRN,  // | dst       | print dst, immediate allowed
    RTS,  // |           | return from subroutine
    STOP, // |           | halt
}

impl Opcode {
    /// Addressing modes this opcode accepts for its source operand.
    /// An empty mask means the opcode takes no source operand.
    pub fn allowed_src(self) -> u8 {
        use crate::constants::*;

        match self {
            Opcode::MOV | Opcode::CMP | Opcode::ADD | Opcode::SUB => {
                MODE_MASK_IMMEDIATE | MODE_MASK_DIRECT | MODE_MASK_MATRIX | MODE_MASK_REGISTER
            }
            Opcode::LEA => MODE_MASK_DIRECT | MODE_MASK_MATRIX,
            _ => 0,
        }
    }

    /// Addressing modes this opcode accepts for its destination operand.
    pub fn allowed_dst(self) -> u8 {
        use crate::constants::*;

        match self {
            Opcode::CMP | Opcode::PRN => {
                MODE_MASK_IMMEDIATE | MODE_MASK_DIRECT | MODE_MASK_MATRIX | MODE_MASK_REGISTER
            }
            Opcode::RTS | Opcode::STOP => 0,
            _ => MODE_MASK_DIRECT | MODE_MASK_MATRIX | MODE_MASK_REGISTER,
        }
    }

    pub fn expects_src(self) -> bool {
        self.allowed_src() != 0
    }

    pub fn expects_dst(self) -> bool {
        self.allowed_dst() != 0
    }
}

/// The four operand addressing modes, in field-encoding order.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum AddressingMode {
    Immediate, // #n
    Direct,    // LABEL
    Matrix,    // LABEL[rX][rY]
    Register,  // r0..r7
}

impl AddressingMode {
    /// Bit for this mode in an opcode's allowed-mode mask.
    pub fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// A/R/E tag carried in the two low bits of every extra word.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum Are {
    Absolute,    // 00
    External,    // 01
    Relocatable, // 10
}

impl Are {
    pub fn bits(self) -> Word {
        self as Word
    }
}

/// The eight general-purpose registers.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, EnumFromStr)]
pub enum RegisterId {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

#[inline]
pub fn enum_to_word<T: ToPrimitive + Copy>(val: T) -> Word {
    val.to_u16().unwrap()
}

#[inline]
fn mode_field(mode: Option<AddressingMode>) -> Word {
    mode.map_or(constants::ADDR_MODE_NONE, enum_to_word)
}

/// Pack the opcode word. A/R/E stays absolute.
#[inline]
pub fn make_first_word(
    opcode: Opcode,
    src: Option<AddressingMode>,
    dst: Option<AddressingMode>,
) -> Word {
    ((enum_to_word(opcode) & constants::NIBBLE_MASK) << constants::OPCODE_OFFSET)
        | ((mode_field(src) & constants::ADDR_MODE_MASK) << constants::SRC_MODE_OFFSET)
        | ((mode_field(dst) & constants::ADDR_MODE_MASK) << constants::DST_MODE_OFFSET)
}

/// Extra word for an 8-bit signed immediate; the payload sits above the
/// A/R/E bits, which stay absolute.
#[inline]
pub fn make_immediate_word(value: i64) -> Word {
    ((value as Word) & constants::PAYLOAD_MASK) << constants::PAYLOAD_OFFSET
}

/// Extra word for a lone source register.
#[inline]
pub fn make_source_register_word(reg: RegisterId) -> Word {
    (enum_to_word(reg) & constants::NIBBLE_MASK) << constants::REG_SRC_OFFSET
}

/// Extra word for a lone destination register.
#[inline]
pub fn make_destination_register_word(reg: RegisterId) -> Word {
    (enum_to_word(reg) & constants::NIBBLE_MASK) << constants::REG_DST_OFFSET
}

/// Shared extra word for a register pair: source/destination when both
/// operands are registers, or row/column for matrix indices.
#[inline]
pub fn make_register_pair_word(high: RegisterId, low: RegisterId) -> Word {
    make_source_register_word(high) | make_destination_register_word(low)
}

/// Extra word carrying a resolved symbol address and its A/R/E tag.
#[inline]
pub fn make_symbol_word(address: Word, are: Are) -> Word {
    ((address & constants::PAYLOAD_MASK) << constants::PAYLOAD_OFFSET) | are.bits()
}

/// Words occupied by an instruction with the given operand modes: one opcode
/// word, one extra word per operand, except that two register operands share
/// a single word and a matrix operand takes two.
pub fn instruction_length(src: Option<AddressingMode>, dst: Option<AddressingMode>) -> Word {
    if let (Some(AddressingMode::Register), Some(AddressingMode::Register)) = (src, dst) {
        return 2;
    }

    let operand_words = |mode: Option<AddressingMode>| match mode {
        None => 0,
        Some(AddressingMode::Matrix) => 2,
        Some(_) => 1,
    };

    1 + operand_words(src) + operand_words(dst)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opcode_from_mnemonic() {
        assert_eq!("mov".parse::<Opcode>(), Ok(Opcode::MOV));
        assert_eq!("stop".parse::<Opcode>(), Ok(Opcode::STOP));
        assert!("MOV".parse::<Opcode>().is_err());
        assert!("movx".parse::<Opcode>().is_err());
    }

    #[test]
    fn opcode_numbering() {
        assert_eq!(enum_to_word(Opcode::MOV), 0);
        assert_eq!(enum_to_word(Opcode::LEA), 4);
        assert_eq!(enum_to_word(Opcode::PRN), 13);
        assert_eq!(enum_to_word(Opcode::STOP), 15);
    }

    #[test]
    fn register_from_name() {
        assert_eq!("r0".parse::<RegisterId>(), Ok(RegisterId::R0));
        assert_eq!("r7".parse::<RegisterId>(), Ok(RegisterId::R7));
        assert!("r8".parse::<RegisterId>().is_err());
        assert!("R3".parse::<RegisterId>().is_err());
        assert!("r".parse::<RegisterId>().is_err());
    }

    #[test]
    fn lea_source_modes() {
        let mask = Opcode::LEA.allowed_src();
        assert_eq!(mask & AddressingMode::Immediate.mask(), 0);
        assert_eq!(mask & AddressingMode::Register.mask(), 0);
        assert_ne!(mask & AddressingMode::Direct.mask(), 0);
        assert_ne!(mask & AddressingMode::Matrix.mask(), 0);
    }

    #[test]
    fn operand_expectations() {
        assert!(Opcode::MOV.expects_src() && Opcode::MOV.expects_dst());
        assert!(!Opcode::CLR.expects_src() && Opcode::CLR.expects_dst());
        assert!(!Opcode::STOP.expects_src() && !Opcode::STOP.expects_dst());
        assert_ne!(
            Opcode::PRN.allowed_dst() & AddressingMode::Immediate.mask(),
            0
        );
    }

    #[test]
    fn first_word_two_operands() {
        let word = make_first_word(
            Opcode::MOV,
            Some(AddressingMode::Immediate),
            Some(AddressingMode::Register),
        );
        assert_eq!(word, 0b0000_00_11_00);
    }

    #[test]
    fn first_word_matrix_source() {
        let word = make_first_word(
            Opcode::MOV,
            Some(AddressingMode::Matrix),
            Some(AddressingMode::Register),
        );
        assert_eq!(word, 0b0000_10_11_00);
    }

    #[test]
    fn first_word_absent_operands_saturate() {
        assert_eq!(make_first_word(Opcode::STOP, None, None), 0b1111_11_11_00);
        assert_eq!(
            make_first_word(Opcode::JMP, None, Some(AddressingMode::Direct)),
            0b1001_11_01_00
        );
    }

    #[test]
    fn immediate_word_truncates_to_payload() {
        assert_eq!(make_immediate_word(-1), 0b11111111_00);
        assert_eq!(make_immediate_word(5), 0b00000101_00);
        assert_eq!(make_immediate_word(-128), 0b10000000_00);
    }

    #[test]
    fn register_words() {
        assert_eq!(make_source_register_word(RegisterId::R3), 0b0011_0000_00);
        assert_eq!(make_destination_register_word(RegisterId::R3), 0b0000_0011_00);
        assert_eq!(
            make_register_pair_word(RegisterId::R1, RegisterId::R2),
            0b0001_0010_00
        );
    }

    #[test]
    fn symbol_words() {
        assert_eq!(make_symbol_word(130, Are::Relocatable), (130 << 2) | 0b10);
        assert_eq!(make_symbol_word(0, Are::External), 0b01);
        // the payload keeps only its low eight bits
        assert_eq!(make_symbol_word(0x1FF, Are::Relocatable), (0xFF << 2) | 0b10);
    }

    #[test]
    fn lengths() {
        use AddressingMode::*;

        assert_eq!(instruction_length(None, None), 1);
        assert_eq!(instruction_length(None, Some(Direct)), 2);
        assert_eq!(instruction_length(Some(Register), Some(Register)), 2);
        assert_eq!(instruction_length(Some(Immediate), Some(Register)), 3);
        assert_eq!(instruction_length(Some(Matrix), Some(Register)), 4);
        assert_eq!(instruction_length(Some(Matrix), Some(Matrix)), 5);
    }
}
