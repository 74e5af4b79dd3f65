//! The 80-bit machine word and its instruction codec.
//!
//! A word is a 20-digit hexadecimal value. Instruction words pack five
//! fields, high bits first:
//!
//! | bits    | width | field                      |
//! |---------|-------|----------------------------|
//! | 79..=72 | 8     | opcode byte                |
//! | 71..=68 | 4     | first operand mode tag     |
//! | 67..=36 | 32    | first operand value        |
//! | 35..=32 | 4     | second operand mode tag    |
//! | 31..=0  | 32    | second operand value       |
//!
//! Operand values are two's-complement 32-bit integers. Data words carry
//! their payload in the first operand value field with every other field
//! zero, so a data word and a `nop` with an immediate operand share one
//! encoding.

use std::fmt;

use crate::fault::Fault;
use crate::isa::{Opcode, Operand};

const WORD_BITS: u32 = 80;
const WORD_MASK: u128 = (1 << WORD_BITS) - 1;
const HEX_DIGITS: usize = 20;

const OPCODE_SHIFT: u32 = 72;
const TAG1_SHIFT: u32 = 68;
const VAL1_SHIFT: u32 = 36;
const TAG2_SHIFT: u32 = 32;

const TAG_MASK: u128 = 0xF;
const VALUE_MASK: u128 = 0xFFFF_FFFF;

/// One 80-bit machine word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Word(u128);

/// A fully decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The operation.
    pub opcode: Opcode,
    /// First operand; the destination for two-operand forms.
    pub op1: Operand,
    /// Second operand; the source for two-operand forms.
    pub op2: Operand,
}

impl Word {
    /// Builds a word from raw bits; anything above bit 79 is discarded.
    #[must_use]
    pub const fn from_bits(bits: u128) -> Self {
        Self(bits & WORD_MASK)
    }

    /// Returns the raw 80-bit value.
    #[must_use]
    pub const fn bits(self) -> u128 {
        self.0
    }

    /// Parses a word from a 20-digit hexadecimal literal.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MalformedHex`] unless `text` is exactly 20
    /// hexadecimal digits.
    pub fn from_hex(text: &str) -> Result<Self, Fault> {
        if text.len() != HEX_DIGITS || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Fault::MalformedHex {
                text: text.to_owned(),
            });
        }
        let bits = u128::from_str_radix(text, 16).map_err(|_| Fault::MalformedHex {
            text: text.to_owned(),
        })?;
        Ok(Self(bits))
    }

    /// Builds a data word carrying `value` in the first operand value field.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_lossless)]
    pub const fn data(value: i32) -> Self {
        Self((value as u32 as u128) << VAL1_SHIFT)
    }

    /// Returns the payload of a data word.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn payload(self) -> i32 {
        ((self.0 >> VAL1_SHIFT) & VALUE_MASK) as u32 as i32
    }

    /// Encodes an instruction word.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_lossless)]
    pub const fn instruction(opcode: Opcode, op1: Operand, op2: Operand) -> Self {
        let bits = ((opcode.as_u8() as u128) << OPCODE_SHIFT)
            | ((op1.tag() as u128) << TAG1_SHIFT)
            | ((op1.raw_value() as u32 as u128) << VAL1_SHIFT)
            | ((op2.tag() as u128) << TAG2_SHIFT)
            | (op2.raw_value() as u32 as u128);
        Self(bits)
    }

    /// Decodes this word as an instruction.
    ///
    /// # Errors
    ///
    /// Returns a decode-class [`Fault`] for unknown opcode bytes, mode tags
    /// or register indices.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn decode(self) -> Result<Instruction, Fault> {
        let opcode = Opcode::from_u8(((self.0 >> OPCODE_SHIFT) & 0xFF) as u8)?;
        let op1 = Operand::from_tag(
            ((self.0 >> TAG1_SHIFT) & TAG_MASK) as u8,
            ((self.0 >> VAL1_SHIFT) & VALUE_MASK) as u32 as i32,
        )?;
        let op2 = Operand::from_tag(
            ((self.0 >> TAG2_SHIFT) & TAG_MASK) as u8,
            (self.0 & VALUE_MASK) as u32 as i32,
        )?;
        Ok(Instruction { opcode, op1, op2 })
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:020x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{Instruction, Word};
    use crate::fault::Fault;
    use crate::isa::{Opcode, Operand, Register, OPCODES};

    #[test]
    fn data_word_round_trips_payload() {
        assert_eq!(Word::data(5).to_string(), "00000000005000000000");
        assert_eq!(Word::data(5).payload(), 5);
        assert_eq!(Word::data(-1).payload(), -1);
        assert_eq!(Word::data(i32::MIN).payload(), i32::MIN);
    }

    #[test]
    fn encodes_register_immediate_add() {
        let word = Word::instruction(
            Opcode::Add,
            Operand::Register(Register::Rax),
            Operand::Immediate(5),
        );
        assert_eq!(word.to_string(), "01100000000000000005");
    }

    #[test]
    fn decode_round_trips_instruction() {
        let instruction = Instruction {
            opcode: Opcode::Mov,
            op1: Operand::Direct(42),
            op2: Operand::Immediate(-3),
        };
        let word = Word::instruction(instruction.opcode, instruction.op1, instruction.op2);
        assert_eq!(word.decode(), Ok(instruction));
    }

    #[test]
    fn from_hex_rejects_wrong_lengths() {
        assert!(matches!(
            Word::from_hex("0110"),
            Err(Fault::MalformedHex { .. })
        ));
        assert!(matches!(
            Word::from_hex("zz100000000000000005"),
            Err(Fault::MalformedHex { .. })
        ));
        assert_eq!(
            Word::from_hex("01100000000000000005").map(|w| w.to_string()),
            Ok("01100000000000000005".to_owned())
        );
    }

    #[test]
    fn decode_rejects_unknown_fields() {
        assert_eq!(
            Word::from_bits(0xFF << 72).decode(),
            Err(Fault::UnknownOpcode { opcode: 0xFF })
        );
        assert_eq!(
            Word::from_bits(0x7 << 68).decode(),
            Err(Fault::UnknownModeTag { tag: 7 })
        );
        // Register mode with index 9 in the first operand value field.
        assert_eq!(
            Word::from_bits((1 << 68) | (9 << 36)).decode(),
            Err(Fault::UnknownRegister { index: 9 })
        );
    }

    fn operand_strategy() -> impl Strategy<Value = Operand> {
        prop_oneof![
            any::<i32>().prop_map(Operand::Immediate),
            (0i32..6).prop_map(|i| Operand::Register(Register::from_index(i).unwrap())),
            any::<i32>().prop_map(Operand::Direct),
            any::<i32>().prop_map(Operand::Port),
            any::<i32>().prop_map(Operand::Indirect),
        ]
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(
            opcode_index in 0usize..OPCODES.len(),
            op1 in operand_strategy(),
            op2 in operand_strategy(),
        ) {
            let opcode = OPCODES[opcode_index];
            let word = Word::instruction(opcode, op1, op2);
            prop_assert_eq!(word.decode(), Ok(Instruction { opcode, op1, op2 }));
        }

        #[test]
        fn hex_round_trip(bits in any::<u128>()) {
            let word = Word::from_bits(bits);
            prop_assert_eq!(Word::from_hex(&word.to_string()), Ok(word));
        }
    }
}
