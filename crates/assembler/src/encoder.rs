//! Instruction encoding against the emulator's opcode tables.

use emulator_core::{Opcode, Operand, Word};

/// Error during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeError {
    /// Kind of error.
    pub kind: EncodeErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Classification of encoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// No opcode with this mnemonic.
    UnknownMnemonic(String),
    /// Operand count not matching the instruction form.
    OperandCount {
        /// The mnemonic.
        mnemonic: String,
        /// Operands the form takes.
        expected: usize,
        /// Operands written.
        found: usize,
    },
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownMnemonic(text) => write!(f, "unknown mnemonic: {text}"),
            Self::OperandCount {
                mnemonic,
                expected,
                found,
            } => write!(
                f,
                "{mnemonic} takes {expected} operand(s), found {found}"
            ),
        }
    }
}

/// Encodes one resolved statement into a machine word. Missing operand
/// slots are packed as immediate zero.
///
/// # Errors
///
/// Returns an [`EncodeError`] for unknown mnemonics or an operand count
/// the instruction form does not take.
pub fn encode(mnemonic: &str, operands: &[Operand], line: usize) -> Result<Word, EncodeError> {
    let Some(opcode) = Opcode::from_mnemonic(mnemonic) else {
        return Err(EncodeError {
            kind: EncodeErrorKind::UnknownMnemonic(mnemonic.to_owned()),
            line,
        });
    };
    if operands.len() != opcode.operand_count() {
        return Err(EncodeError {
            kind: EncodeErrorKind::OperandCount {
                mnemonic: mnemonic.to_owned(),
                expected: opcode.operand_count(),
                found: operands.len(),
            },
            line,
        });
    }
    let op1 = operands.first().copied().unwrap_or(Operand::Immediate(0));
    let op2 = operands.get(1).copied().unwrap_or(Operand::Immediate(0));
    Ok(Word::instruction(opcode, op1, op2))
}

#[cfg(test)]
mod tests {
    use emulator_core::{Operand, Register};

    use super::{encode, EncodeErrorKind};

    #[test]
    fn encodes_known_golden_word() {
        let word = encode(
            "add",
            &[Operand::Register(Register::Rax), Operand::Immediate(5)],
            1,
        )
        .unwrap();
        assert_eq!(word.to_string(), "01100000000000000005");
    }

    #[test]
    fn zero_operand_forms_pack_zero_fields() {
        assert_eq!(
            encode("hlt", &[], 1).unwrap().to_string(),
            "15000000000000000000"
        );
    }

    #[test]
    fn unknown_mnemonic_is_rejected() {
        assert_eq!(
            encode("frob", &[], 4).unwrap_err().kind,
            EncodeErrorKind::UnknownMnemonic("frob".to_owned())
        );
    }

    #[test]
    fn operand_count_is_checked() {
        let error = encode("jmp", &[], 2).unwrap_err();
        assert_eq!(
            error.kind,
            EncodeErrorKind::OperandCount {
                mnemonic: "jmp".to_owned(),
                expected: 1,
                found: 0
            }
        );
        assert_eq!(error.line, 2);
    }
}
