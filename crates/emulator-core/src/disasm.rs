//! Rendering decoded instructions back into assembly notation.

use std::fmt;

use crate::word::Instruction;

/// Wraps an [`Instruction`] for display in listing notation: the mnemonic
/// followed by as many operands as the instruction form carries.
#[derive(Debug, Clone, Copy)]
pub struct Disasm<'a>(pub &'a Instruction);

impl fmt::Display for Disasm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Instruction { opcode, op1, op2 } = self.0;
        match opcode.operand_count() {
            0 => write!(f, "{opcode}"),
            1 => write!(f, "{opcode} {op1}"),
            _ => write!(f, "{opcode} {op1} {op2}"),
        }
    }
}
