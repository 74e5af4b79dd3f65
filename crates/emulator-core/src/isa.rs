//! Instruction-set definitions: opcodes, the register file, operands.

use std::fmt;

use crate::fault::Fault;

/// Exclusive upper bound of the signed 32-bit value range, as a wide integer.
pub const WORD_VALUE_LIMIT: i64 = 1 << 31;

/// Machine opcodes, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Opcode {
    /// No operation.
    Nop,
    /// Signed addition.
    Add,
    /// Signed subtraction.
    Sub,
    /// Signed multiplication.
    Mul,
    /// Flooring signed division.
    Div,
    /// Flooring signed modulo.
    Mod,
    /// Bitwise exclusive or.
    Xor,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Subtraction for flags only, result discarded.
    Cmp,
    /// Data move between registers and memory.
    Mov,
    /// Read one token from an input port.
    Movi,
    /// Write one character to an output port.
    Movo,
    /// Unconditional jump.
    Jmp,
    /// Jump if the zero flag is set.
    Jz,
    /// Jump if the zero flag is clear.
    Jnz,
    /// Jump if the negative flag is set.
    Jn,
    /// Jump if the negative flag is clear.
    Jp,
    /// Return from an interrupt handler.
    Iret,
    /// Disable interrupts.
    Di,
    /// Enable interrupts.
    Ei,
    /// Stop the machine.
    Hlt,
}

/// All opcodes in encoding order, for exhaustive iteration in tests and
/// mnemonic lookup in the assembler.
pub const OPCODES: [Opcode; 22] = [
    Opcode::Nop,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Mod,
    Opcode::Xor,
    Opcode::And,
    Opcode::Or,
    Opcode::Cmp,
    Opcode::Mov,
    Opcode::Movi,
    Opcode::Movo,
    Opcode::Jmp,
    Opcode::Jz,
    Opcode::Jnz,
    Opcode::Jn,
    Opcode::Jp,
    Opcode::Iret,
    Opcode::Di,
    Opcode::Ei,
    Opcode::Hlt,
];

impl Opcode {
    /// Decodes an opcode byte.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownOpcode`] for bytes past the defined set.
    pub fn from_u8(byte: u8) -> Result<Self, Fault> {
        OPCODES
            .get(usize::from(byte))
            .copied()
            .ok_or(Fault::UnknownOpcode { opcode: byte })
    }

    /// Returns the encoding byte for this opcode.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Xor => "xor",
            Self::And => "and",
            Self::Or => "or",
            Self::Cmp => "cmp",
            Self::Mov => "mov",
            Self::Movi => "movi",
            Self::Movo => "movo",
            Self::Jmp => "jmp",
            Self::Jz => "jz",
            Self::Jnz => "jnz",
            Self::Jn => "jn",
            Self::Jp => "jp",
            Self::Iret => "iret",
            Self::Di => "di",
            Self::Ei => "ei",
            Self::Hlt => "hlt",
        }
    }

    /// Looks an opcode up by mnemonic.
    #[must_use]
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        OPCODES.into_iter().find(|op| op.mnemonic() == text)
    }

    /// Whether this opcode routes through the ALU.
    #[must_use]
    pub const fn is_alu(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::Sub
                | Self::Mul
                | Self::Div
                | Self::Mod
                | Self::Xor
                | Self::And
                | Self::Or
                | Self::Cmp
        )
    }

    /// Whether this opcode is a control-flow transfer.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(self, Self::Jmp | Self::Jz | Self::Jnz | Self::Jn | Self::Jp)
    }

    /// How many operands the instruction form carries.
    #[must_use]
    pub const fn operand_count(self) -> usize {
        match self {
            Self::Nop | Self::Iret | Self::Di | Self::Ei | Self::Hlt => 0,
            Self::Jmp | Self::Jz | Self::Jnz | Self::Jn | Self::Jp => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// The six architectural registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Register {
    /// Accumulator.
    Rax,
    /// General purpose.
    Rbx,
    /// General purpose.
    Rdx,
    /// Instruction pointer.
    Rip,
    /// Machine status: bit 0 interrupts enabled, bit 1 interrupt request.
    Rst,
    /// Stack pointer, grows downward.
    Rsp,
}

/// Registers in index order.
pub const REGISTERS: [Register; 6] = [
    Register::Rax,
    Register::Rbx,
    Register::Rdx,
    Register::Rip,
    Register::Rst,
    Register::Rsp,
];

impl Register {
    /// Decodes a register file index.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownRegister`] when `index` is outside `0..=5`.
    pub fn from_index(index: i32) -> Result<Self, Fault> {
        usize::try_from(index)
            .ok()
            .and_then(|i| REGISTERS.get(i).copied())
            .ok_or(Fault::UnknownRegister { index })
    }

    /// Returns the register file index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Looks a register up by name, without the `%` sigil.
    #[must_use]
    pub fn from_name(text: &str) -> Option<Self> {
        REGISTERS.into_iter().find(|reg| reg.name() == text)
    }

    /// Returns the register name, without the `%` sigil.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rax => "rax",
            Self::Rbx => "rbx",
            Self::Rdx => "rdx",
            Self::Rip => "rip",
            Self::Rst => "rst",
            Self::Rsp => "rsp",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded instruction operand: the addressing mode plus its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Operand {
    /// A literal value, tag 0.
    Immediate(i32),
    /// A register, tag 1, rendered `%name`.
    Register(Register),
    /// A memory cell, tag 2, rendered `#address`.
    Direct(i32),
    /// An I/O port, tag 3, rendered `!index`.
    Port(i32),
    /// A memory cell holding the address of another cell, tag 4,
    /// rendered `*address`.
    Indirect(i32),
}

impl Operand {
    /// Decodes an operand from its mode tag and raw value.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownModeTag`] for tags past the defined set and
    /// [`Fault::UnknownRegister`] for register operands with a bad index.
    pub fn from_tag(tag: u8, value: i32) -> Result<Self, Fault> {
        match tag {
            0 => Ok(Self::Immediate(value)),
            1 => Ok(Self::Register(Register::from_index(value)?)),
            2 => Ok(Self::Direct(value)),
            3 => Ok(Self::Port(value)),
            4 => Ok(Self::Indirect(value)),
            _ => Err(Fault::UnknownModeTag { tag }),
        }
    }

    /// Returns the 4-bit encoding tag.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Immediate(_) => 0,
            Self::Register(_) => 1,
            Self::Direct(_) => 2,
            Self::Port(_) => 3,
            Self::Indirect(_) => 4,
        }
    }

    /// Returns the raw 32-bit value field.
    #[must_use]
    pub const fn raw_value(self) -> i32 {
        match self {
            Self::Immediate(v) | Self::Direct(v) | Self::Port(v) | Self::Indirect(v) => v,
            #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
            Self::Register(reg) => reg.index() as i32,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(v) => write!(f, "{v}"),
            Self::Register(reg) => write!(f, "%{reg}"),
            Self::Direct(v) => write!(f, "#{v}"),
            Self::Port(v) => write!(f, "!{v}"),
            Self::Indirect(v) => write!(f, "*{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Opcode, Operand, Register, OPCODES, REGISTERS};
    use crate::fault::Fault;

    #[test]
    fn opcode_bytes_round_trip() {
        for (index, opcode) in OPCODES.into_iter().enumerate() {
            assert_eq!(usize::from(opcode.as_u8()), index);
            assert_eq!(Opcode::from_u8(opcode.as_u8()), Ok(opcode));
            assert_eq!(Opcode::from_mnemonic(opcode.mnemonic()), Some(opcode));
        }
    }

    #[test]
    fn opcode_byte_past_table_is_rejected() {
        assert_eq!(Opcode::from_u8(22), Err(Fault::UnknownOpcode { opcode: 22 }));
    }

    #[rstest]
    #[case(Opcode::Hlt, 0)]
    #[case(Opcode::Iret, 0)]
    #[case(Opcode::Jz, 1)]
    #[case(Opcode::Cmp, 2)]
    #[case(Opcode::Movo, 2)]
    fn operand_counts(#[case] opcode: Opcode, #[case] count: usize) {
        assert_eq!(opcode.operand_count(), count);
    }

    #[test]
    fn register_indices_round_trip() {
        for (index, register) in REGISTERS.into_iter().enumerate() {
            assert_eq!(register.index(), index);
            assert_eq!(
                Register::from_index(i32::try_from(index).unwrap()),
                Ok(register)
            );
            assert_eq!(Register::from_name(register.name()), Some(register));
        }
        assert_eq!(
            Register::from_index(6),
            Err(Fault::UnknownRegister { index: 6 })
        );
        assert_eq!(
            Register::from_index(-1),
            Err(Fault::UnknownRegister { index: -1 })
        );
    }

    #[rstest]
    #[case(Operand::Immediate(-7), "-7")]
    #[case(Operand::Register(Register::Rax), "%rax")]
    #[case(Operand::Direct(12), "#12")]
    #[case(Operand::Port(0), "!0")]
    #[case(Operand::Indirect(3), "*3")]
    fn operand_rendering(#[case] operand: Operand, #[case] text: &str) {
        assert_eq!(operand.to_string(), text);
    }

    #[test]
    fn operand_tag_round_trip() {
        for operand in [
            Operand::Immediate(5),
            Operand::Register(Register::Rsp),
            Operand::Direct(100),
            Operand::Port(1),
            Operand::Indirect(2),
        ] {
            assert_eq!(
                Operand::from_tag(operand.tag(), operand.raw_value()),
                Ok(operand)
            );
        }
        assert_eq!(Operand::from_tag(5, 0), Err(Fault::UnknownModeTag { tag: 5 }));
    }
}
