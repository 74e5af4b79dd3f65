use thiserror::Error;

use crate::isa::Operand;

/// Fault classes used for diagnostics aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Word codec rejected an instruction encoding.
    Decode,
    /// Memory addressing violation on the datapath.
    Memory,
    /// Operand is not usable in the requested role.
    Operand,
    /// I/O port contract violation.
    Port,
    /// Arithmetic condition with no defined result.
    Arithmetic,
    /// Program image or listing could not be loaded.
    Loader,
}

/// Fatal simulation faults.
///
/// A fault aborts the run unconditionally. The expected end-of-run
/// conditions (halt, exhausted input, instruction limit) are *not* faults;
/// they are [`crate::StopReason`] values and keep the accumulated output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// The opcode byte of a word does not map to a known mnemonic.
    #[error("malformed word: unknown opcode {opcode:#04x}")]
    UnknownOpcode {
        /// Raw opcode byte from the word.
        opcode: u8,
    },
    /// An addressing-mode tag of a word is outside the defined set.
    #[error("malformed word: unknown addressing-mode tag {tag:#03x}")]
    UnknownModeTag {
        /// Raw 4-bit tag from the word.
        tag: u8,
    },
    /// A register-mode operand names a register outside the register file.
    #[error("malformed word: no register with index {index}")]
    UnknownRegister {
        /// Raw operand value interpreted as a register index.
        index: i32,
    },
    /// A word literal is not exactly 20 hexadecimal digits.
    #[error("malformed word: {text:?} is not a 20-digit hex literal")]
    MalformedHex {
        /// The offending literal.
        text: String,
    },
    /// A listing line could not be parsed back into a word.
    #[error("malformed listing line {line}: {reason}")]
    MalformedListing {
        /// 1-indexed listing line number.
        line: usize,
        /// Why the line was rejected.
        reason: String,
    },
    /// A memory access resolved to an address outside the address space.
    #[error("address {address} outside memory of {size} words")]
    AddressOutOfRange {
        /// The resolved address (may be negative).
        address: i64,
        /// Configured memory size in words.
        size: usize,
    },
    /// An operand mode cannot serve as a write destination.
    #[error("operand {0} is not a valid write target")]
    InvalidWriteTarget(Operand),
    /// An operand mode cannot be resolved to a value through the datapath.
    #[error("operand {0} cannot be resolved to a value")]
    InvalidOperand(Operand),
    /// A port instruction was given a non-port operand.
    #[error("operand {0} where a port index was expected")]
    PortOperandExpected(Operand),
    /// A port index that no device is attached to.
    #[error("no device on port {port}")]
    UnknownPort {
        /// The raw port index.
        port: i32,
    },
    /// Division or modulo with a zero right operand.
    #[error("division by zero")]
    DivideByZero,
    /// A value sent to the output port is not a valid character code point.
    #[error("value {value} is not a character code point")]
    InvalidCodePoint {
        /// The rejected value.
        value: i32,
    },
    /// The program image does not fit strictly inside configured memory.
    #[error("program of {words} words does not fit in {memory}-word memory")]
    ProgramTooLarge {
        /// Image length in words.
        words: usize,
        /// Configured memory size in words.
        memory: usize,
    },
}

impl Fault {
    /// Returns the diagnostics class for this fault.
    #[must_use]
    pub const fn class(&self) -> FaultClass {
        match self {
            Self::UnknownOpcode { .. }
            | Self::UnknownModeTag { .. }
            | Self::UnknownRegister { .. }
            | Self::MalformedHex { .. } => FaultClass::Decode,
            Self::MalformedListing { .. } | Self::ProgramTooLarge { .. } => FaultClass::Loader,
            Self::AddressOutOfRange { .. } => FaultClass::Memory,
            Self::InvalidWriteTarget(_) | Self::InvalidOperand(_) | Self::PortOperandExpected(_) => {
                FaultClass::Operand
            }
            Self::UnknownPort { .. } | Self::InvalidCodePoint { .. } => FaultClass::Port,
            Self::DivideByZero => FaultClass::Arithmetic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Fault, FaultClass};
    use crate::isa::Operand;

    #[test]
    fn class_mapping_matches_fault_taxonomy() {
        assert_eq!(
            Fault::UnknownOpcode { opcode: 0xFF }.class(),
            FaultClass::Decode
        );
        assert_eq!(
            Fault::AddressOutOfRange {
                address: -1,
                size: 2048
            }
            .class(),
            FaultClass::Memory
        );
        assert_eq!(
            Fault::InvalidWriteTarget(Operand::Immediate(3)).class(),
            FaultClass::Operand
        );
        assert_eq!(Fault::UnknownPort { port: 7 }.class(), FaultClass::Port);
        assert_eq!(Fault::DivideByZero.class(), FaultClass::Arithmetic);
        assert_eq!(
            Fault::ProgramTooLarge {
                words: 10,
                memory: 8
            }
            .class(),
            FaultClass::Loader
        );
    }

    #[test]
    fn display_renders_operand_in_listing_notation() {
        let fault = Fault::InvalidWriteTarget(Operand::Port(1));
        assert_eq!(fault.to_string(), "operand !1 is not a valid write target");
    }
}
