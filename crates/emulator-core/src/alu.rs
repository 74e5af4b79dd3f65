//! The arithmetic-logic unit.
//!
//! All operations compute in 64-bit width, then apply a single overflow
//! correction: a result at or past `2^31` is shifted down by `2^31`, a
//! result at or below `-2^31` is shifted up by `2^31`, and either shift
//! raises the overflow flag. The negative and zero flags are taken from
//! the corrected wide result; the stored value is its low 32 bits, which
//! only differ from the corrected result when a product escapes even the
//! corrected range.

use crate::fault::Fault;
use crate::isa::{Opcode, WORD_VALUE_LIMIT};

/// Division rounding toward negative infinity; the matching modulo takes
/// the sign of the divisor.
const fn floor_div(left: i64, right: i64) -> i64 {
    let quotient = left / right;
    if left % right != 0 && (left < 0) != (right < 0) {
        quotient - 1
    } else {
        quotient
    }
}

/// ALU operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    /// Signed addition.
    Add,
    /// Signed subtraction.
    Sub,
    /// Signed multiplication.
    Mul,
    /// Flooring division.
    Div,
    /// Flooring modulo.
    Mod,
    /// Bitwise exclusive or.
    Xor,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
}

impl AluOp {
    /// Maps an ALU-class opcode to its operation selector. `cmp` selects
    /// subtraction; its result is discarded by the control unit.
    #[must_use]
    pub const fn from_opcode(opcode: Opcode) -> Option<Self> {
        match opcode {
            Opcode::Add => Some(Self::Add),
            Opcode::Sub | Opcode::Cmp => Some(Self::Sub),
            Opcode::Mul => Some(Self::Mul),
            Opcode::Div => Some(Self::Div),
            Opcode::Mod => Some(Self::Mod),
            Opcode::Xor => Some(Self::Xor),
            Opcode::And => Some(Self::And),
            Opcode::Or => Some(Self::Or),
            _ => None,
        }
    }
}

/// The ALU status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Flags {
    /// Result was negative.
    pub negative: bool,
    /// Result was zero.
    pub zero: bool,
    /// Result wrapped the 32-bit range.
    pub overflow: bool,
}

/// The arithmetic-logic unit: an operation evaluator plus the flag latch.
#[derive(Debug, Clone)]
pub struct Alu {
    flags: Flags,
}

impl Default for Alu {
    fn default() -> Self {
        Self::new()
    }
}

impl Alu {
    /// Creates an ALU in its power-on state, with only the zero flag set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: Flags {
                negative: false,
                zero: true,
                overflow: false,
            },
        }
    }

    /// Returns the current flag latch.
    #[must_use]
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Performs `op` on `left` and `right`, latching all three flags.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::DivideByZero`] for division or modulo with a zero
    /// right operand.
    #[allow(clippy::cast_possible_truncation)]
    pub fn perform(&mut self, op: AluOp, left: i32, right: i32) -> Result<i32, Fault> {
        let left = i64::from(left);
        let right = i64::from(right);
        let wide = match op {
            AluOp::Add => left + right,
            AluOp::Sub => left - right,
            AluOp::Mul => left * right,
            AluOp::Div => {
                if right == 0 {
                    return Err(Fault::DivideByZero);
                }
                floor_div(left, right)
            }
            AluOp::Mod => {
                if right == 0 {
                    return Err(Fault::DivideByZero);
                }
                left - right * floor_div(left, right)
            }
            AluOp::Xor => left ^ right,
            AluOp::And => left & right,
            AluOp::Or => left | right,
        };

        let (corrected, overflow) = if wide >= WORD_VALUE_LIMIT {
            (wide - WORD_VALUE_LIMIT, true)
        } else if wide <= -WORD_VALUE_LIMIT {
            (wide + WORD_VALUE_LIMIT, true)
        } else {
            (wide, false)
        };

        self.flags = Flags {
            negative: corrected < 0,
            zero: corrected == 0,
            overflow,
        };
        Ok(corrected as i32)
    }

    /// Latches the negative and zero flags from `value`, leaving overflow
    /// untouched. Used by plain moves.
    pub const fn set_flags(&mut self, value: i32) {
        self.flags.negative = value < 0;
        self.flags.zero = value == 0;
    }
}
