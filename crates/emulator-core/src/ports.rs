//! Memory-mapped I/O ports and the input schedule.
//!
//! Two devices are attached: a token stream on the input port and a
//! character sink on the output port. Input tokens arrive on a schedule;
//! a token becomes readable once the machine clock reaches its tick, at
//! which point the devices raise the interrupt-request line.

use std::collections::VecDeque;

use crate::fault::Fault;

/// Port index of the scheduled input device.
pub const INPUT_PORT: i32 = 0;
/// Port index of the character output device.
pub const OUTPUT_PORT: i32 = 1;

/// One value deliverable on the input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InputToken {
    /// A raw integer.
    Int(i32),
    /// A character, delivered as its code point.
    Char(char),
}

impl InputToken {
    /// The value a `movi` read of this token yields.
    #[must_use]
    pub const fn value(self) -> i32 {
        match self {
            Self::Int(v) => v,
            #[allow(clippy::cast_possible_wrap)]
            Self::Char(c) => c as i32,
        }
    }
}

/// An input token plus the machine tick it arrives at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ScheduledToken {
    /// Arrival tick; the token is readable from this tick on.
    pub tick: u64,
    /// The delivered value.
    pub token: InputToken,
}

/// The port block: the pending input schedule and the output sink.
#[derive(Debug, Clone, Default)]
pub struct Ports {
    input: VecDeque<ScheduledToken>,
    output: Vec<char>,
}

impl Ports {
    /// Creates a port block with the given input schedule. Tokens are
    /// delivered in the order given.
    #[must_use]
    pub fn new(schedule: Vec<ScheduledToken>) -> Self {
        Self {
            input: schedule.into(),
            output: Vec::new(),
        }
    }

    /// The arrival tick of the next pending token, if any remain.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.input.front().map(|entry| entry.tick)
    }

    /// Takes the next pending token off the schedule.
    pub fn pop_input(&mut self) -> Option<InputToken> {
        self.input.pop_front().map(|entry| entry.token)
    }

    /// Whether any tokens remain undelivered.
    #[must_use]
    pub fn input_pending(&self) -> bool {
        !self.input.is_empty()
    }

    /// Appends a character to the output sink.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidCodePoint`] when `value` is not a Unicode
    /// scalar value.
    pub fn emit(&mut self, value: i32) -> Result<(), Fault> {
        let ch = u32::try_from(value)
            .ok()
            .and_then(char::from_u32)
            .ok_or(Fault::InvalidCodePoint { value })?;
        self.output.push(ch);
        Ok(())
    }

    /// The accumulated output as a string.
    #[must_use]
    pub fn output_string(&self) -> String {
        self.output.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{InputToken, Ports, ScheduledToken};
    use crate::fault::Fault;

    fn schedule() -> Vec<ScheduledToken> {
        vec![
            ScheduledToken {
                tick: 5,
                token: InputToken::Char('A'),
            },
            ScheduledToken {
                tick: 9,
                token: InputToken::Int(-3),
            },
        ]
    }

    #[test]
    fn tokens_deliver_in_schedule_order() {
        let mut ports = Ports::new(schedule());
        assert_eq!(ports.next_due(), Some(5));
        assert_eq!(ports.pop_input(), Some(InputToken::Char('A')));
        assert_eq!(ports.next_due(), Some(9));
        assert_eq!(ports.pop_input(), Some(InputToken::Int(-3)));
        assert!(!ports.input_pending());
        assert_eq!(ports.pop_input(), None);
    }

    #[test]
    fn token_values() {
        assert_eq!(InputToken::Char('A').value(), 65);
        assert_eq!(InputToken::Int(-3).value(), -3);
    }

    #[test]
    fn emit_collects_characters() {
        let mut ports = Ports::new(Vec::new());
        ports.emit(72).unwrap();
        ports.emit(105).unwrap();
        assert_eq!(ports.output_string(), "Hi");
    }

    #[test]
    fn emit_rejects_non_code_points() {
        let mut ports = Ports::new(Vec::new());
        assert_eq!(ports.emit(-1), Err(Fault::InvalidCodePoint { value: -1 }));
        assert_eq!(
            ports.emit(0xD800),
            Err(Fault::InvalidCodePoint { value: 0xD800 })
        );
    }
}
