//! The embedding surface: configuration, run outcomes and tracing.

use std::fmt;

use crate::alu::Flags;
use crate::control::ControlUnit;
use crate::datapath::Datapath;
use crate::fault::Fault;
use crate::isa::REGISTERS;
use crate::listing::ProgramImage;
use crate::ports::ScheduledToken;

/// Default memory size in words.
pub const DEFAULT_MEMORY_WORDS: usize = 1 << 11;
/// Default instruction limit per run.
pub const DEFAULT_INSTRUCTION_LIMIT: u64 = 20_000;

/// Machine sizing for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SimulationConfig {
    /// Address-space size in words.
    pub memory_size: usize,
    /// Executed-instruction ceiling; reaching it stops the run.
    pub instruction_limit: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_WORDS,
            instruction_limit: DEFAULT_INSTRUCTION_LIMIT,
        }
    }
}

/// Why a run ended. None of these are faults; all keep the output built
/// so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StopReason {
    /// A `hlt` instruction was fetched.
    Halted,
    /// A `movi` read found the input schedule exhausted.
    InputExhausted,
    /// The instruction limit was reached.
    LimitExceeded,
}

/// Everything a finished run yields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunOutcome {
    /// Text accumulated on the output port.
    pub output: String,
    /// Instructions retired.
    pub instructions: u64,
    /// Machine ticks elapsed.
    pub ticks: u64,
    /// Why execution stopped.
    pub stop: StopReason,
}

/// One machine-state snapshot, taken after each retired instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    /// Whether the machine is inside an interrupt handler.
    pub trap: bool,
    /// Tick count at the snapshot.
    pub tick: u64,
    /// Register file in index order.
    pub registers: [i32; 6],
    /// ALU flag latch.
    pub flags: Flags,
    /// The retired instruction in listing notation.
    pub instruction: String,
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.trap {
            f.write_str("TRAP:")?;
        }
        write!(f, "Tick: {} | Registers: ", self.tick)?;
        for (index, (register, value)) in REGISTERS.iter().zip(self.registers).enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{register}: {value}")?;
        }
        write!(
            f,
            " Flags: N: {} Z: {} OF: {} | Instruction: {}",
            u8::from(self.flags.negative),
            u8::from(self.flags.zero),
            u8::from(self.flags.overflow),
            self.instruction
        )
    }
}

/// Receives machine-state snapshots during a run.
///
/// The control unit emits one record for the power-on state and one after
/// every retired instruction. Implementations decide where records go; the
/// run driver prints them to standard error.
pub trait TraceSink {
    /// Consumes one snapshot.
    fn record(&mut self, record: &TraceRecord);
}

/// A sink that stores every record, for tests and programmatic inspection.
#[derive(Debug, Default)]
pub struct VecSink {
    /// The records received so far, in emission order.
    pub records: Vec<TraceRecord>,
}

impl TraceSink for VecSink {
    fn record(&mut self, record: &TraceRecord) {
        self.records.push(record.clone());
    }
}

/// Runs a program image to completion.
///
/// # Errors
///
/// Returns the first [`Fault`] the machine raises; faults abort the run.
pub fn run_simulation(
    image: &ProgramImage,
    schedule: Vec<ScheduledToken>,
    config: &SimulationConfig,
    sink: Option<&mut dyn TraceSink>,
) -> Result<RunOutcome, Fault> {
    let datapath = Datapath::new(&image.words, image.entry, config.memory_size, schedule)?;
    ControlUnit::new(datapath, config.instruction_limit, sink).run()
}

#[cfg(test)]
mod tests {
    use super::{SimulationConfig, TraceRecord};
    use crate::alu::Alu;

    #[test]
    fn default_sizing() {
        let config = SimulationConfig::default();
        assert_eq!(config.memory_size, 2048);
        assert_eq!(config.instruction_limit, 20_000);
    }

    #[test]
    fn trace_record_line_format() {
        let record = TraceRecord {
            trap: false,
            tick: 3,
            registers: [5, 0, 0, 1, 0, 2047],
            flags: Alu::new().flags(),
            instruction: "add %rax 5".to_owned(),
        };
        assert_eq!(
            record.to_string(),
            "Tick: 3 | Registers: rax: 5, rbx: 0, rdx: 0, rip: 1, rst: 0, rsp: 2047 \
             Flags: N: 0 Z: 1 OF: 0 | Instruction: add %rax 5"
        );

        let trapped = TraceRecord {
            trap: true,
            ..record
        };
        assert!(trapped.to_string().starts_with("TRAP:Tick: 3"));
    }
}
