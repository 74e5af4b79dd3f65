//! Core emulator crate for the HEX-80 toy architecture.

/// Instruction-set tables: opcodes, registers, operand modes.
pub mod isa;
pub use isa::{Opcode, Operand, Register, OPCODES, REGISTERS, WORD_VALUE_LIMIT};

/// The 80-bit machine word and its instruction codec.
pub mod word;
pub use word::{Instruction, Word};

/// Fault taxonomy for decode, datapath and loader failures.
pub mod fault;
pub use fault::{Fault, FaultClass};

/// The arithmetic-logic unit and its flag latch.
pub mod alu;
pub use alu::{Alu, AluOp, Flags};

/// Memory-mapped I/O ports and the input schedule.
pub mod ports;
pub use ports::{InputToken, Ports, ScheduledToken, INPUT_PORT, OUTPUT_PORT};

/// Register file, memory and peripherals.
pub mod datapath;
pub use datapath::Datapath;

/// Instruction dispatch, timing and interrupt handling.
pub mod control;
pub use control::{ControlUnit, INTERRUPT_VECTOR};

/// Machine-code listings and the program image loader.
pub mod listing;
pub use listing::{parse_listing, ListingEntry, ProgramImage};

/// Rendering decoded instructions back into assembly notation.
pub mod disasm;
pub use disasm::Disasm;

/// Host-facing simulation API: configuration, outcomes, tracing.
pub mod api;
pub use api::{
    run_simulation, RunOutcome, SimulationConfig, StopReason, TraceRecord, TraceSink, VecSink,
    DEFAULT_INSTRUCTION_LIMIT, DEFAULT_MEMORY_WORDS,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
