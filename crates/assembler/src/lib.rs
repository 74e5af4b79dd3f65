//! HEX-80 assembler library.

/// Two-pass assembly pipeline from source sections to listings.
pub mod assembler;
/// Instruction encoding against the emulator's opcode tables.
pub mod encoder;
/// Unified error type across assembler phases.
pub mod errors;
/// Source cleanup and line parsing for both assembly sections.
pub mod parser;
/// Input-schedule files for the run driver.
pub mod schedule;
/// Symbol table shared by data names and text labels.
pub mod symbols;

#[cfg(test)]
use tempfile as _;
