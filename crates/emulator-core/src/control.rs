//! The control unit: instruction dispatch, timing and interrupt handling.
//!
//! Timing is modelled as one tick per datapath latch. Fetch and decode
//! share a single tick, every subsequent memory read, register writeback
//! or port transfer costs one more. The instruction pointer advances with
//! a uniform post-increment after dispatch, so branches latch their target
//! minus one.

use crate::alu::AluOp;
use crate::api::{RunOutcome, StopReason, TraceRecord, TraceSink};
use crate::datapath::Datapath;
use crate::disasm::Disasm;
use crate::fault::Fault;
use crate::isa::{Opcode, Operand, Register, REGISTERS};
use crate::word::Instruction;

/// Memory address of the interrupt vector cell.
pub const INTERRUPT_VECTOR: i32 = 1;

/// Control flow verdict of one dispatched instruction.
enum Flow {
    Continue,
    Stop(StopReason),
}

/// Drives a [`Datapath`] through the command cycle.
pub struct ControlUnit<'a> {
    datapath: Datapath,
    tick: u64,
    instructions: u64,
    limit: u64,
    trap_mode: bool,
    last: Option<Instruction>,
    sink: Option<&'a mut dyn TraceSink>,
}

impl<'a> ControlUnit<'a> {
    /// Wraps a datapath with an instruction limit and an optional trace
    /// sink.
    pub const fn new(datapath: Datapath, limit: u64, sink: Option<&'a mut dyn TraceSink>) -> Self {
        Self {
            datapath,
            tick: 0,
            instructions: 0,
            limit,
            trap_mode: false,
            last: None,
            sink,
        }
    }

    /// Runs the command cycle until a stop condition or a fault.
    ///
    /// # Errors
    ///
    /// Returns the first [`Fault`] raised by decode, the datapath or the
    /// ALU.
    pub fn run(mut self) -> Result<RunOutcome, Fault> {
        self.record();
        let stop = loop {
            if self.instructions >= self.limit {
                break StopReason::LimitExceeded;
            }
            match self.step()? {
                Flow::Stop(reason) => break reason,
                Flow::Continue => {}
            }
            self.datapath.advance_ip(None);
            self.record();
            self.instructions += 1;
            self.interrupt_cycle()?;
        };
        Ok(RunOutcome {
            output: self.datapath.output_string(),
            instructions: self.instructions,
            ticks: self.tick,
            stop,
        })
    }

    /// Fetches, decodes and dispatches one instruction.
    fn step(&mut self) -> Result<Flow, Fault> {
        let instruction = self.datapath.fetch()?.decode()?;
        self.tick += 1;
        self.last = Some(instruction);

        let Instruction { opcode, op1, op2 } = instruction;
        match opcode {
            Opcode::Hlt => {
                self.record();
                return Ok(Flow::Stop(StopReason::Halted));
            }
            Opcode::Nop => {}
            Opcode::Ei => {
                self.set_status_bit(1, true);
                self.tick += 1;
            }
            Opcode::Di => {
                self.set_status_bit(1, false);
                self.tick += 1;
            }
            Opcode::Iret => self.execute_iret()?,
            Opcode::Jmp | Opcode::Jz | Opcode::Jnz | Opcode::Jn | Opcode::Jp => {
                self.execute_branch(opcode, op1)?;
            }
            Opcode::Mov => self.execute_mov(op1, op2)?,
            Opcode::Movo => {
                let port = port_operand(op1)?;
                let value = self.datapath.resolve_value(op2)?;
                self.datapath.port_write(port, value)?;
                self.tick += 1;
            }
            Opcode::Movi => {
                let port = port_operand(op2)?;
                let Some(value) = self.datapath.port_read(port)? else {
                    return Ok(Flow::Stop(StopReason::InputExhausted));
                };
                match op1 {
                    Operand::Register(register) => self.datapath.set_register(register, value),
                    destination => {
                        let address = self.datapath.resolve_address(destination)?;
                        self.datapath.write_memory(address, value)?;
                    }
                }
                self.tick += 1;
            }
            _ => self.execute_alu(opcode, op1, op2)?,
        }
        Ok(Flow::Continue)
    }

    fn execute_alu(&mut self, opcode: Opcode, op1: Operand, op2: Operand) -> Result<(), Fault> {
        // `step` routes every remaining opcode here, and all of them map.
        let Some(op) = AluOp::from_opcode(opcode) else {
            return Err(Fault::UnknownOpcode {
                opcode: opcode.as_u8(),
            });
        };
        if let Operand::Register(destination) = op1 {
            let left = self.datapath.resolve_value(op1)?;
            let right = self.datapath.resolve_value(op2)?;
            let result = self.datapath.alu.perform(op, left, right)?;
            if opcode != Opcode::Cmp {
                self.datapath.set_register(destination, result);
                self.tick += 1;
            }
        } else {
            let left = self.datapath.resolve_value(op1)?;
            self.tick += 1;
            let right = self.datapath.resolve_value(op2)?;
            self.tick += 1;
            let result = self.datapath.alu.perform(op, left, right)?;
            if opcode != Opcode::Cmp {
                let address = self.datapath.resolve_address(op1)?;
                self.datapath.write_memory(address, result)?;
                self.tick += 1;
            }
        }
        Ok(())
    }

    fn execute_mov(&mut self, op1: Operand, op2: Operand) -> Result<(), Fault> {
        match (op1, op2) {
            (Operand::Register(destination), source) => {
                let value = self.datapath.resolve_value(source)?;
                self.datapath.alu.set_flags(value);
                self.datapath.set_register(destination, value);
                self.tick += 1;
            }
            (destination, Operand::Register(_)) => {
                let value = self.datapath.resolve_value(op2)?;
                let address = self.datapath.resolve_address(destination)?;
                self.datapath.write_memory(address, value)?;
                self.tick += 1;
            }
            (destination, source) => {
                let value = self.datapath.resolve_value(source)?;
                self.tick += 1;
                let address = self.datapath.resolve_address(destination)?;
                self.datapath.write_memory(address, value)?;
                self.tick += 1;
            }
        }
        Ok(())
    }

    fn execute_branch(&mut self, opcode: Opcode, target: Operand) -> Result<(), Fault> {
        let flags = self.datapath.alu.flags();
        let taken = match opcode {
            Opcode::Jmp => true,
            Opcode::Jz => flags.zero,
            Opcode::Jnz => !flags.zero,
            Opcode::Jn => flags.negative,
            Opcode::Jp => !flags.negative,
            _ => false,
        };
        if taken {
            let destination = self.datapath.resolve_value(target)?;
            self.datapath.advance_ip(Some(destination));
        }
        self.tick += 1;
        Ok(())
    }

    fn execute_iret(&mut self) -> Result<(), Fault> {
        self.trap_mode = false;

        self.datapath.register_add(Register::Rsp, 1);
        let saved_rax = self.datapath.read_cell(self.datapath.register(Register::Rsp))?;
        self.datapath.set_register(Register::Rax, saved_rax);
        self.tick += 1;

        self.datapath.register_add(Register::Rsp, 1);
        let saved_rip = self.datapath.read_cell(self.datapath.register(Register::Rsp))?;
        // Minus one so the uniform post-increment lands on the saved word.
        self.datapath.set_register(Register::Rip, saved_rip);
        self.datapath.register_add(Register::Rip, -1);
        self.tick += 1;

        self.set_status_bit(1, true);
        self.tick += 1;
        Ok(())
    }

    /// Raises the interrupt-request line when input is due, then enters
    /// the handler if interrupts are enabled.
    fn interrupt_cycle(&mut self) -> Result<(), Fault> {
        if let Some(due) = self.datapath.next_input_due() {
            if due <= self.tick {
                self.set_status_bit(2, true);
            }
        }
        let status = self.datapath.register(Register::Rst);
        if status & 1 != 0 && status & 2 != 0 {
            self.enter_interrupt()?;
        }
        Ok(())
    }

    fn enter_interrupt(&mut self) -> Result<(), Fault> {
        self.trap_mode = true;
        self.datapath.set_register(Register::Rst, 0);
        self.tick += 1;

        self.push(Register::Rip)?;
        self.tick += 1;

        self.push(Register::Rax)?;
        self.tick += 1;

        let handler = self.datapath.read_cell(INTERRUPT_VECTOR)?;
        self.datapath.set_register(Register::Rip, handler);
        self.tick += 1;
        Ok(())
    }

    fn push(&mut self, register: Register) -> Result<(), Fault> {
        let top = self.datapath.register(Register::Rsp);
        self.datapath
            .write_memory(top, self.datapath.register(register))?;
        self.datapath.register_add(Register::Rsp, -1);
        Ok(())
    }

    fn set_status_bit(&mut self, mask: i32, value: bool) {
        let status = self.datapath.register(Register::Rst);
        let status = if value { status | mask } else { status & !mask };
        self.datapath.set_register(Register::Rst, status);
    }

    fn record(&mut self) {
        if let Some(sink) = self.sink.as_deref_mut() {
            let mut registers = [0; 6];
            for register in REGISTERS {
                registers[register.index()] = self.datapath.register(register);
            }
            let instruction = self
                .last
                .as_ref()
                .map_or_else(|| Opcode::Nop.mnemonic().to_owned(), |i| Disasm(i).to_string());
            sink.record(&TraceRecord {
                trap: self.trap_mode,
                tick: self.tick,
                registers,
                flags: self.datapath.alu.flags(),
                instruction,
            });
        }
    }
}

const fn port_operand(operand: Operand) -> Result<i32, Fault> {
    match operand {
        Operand::Port(port) => Ok(port),
        other => Err(Fault::PortOperandExpected(other)),
    }
}
