//! The datapath: register file, memory, ports and the ALU.
//!
//! Memory is a single flat address space of machine words holding both
//! code and data. A data cell stores its value in the data-word payload
//! field, so reading a cell as a value and reading it as an instruction
//! are both well defined.

use crate::alu::Alu;
use crate::fault::Fault;
use crate::isa::{Operand, Register};
use crate::ports::{InputToken, Ports, ScheduledToken, INPUT_PORT, OUTPUT_PORT};
use crate::word::Word;

/// Register file, memory and peripherals of one machine instance.
#[derive(Debug)]
pub struct Datapath {
    registers: [i32; 6],
    memory: Vec<Word>,
    ports: Ports,
    /// The arithmetic unit, exposed for the control unit's dispatch.
    pub alu: Alu,
}

impl Datapath {
    /// Builds a datapath around a program image.
    ///
    /// The image is laid down from address zero and the rest of memory is
    /// zero filled. The instruction pointer starts at `entry` and the
    /// stack pointer at the top word of memory.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::ProgramTooLarge`] when the image does not fit
    /// strictly inside `memory_size` words.
    pub fn new(
        image: &[Word],
        entry: i32,
        memory_size: usize,
        schedule: Vec<ScheduledToken>,
    ) -> Result<Self, Fault> {
        if image.len() >= memory_size {
            return Err(Fault::ProgramTooLarge {
                words: image.len(),
                memory: memory_size,
            });
        }
        let mut memory = image.to_vec();
        memory.resize(memory_size, Word::default());

        let mut registers = [0; 6];
        registers[Register::Rip.index()] = entry;
        registers[Register::Rsp.index()] =
            i32::try_from(memory_size - 1).map_err(|_| Fault::ProgramTooLarge {
                words: image.len(),
                memory: memory_size,
            })?;

        Ok(Self {
            registers,
            memory,
            ports: Ports::new(schedule),
            alu: Alu::new(),
        })
    }

    /// Reads a register.
    #[must_use]
    pub const fn register(&self, register: Register) -> i32 {
        self.registers[register.index()]
    }

    /// Writes a register.
    pub const fn set_register(&mut self, register: Register, value: i32) {
        self.registers[register.index()] = value;
    }

    /// Adds a delta to a register, wrapping on the 32-bit boundary.
    pub const fn register_add(&mut self, register: Register, delta: i32) {
        let cell = &mut self.registers[register.index()];
        *cell = cell.wrapping_add(delta);
    }

    fn check_address(&self, address: i32) -> Result<usize, Fault> {
        usize::try_from(address)
            .ok()
            .filter(|&a| a < self.memory.len())
            .ok_or(Fault::AddressOutOfRange {
                address: i64::from(address),
                size: self.memory.len(),
            })
    }

    /// Reads the value stored in a memory cell.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::AddressOutOfRange`] for addresses outside memory.
    pub fn read_cell(&self, address: i32) -> Result<i32, Fault> {
        Ok(self.memory[self.check_address(address)?].payload())
    }

    /// Stores a value into a memory cell as a data word.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::AddressOutOfRange`] for addresses outside memory.
    pub fn write_memory(&mut self, address: i32, value: i32) -> Result<(), Fault> {
        let index = self.check_address(address)?;
        self.memory[index] = Word::data(value);
        Ok(())
    }

    /// Fetches the word the instruction pointer addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::AddressOutOfRange`] when the instruction pointer
    /// has left memory.
    pub fn fetch(&self) -> Result<Word, Fault> {
        let index = self.check_address(self.register(Register::Rip))?;
        Ok(self.memory[index])
    }

    /// Resolves an operand to the value it names.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidOperand`] for port operands, which only the
    /// port instructions may use, and a memory fault for bad addresses.
    pub fn resolve_value(&self, operand: Operand) -> Result<i32, Fault> {
        match operand {
            Operand::Immediate(value) => Ok(value),
            Operand::Register(register) => Ok(self.register(register)),
            Operand::Direct(address) => self.read_cell(address),
            Operand::Indirect(address) => {
                let target = self.read_cell(address)?;
                self.read_cell(target)
            }
            Operand::Port(_) => Err(Fault::InvalidOperand(operand)),
        }
    }

    /// Resolves a memory-mode operand to the cell address it writes.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::InvalidWriteTarget`] for operand modes that do not
    /// name a memory cell.
    pub fn resolve_address(&self, operand: Operand) -> Result<i32, Fault> {
        match operand {
            Operand::Direct(address) => Ok(address),
            Operand::Indirect(address) => self.read_cell(address),
            Operand::Immediate(_) | Operand::Register(_) | Operand::Port(_) => {
                Err(Fault::InvalidWriteTarget(operand))
            }
        }
    }

    /// Advances the instruction pointer after an instruction: to the word
    /// after `target` (the uniform post-increment lands on `target`
    /// itself), or to the next word when no branch was taken.
    pub const fn advance_ip(&mut self, target: Option<i32>) {
        match target {
            Some(target) => self.set_register(Register::Rip, target.wrapping_sub(1)),
            None => self.register_add(Register::Rip, 1),
        }
    }

    /// Reads the input device through a port operand.
    ///
    /// Yields `None` once the schedule is exhausted, which ends the run
    /// without a fault.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownPort`] for a port with no input device.
    pub fn port_read(&mut self, port: i32) -> Result<Option<i32>, Fault> {
        if port != INPUT_PORT {
            return Err(Fault::UnknownPort { port });
        }
        Ok(self.ports.pop_input().map(InputToken::value))
    }

    /// Writes a character to the output device through a port operand.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::UnknownPort`] for a port with no output device and
    /// [`Fault::InvalidCodePoint`] for a value no character has.
    pub fn port_write(&mut self, port: i32, value: i32) -> Result<(), Fault> {
        if port != OUTPUT_PORT {
            return Err(Fault::UnknownPort { port });
        }
        self.ports.emit(value)
    }

    /// Arrival tick of the next scheduled input token.
    #[must_use]
    pub fn next_input_due(&self) -> Option<u64> {
        self.ports.next_due()
    }

    /// Whether undelivered input tokens remain.
    #[must_use]
    pub fn input_pending(&self) -> bool {
        self.ports.input_pending()
    }

    /// The accumulated output text.
    #[must_use]
    pub fn output_string(&self) -> String {
        self.ports.output_string()
    }
}

#[cfg(test)]
mod tests {
    use super::Datapath;
    use crate::fault::Fault;
    use crate::isa::{Operand, Register};
    use crate::word::Word;

    fn datapath() -> Datapath {
        let image = [Word::data(2), Word::data(7), Word::data(1)];
        Datapath::new(&image, 2, 16, Vec::new()).unwrap()
    }

    #[test]
    fn power_on_register_state() {
        let dp = datapath();
        assert_eq!(dp.register(Register::Rip), 2);
        assert_eq!(dp.register(Register::Rsp), 15);
        assert_eq!(dp.register(Register::Rax), 0);
        assert_eq!(dp.register(Register::Rst), 0);
    }

    #[test]
    fn image_must_fit_strictly() {
        let image = [Word::data(0); 4];
        assert!(matches!(
            Datapath::new(&image, 0, 4, Vec::new()),
            Err(Fault::ProgramTooLarge {
                words: 4,
                memory: 4
            })
        ));
    }

    #[test]
    fn operand_resolution() {
        let dp = datapath();
        assert_eq!(dp.resolve_value(Operand::Immediate(-9)), Ok(-9));
        assert_eq!(dp.resolve_value(Operand::Register(Register::Rip)), Ok(2));
        assert_eq!(dp.resolve_value(Operand::Direct(1)), Ok(7));
        // Cell 2 holds 1, cell 1 holds 7.
        assert_eq!(dp.resolve_value(Operand::Indirect(2)), Ok(7));
        assert_eq!(
            dp.resolve_value(Operand::Port(0)),
            Err(Fault::InvalidOperand(Operand::Port(0)))
        );
    }

    #[test]
    fn write_targets() {
        let mut dp = datapath();
        assert_eq!(dp.resolve_address(Operand::Direct(5)), Ok(5));
        assert_eq!(dp.resolve_address(Operand::Indirect(2)), Ok(1));
        assert_eq!(
            dp.resolve_address(Operand::Immediate(5)),
            Err(Fault::InvalidWriteTarget(Operand::Immediate(5)))
        );
        dp.write_memory(5, -4).unwrap();
        assert_eq!(dp.read_cell(5), Ok(-4));
    }

    #[test]
    fn out_of_range_accesses_fault() {
        let mut dp = datapath();
        assert!(matches!(
            dp.read_cell(16),
            Err(Fault::AddressOutOfRange {
                address: 16,
                size: 16
            })
        ));
        assert!(matches!(
            dp.write_memory(-1, 0),
            Err(Fault::AddressOutOfRange { address: -1, .. })
        ));
    }

    #[test]
    fn branch_target_compensates_post_increment() {
        let mut dp = datapath();
        dp.advance_ip(Some(9));
        assert_eq!(dp.register(Register::Rip), 8);
        dp.advance_ip(None);
        assert_eq!(dp.register(Register::Rip), 9);
    }

    #[test]
    fn unknown_ports_fault() {
        let mut dp = datapath();
        assert_eq!(dp.port_read(1), Err(Fault::UnknownPort { port: 1 }));
        assert_eq!(dp.port_write(0, 65), Err(Fault::UnknownPort { port: 0 }));
        assert_eq!(dp.port_read(0), Ok(None));
    }
}
