//! Two-pass assembly from source sections to machine-code listings.
//!
//! The data section is laid out first, starting at cell 2 (cells 0 and 1
//! are the reserved entry word and interrupt vector). The text section
//! follows immediately, so label addresses are absolute and the entry
//! word is patched to the data-section length.

use emulator_core::{ListingEntry, Operand, ProgramImage, Word};

use crate::encoder::encode;
use crate::errors::AssembleError;
use crate::parser::{
    clean_source, parse_data_line, parse_statement, CleanLine, DataValue, MemRef, OperandToken,
    ParseError, ParseErrorKind,
};
use crate::symbols::SymbolTable;

const SECTION_DATA: &str = "section .data";
const SECTION_TEXT: &str = "section .text";

/// The output of a successful assembly: both listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Data-section listing, one entry per cell.
    pub data: Vec<ListingEntry>,
    /// Text-section listing, one entry per instruction.
    pub text: Vec<ListingEntry>,
}

impl Assembly {
    /// The program entry address, held by the reserved first data cell.
    #[must_use]
    pub fn entry(&self) -> i32 {
        self.data.first().map_or(0, |entry| entry.word.payload())
    }

    /// Renders the data listing as text.
    #[must_use]
    pub fn data_listing(&self) -> String {
        render_listing(&self.data)
    }

    /// Renders the text listing as text.
    #[must_use]
    pub fn text_listing(&self) -> String {
        render_listing(&self.text)
    }

    /// Builds the runnable memory image, data then text.
    #[must_use]
    pub fn image(&self) -> ProgramImage {
        let words = self
            .data
            .iter()
            .chain(&self.text)
            .map(|entry| entry.word)
            .collect();
        ProgramImage::from_words(words)
    }
}

fn render_listing(entries: &[ListingEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}

/// One instruction after label collection and operand expansion.
struct Unit {
    mnemonic: String,
    operands: Vec<OperandToken>,
    line: usize,
}

/// Assembles a data source and a text source into listings.
///
/// # Errors
///
/// Returns the first [`AssembleError`] from any phase.
pub fn translate(data_source: &str, text_source: &str) -> Result<Assembly, AssembleError> {
    let mut symbols = SymbolTable::new();

    let (data, data_len) = assemble_data(data_source, &mut symbols)?;
    let units = collect_units(text_source, data_len, &mut symbols)?;
    let text = assemble_text(&units, data_len, &symbols)?;

    Ok(Assembly { data, text })
}

fn section_lines(source: &str) -> Vec<CleanLine> {
    clean_source(source)
        .into_iter()
        .filter(|line| line.text != SECTION_DATA && line.text != SECTION_TEXT)
        .collect()
}

#[allow(clippy::cast_possible_wrap)]
fn assemble_data(
    source: &str,
    symbols: &mut SymbolTable,
) -> Result<(Vec<ListingEntry>, i32), AssembleError> {
    // Reserved cells: entry word (patched below) and interrupt vector.
    let mut cells: Vec<i32> = vec![0, 0];

    for line in section_lines(source) {
        let definition = parse_data_line(&line)?;
        let address = address_of(cells.len(), definition.line)?;
        symbols.define(&definition.name, address, definition.line)?;
        match definition.value {
            DataValue::Buffer { length, fill } => cells.extend(std::iter::repeat_n(fill, length)),
            DataValue::Int(value) => cells.push(value),
            DataValue::Str(text) => {
                cells.extend(text.chars().map(|ch| ch as i32));
                cells.push(0);
            }
            DataValue::Pointer(name) => cells.push(symbols.resolve(&name, definition.line)?),
        }
    }

    let data_len = address_of(cells.len(), 0)?;
    cells[0] = data_len;

    let entries = cells
        .iter()
        .enumerate()
        .map(|(address, &value)| ListingEntry {
            address,
            word: Word::data(value),
            source: value.to_string(),
        })
        .collect();
    Ok((entries, data_len))
}

fn collect_units(
    source: &str,
    data_len: i32,
    symbols: &mut SymbolTable,
) -> Result<Vec<Unit>, AssembleError> {
    let mut units = Vec::new();
    let mut pending_labels: Vec<(String, usize)> = Vec::new();

    for line in section_lines(source) {
        let statement = parse_statement(&line)?;
        if let Some(label) = statement.label {
            pending_labels.push((label, statement.line));
        }
        if statement.mnemonic.is_empty() {
            continue;
        }

        let address = data_len + address_of(units.len(), statement.line)?;
        for (label, label_line) in pending_labels.drain(..) {
            symbols.define(&format!(".{label}"), address, label_line)?;
        }

        if statement.operands.len() <= 2 {
            units.push(Unit {
                mnemonic: statement.mnemonic,
                operands: statement.operands,
                line: statement.line,
            });
        } else {
            // Long forms repeat the first operand: `add %rax 1 2` becomes
            // `add %rax 1` then `add %rax 2`.
            let mut operands = statement.operands.into_iter();
            let first = operands.next().unwrap_or(OperandToken::Immediate(0));
            for operand in operands {
                units.push(Unit {
                    mnemonic: statement.mnemonic.clone(),
                    operands: vec![first.clone(), operand],
                    line: statement.line,
                });
            }
        }
    }

    if let Some((_, line)) = pending_labels.first() {
        return Err(AssembleError::Parse(ParseError {
            kind: ParseErrorKind::EmptyStatement,
            line: *line,
        }));
    }
    Ok(units)
}

fn assemble_text(
    units: &[Unit],
    data_len: i32,
    symbols: &SymbolTable,
) -> Result<Vec<ListingEntry>, AssembleError> {
    let mut entries = Vec::with_capacity(units.len());
    for (index, unit) in units.iter().enumerate() {
        let operands = unit
            .operands
            .iter()
            .map(|token| resolve_operand(token, symbols, unit.line))
            .collect::<Result<Vec<_>, _>>()?;
        let word = encode(&unit.mnemonic, &operands, unit.line)?;
        let source = render_source(&unit.mnemonic, &operands);
        let address = data_len + address_of(index, unit.line)?;
        entries.push(ListingEntry {
            address: usize::try_from(address).unwrap_or(0),
            word,
            source,
        });
    }
    Ok(entries)
}

fn resolve_operand(
    token: &OperandToken,
    symbols: &SymbolTable,
    line: usize,
) -> Result<Operand, AssembleError> {
    let resolved = match token {
        OperandToken::Immediate(value) => Operand::Immediate(*value),
        OperandToken::Register(register) => Operand::Register(*register),
        OperandToken::Port(index) => Operand::Port(*index),
        OperandToken::Direct(cell) => Operand::Direct(resolve_ref(cell, symbols, line)?),
        OperandToken::Indirect(cell) => Operand::Indirect(resolve_ref(cell, symbols, line)?),
        OperandToken::Label(name) => {
            Operand::Immediate(symbols.resolve(&format!(".{name}"), line)?)
        }
        OperandToken::Indexed { name, offset } => {
            Operand::Direct(symbols.resolve(name, line)? + offset)
        }
    };
    Ok(resolved)
}

fn resolve_ref(cell: &MemRef, symbols: &SymbolTable, line: usize) -> Result<i32, AssembleError> {
    match cell {
        MemRef::Address(address) => Ok(*address),
        MemRef::Name(name) => Ok(symbols.resolve(name, line)?),
    }
}

fn render_source(mnemonic: &str, operands: &[Operand]) -> String {
    let mut out = mnemonic.to_owned();
    for operand in operands {
        out.push(' ');
        out.push_str(&operand.to_string());
    }
    out
}

fn address_of(index: usize, line: usize) -> Result<i32, AssembleError> {
    i32::try_from(index).map_err(|_| {
        AssembleError::Parse(ParseError {
            kind: ParseErrorKind::BadValue(format!("address {index} out of range")),
            line,
        })
    })
}

#[cfg(test)]
mod tests {
    use emulator_core::{
        run_simulation, InputToken, ScheduledToken, SimulationConfig, StopReason,
    };

    use super::translate;
    use crate::errors::AssembleError;
    use crate::parser::ParseErrorKind;
    use crate::symbols::SymbolErrorKind;

    fn config() -> SimulationConfig {
        SimulationConfig {
            memory_size: 256,
            instruction_limit: 10_000,
        }
    }

    #[test]
    fn data_layout_reserves_entry_and_vector() {
        let assembly = translate("count: 42\nname: 'ab'\nptr: name\n", "hlt\n").unwrap();
        // Cells: entry, vector, 42, 'a', 'b', NUL, pointer to 3.
        let words: Vec<i32> = assembly.data.iter().map(|e| e.word.payload()).collect();
        assert_eq!(words, vec![7, 0, 42, 97, 98, 0, 3]);
        assert_eq!(assembly.entry(), 7);
        assert_eq!(assembly.text.len(), 1);
        assert_eq!(assembly.text[0].address, 7);
    }

    #[test]
    fn section_headers_are_skipped() {
        let assembly = translate(
            "section .data\nx: 1\n",
            "section .text\nmov %rax #x\nhlt\n",
        )
        .unwrap();
        assert_eq!(assembly.entry(), 3);
        assert_eq!(assembly.text[0].source, "mov %rax #2");
    }

    #[test]
    fn labels_resolve_to_absolute_addresses() {
        let assembly = translate(
            "x: 5\n",
            ".loop: sub %rax 1\njnz .loop\nhlt\n",
        )
        .unwrap();
        // Data occupies cells 0..=2, so .loop sits at 3.
        assert_eq!(assembly.text[1].source, "jnz 3");
    }

    #[test]
    fn label_only_line_binds_to_next_instruction() {
        let assembly = translate("", ".start:\nnop\njmp .start\n").unwrap();
        assert_eq!(assembly.text[1].source, "jmp 2");
    }

    #[test]
    fn long_forms_expand_with_the_first_operand() {
        let assembly = translate("", "add %rax 1 2 3\nhlt\n").unwrap();
        let sources: Vec<&str> = assembly.text.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["add %rax 1", "add %rax 2", "add %rax 3", "hlt"]);
    }

    #[test]
    fn expansion_keeps_later_labels_aligned() {
        let assembly = translate("", "add %rax 1 2 3\n.end: hlt\njmp .end\n").unwrap();
        // Three expanded adds start at 2, so .end is cell 5.
        assert_eq!(assembly.text[4].source, "jmp 5");
    }

    #[test]
    fn indexed_operands_offset_the_name() {
        let assembly = translate("word: 'hi'\n", "mov %rax #word\nmov %rbx word[1]\nhlt\n")
            .unwrap();
        assert_eq!(assembly.text[0].source, "mov %rax #2");
        assert_eq!(assembly.text[1].source, "mov %rbx #3");
    }

    #[test]
    fn undefined_names_are_reported() {
        let error = translate("", "jmp .nowhere\n").unwrap_err();
        let AssembleError::Symbol(symbol_error) = error else {
            panic!("expected symbol error, got {error:?}");
        };
        assert_eq!(
            symbol_error.kind,
            SymbolErrorKind::Undefined(".nowhere".to_owned())
        );
    }

    #[test]
    fn dangling_label_is_reported() {
        let error = translate("", "nop\n.end:\n").unwrap_err();
        let AssembleError::Parse(parse_error) = error else {
            panic!("expected parse error, got {error:?}");
        };
        assert_eq!(parse_error.kind, ParseErrorKind::EmptyStatement);
        assert_eq!(parse_error.line, 2);
    }

    #[test]
    fn hello_program_assembles_and_runs() {
        // The cursor cell starts at the string head and walks it until
        // the NUL terminator.
        let data = "message: 'Hello, World!'\ncursor: message\n";
        let text = "\
            .loop: cmp *cursor 0\n\
            jz .done\n\
            movo !1 *cursor\n\
            add #cursor 1\n\
            jmp .loop\n\
            .done: hlt\n";
        let assembly = translate(data, text).unwrap();
        let outcome = run_simulation(&assembly.image(), Vec::new(), &config(), None).unwrap();
        assert_eq!(outcome.output, "Hello, World!");
        assert_eq!(outcome.stop, StopReason::Halted);
    }

    #[test]
    fn echo_program_consumes_scheduled_input() {
        let text = "\
            .loop: movi %rax !0\n\
            movo !1 %rax\n\
            jmp .loop\n";
        let assembly = translate("", text).unwrap();
        let schedule = vec![
            ScheduledToken {
                tick: 0,
                token: InputToken::Char('o'),
            },
            ScheduledToken {
                tick: 0,
                token: InputToken::Char('k'),
            },
        ];
        let outcome = run_simulation(&assembly.image(), schedule, &config(), None).unwrap();
        assert_eq!(outcome.output, "ok");
        assert_eq!(outcome.stop, StopReason::InputExhausted);
    }
}
