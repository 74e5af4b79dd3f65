//! Source cleanup and line parsing for both assembly sections.
//!
//! Parsing keeps symbolic references (`#name`, `*name`, `.label`,
//! `name[k]`) as tokens; the assembler resolves them against the symbol
//! table once every address is known.

use emulator_core::Register;

/// One surviving source line after cleanup, with its original number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanLine {
    /// 1-indexed line number in the original source.
    pub number: usize,
    /// The line with comments stripped and whitespace collapsed.
    pub text: String,
}

/// Strips `;` comments, collapses runs of whitespace and drops blank
/// lines, keeping original line numbers for error reporting.
#[must_use]
pub fn clean_source(source: &str) -> Vec<CleanLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, raw)| {
            let uncommented = raw.split(';').next().unwrap_or("");
            let text = uncommented.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                None
            } else {
                Some(CleanLine {
                    number: index + 1,
                    text,
                })
            }
        })
        .collect()
}

/// Error during source line parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Kind of error.
    pub kind: ParseErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Classification of parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Data line without a `name: value` separator.
    MissingSeparator,
    /// `buf` directive with a bad length or initializer.
    BadBuffer(String),
    /// Data value that is not a number, string, buffer or name.
    BadValue(String),
    /// Operand token in no recognized form.
    BadOperand(String),
    /// `%` operand naming no architectural register.
    UnknownRegister(String),
    /// Instruction line with no mnemonic after its label.
    EmptyStatement,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSeparator => write!(f, "expected 'name: value'"),
            Self::BadBuffer(text) => write!(f, "malformed buf directive: {text}"),
            Self::BadValue(text) => write!(f, "unrecognized data value: {text}"),
            Self::BadOperand(text) => write!(f, "unrecognized operand: {text}"),
            Self::UnknownRegister(text) => write!(f, "unknown register: %{text}"),
            Self::EmptyStatement => write!(f, "label with no instruction"),
        }
    }
}

/// A parsed data definition: a name and the cells it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDefinition {
    /// The variable name.
    pub name: String,
    /// The value form.
    pub value: DataValue,
    /// Source line number.
    pub line: usize,
}

/// The value forms a data line may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataValue {
    /// `buf N [init]`: N cells, zero or init filled.
    Buffer {
        /// Cell count.
        length: usize,
        /// Fill value.
        fill: i32,
    },
    /// A single integer cell.
    Int(i32),
    /// A quoted string: one cell per character plus a NUL terminator.
    Str(String),
    /// The address of a previously defined name.
    Pointer(String),
}

impl DataValue {
    /// How many memory cells this value occupies.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        match self {
            Self::Buffer { length, .. } => *length,
            Self::Int(_) | Self::Pointer(_) => 1,
            Self::Str(text) => text.chars().count() + 1,
        }
    }
}

/// A reference to a memory cell: literal address or a data name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemRef {
    /// A literal cell address.
    Address(i32),
    /// A data-section name, resolved in the symbol pass.
    Name(String),
}

/// An operand as written in the text section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandToken {
    /// A bare integer.
    Immediate(i32),
    /// `%reg`.
    Register(Register),
    /// `#cell`.
    Direct(MemRef),
    /// `*cell`.
    Indirect(MemRef),
    /// `!index`.
    Port(i32),
    /// `.label`, resolved to its address as an immediate.
    Label(String),
    /// `name[k]`, resolved to a direct reference at offset `k`.
    Indexed {
        /// The data-section name.
        name: String,
        /// Cell offset from the name.
        offset: i32,
    },
}

/// A parsed text-section statement, before symbol resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Label defined at this statement, without the leading dot.
    pub label: Option<String>,
    /// The instruction mnemonic as written.
    pub mnemonic: String,
    /// Operand tokens as written; may exceed two before expansion.
    pub operands: Vec<OperandToken>,
    /// Source line number.
    pub line: usize,
}

fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_quoted(text: &str) -> bool {
    text.len() >= 2
        && ((text.starts_with('\'') && text.ends_with('\''))
            || (text.starts_with('"') && text.ends_with('"')))
}

fn parse_int(text: &str, line: usize) -> Result<i32, ParseError> {
    text.parse().map_err(|_| ParseError {
        kind: ParseErrorKind::BadValue(text.to_owned()),
        line,
    })
}

/// Parses one `name: value` data line.
///
/// # Errors
///
/// Returns a [`ParseError`] for a missing separator or an unrecognized
/// value form.
pub fn parse_data_line(line: &CleanLine) -> Result<DataDefinition, ParseError> {
    let Some((name, value_text)) = line.text.split_once(':') else {
        return Err(ParseError {
            kind: ParseErrorKind::MissingSeparator,
            line: line.number,
        });
    };
    let name = name.trim().to_owned();
    let value_text = value_text.trim();

    let value = if let Some(rest) = value_text.strip_prefix("buf ") {
        parse_buffer(rest, value_text, line.number)?
    } else if is_integer(value_text) {
        DataValue::Int(parse_int(value_text, line.number)?)
    } else if is_quoted(value_text) {
        DataValue::Str(value_text[1..value_text.len() - 1].to_owned())
    } else if !value_text.is_empty() && !value_text.contains(' ') {
        DataValue::Pointer(value_text.to_owned())
    } else {
        return Err(ParseError {
            kind: ParseErrorKind::BadValue(value_text.to_owned()),
            line: line.number,
        });
    };

    Ok(DataDefinition {
        name,
        value,
        line: line.number,
    })
}

fn parse_buffer(rest: &str, full: &str, line: usize) -> Result<DataValue, ParseError> {
    let bad = || ParseError {
        kind: ParseErrorKind::BadBuffer(full.to_owned()),
        line,
    };
    let mut fields = rest.split(' ');
    let length = fields
        .next()
        .and_then(|f| f.parse::<usize>().ok())
        .ok_or_else(bad)?;
    let fill = match fields.next() {
        None => 0,
        Some(field) => field.parse().map_err(|_| bad())?,
    };
    if fields.next().is_some() {
        return Err(bad());
    }
    Ok(DataValue::Buffer { length, fill })
}

/// Parses one text-section statement. A leading `.name:` defines a
/// label; the rest of the line may be empty, in which case the label
/// binds to the next statement.
///
/// # Errors
///
/// Returns a [`ParseError`] for unrecognized operand forms.
pub fn parse_statement(line: &CleanLine) -> Result<Statement, ParseError> {
    let (label, rest) = match line.text.strip_prefix('.') {
        Some(labelled) => {
            let Some((name, rest)) = labelled.split_once(':') else {
                return Err(ParseError {
                    kind: ParseErrorKind::MissingSeparator,
                    line: line.number,
                });
            };
            (Some(name.trim().to_owned()), rest.trim())
        }
        None => (None, line.text.as_str()),
    };

    let mut fields = rest.split(' ').filter(|f| !f.is_empty());
    let mnemonic = fields.next().unwrap_or("").to_owned();
    let operands = fields
        .map(|field| parse_operand(field, line.number))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Statement {
        label,
        mnemonic,
        operands,
        line: line.number,
    })
}

fn parse_operand(field: &str, line: usize) -> Result<OperandToken, ParseError> {
    let bad = |kind| ParseError { kind, line };

    if is_integer(field) {
        return Ok(OperandToken::Immediate(parse_int(field, line)?));
    }
    if let Some(name) = field.strip_prefix('%') {
        return Register::from_name(name).map(OperandToken::Register).ok_or_else(|| {
            bad(ParseErrorKind::UnknownRegister(name.to_owned()))
        });
    }
    if let Some(cell) = field.strip_prefix('#') {
        return Ok(OperandToken::Direct(parse_mem_ref(cell)));
    }
    if let Some(cell) = field.strip_prefix('*') {
        return Ok(OperandToken::Indirect(parse_mem_ref(cell)));
    }
    if let Some(index) = field.strip_prefix('!') {
        return index
            .parse()
            .map(OperandToken::Port)
            .map_err(|_| bad(ParseErrorKind::BadOperand(field.to_owned())));
    }
    if let Some(label) = field.strip_prefix('.') {
        return Ok(OperandToken::Label(label.to_owned()));
    }
    if let Some((name, bracketed)) = field.split_once('[') {
        if let Some(offset) = bracketed.strip_suffix(']') {
            if let Ok(offset) = offset.parse() {
                return Ok(OperandToken::Indexed {
                    name: name.to_owned(),
                    offset,
                });
            }
        }
    }
    Err(bad(ParseErrorKind::BadOperand(field.to_owned())))
}

fn parse_mem_ref(cell: &str) -> MemRef {
    cell.parse().map_or_else(|_| MemRef::Name(cell.to_owned()), MemRef::Address)
}
