//! Symbol table shared by data names and text labels.
//!
//! Data names and labels live in one table; label keys keep their
//! leading dot so the two namespaces cannot collide. `JMPS` (cell 0, the
//! entry word) and `INT` (cell 1, the interrupt vector) are reserved
//! before the data section is read.

use std::collections::HashMap;

/// A symbol with its assigned absolute address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Absolute memory address.
    pub address: i32,
    /// Source line of the definition, zero for reserved names.
    pub defined_at: usize,
}

/// Error during symbol definition or lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolError {
    /// Kind of error.
    pub kind: SymbolErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Classification of symbol errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolErrorKind {
    /// A name or label defined twice.
    Duplicate {
        /// The offending name.
        name: String,
        /// Line of the first definition.
        first_definition: usize,
    },
    /// A reference to a name or label never defined.
    Undefined(String),
}

impl std::fmt::Display for SymbolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::fmt::Display for SymbolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate {
                name,
                first_definition,
            } => write!(
                f,
                "duplicate definition of '{name}' (first defined at line {first_definition})"
            ),
            Self::Undefined(name) => write!(f, "undefined name: {name}"),
        }
    }
}

/// Name-to-address table built during the first pass.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Creates a table with the reserved `JMPS` and `INT` cells defined.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        for (name, address) in [("JMPS", 0), ("INT", 1)] {
            entries.insert(
                name.to_owned(),
                Symbol {
                    address,
                    defined_at: 0,
                },
            );
        }
        Self { entries }
    }

    /// Defines a name at an address.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolErrorKind::Duplicate`] when the name already
    /// exists, reserved names included.
    pub fn define(&mut self, name: &str, address: i32, line: usize) -> Result<(), SymbolError> {
        if let Some(existing) = self.entries.get(name) {
            return Err(SymbolError {
                kind: SymbolErrorKind::Duplicate {
                    name: name.to_owned(),
                    first_definition: existing.defined_at,
                },
                line,
            });
        }
        self.entries.insert(
            name.to_owned(),
            Symbol {
                address,
                defined_at: line,
            },
        );
        Ok(())
    }

    /// Resolves a name to its address.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolErrorKind::Undefined`] for unknown names.
    pub fn resolve(&self, name: &str, line: usize) -> Result<i32, SymbolError> {
        self.entries
            .get(name)
            .map(|symbol| symbol.address)
            .ok_or_else(|| SymbolError {
                kind: SymbolErrorKind::Undefined(name.to_owned()),
                line,
            })
    }
}
