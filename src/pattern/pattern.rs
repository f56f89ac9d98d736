// Wed Jul 29 2026 - Alex

use crate::engine::CancelToken;
use crate::pattern::kernels;
use crate::pattern::strategy::{self, ScanStrategy, StrategyKind};
use crate::pattern::{PatternError, Signature};
use std::fmt;

/// One position of a signature: a concrete byte or a single-byte wildcard.
///
/// When `wildcard` is set the `value` field carries no meaning and must not
/// be consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternCell {
    pub value: u8,
    pub wildcard: bool,
}

impl PatternCell {
    pub const fn byte(value: u8) -> Self {
        Self {
            value,
            wildcard: false,
        }
    }

    pub const fn wildcard() -> Self {
        Self {
            value: 0,
            wildcard: true,
        }
    }
}

/// A compiled signature: the parsed cell sequence plus the scan strategy
/// selected for it at construction time.
///
/// Compiling is the only fallible step; scanning a compiled pattern never
/// fails, it just reports "not found".
#[derive(Debug, Clone)]
pub struct Pattern {
    cells: Vec<PatternCell>,
    strategy: ScanStrategy,
}

impl Pattern {
    /// Parse a textual signature such as `"48 8B ?? ?? 05"`.
    ///
    /// Tokens are two hex digits (case-insensitive) or a wildcard written as
    /// `?` or `??`, separated by optional runs of spaces. A trailing lone hex
    /// digit or any other character is rejected.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let src = text.as_bytes();
        let mut cells = Vec::with_capacity(src.len() / 2);
        let mut i = 0usize;

        while i < src.len() {
            match src[i] {
                b' ' => i += 1,
                b'?' => {
                    cells.push(PatternCell::wildcard());
                    i += 1;
                    // "??" is a single wildcard cell, not two.
                    if i < src.len() && src[i] == b'?' {
                        i += 1;
                    }
                }
                c => {
                    let hi = hex_value(c).ok_or(PatternError::InvalidSyntax(i))?;
                    if i + 1 >= src.len() {
                        return Err(PatternError::InvalidSyntax(i));
                    }
                    let lo = hex_value(src[i + 1]).ok_or(PatternError::InvalidSyntax(i + 1))?;
                    cells.push(PatternCell::byte((hi << 4) | lo));
                    i += 2;
                }
            }
        }

        Ok(Self::from_cells(cells))
    }

    /// Build a pattern from already-parsed cells.
    pub fn from_cells(cells: Vec<PatternCell>) -> Self {
        let strategy = strategy::analyze(&cells);
        Self { cells, strategy }
    }

    /// Build a wildcard-free pattern from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_cells(bytes.iter().copied().map(PatternCell::byte).collect())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[PatternCell] {
        &self.cells
    }

    pub fn strategy(&self) -> &ScanStrategy {
        &self.strategy
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn wildcard_count(&self) -> usize {
        self.cells.iter().filter(|c| c.wildcard).count()
    }

    pub fn solid_count(&self) -> usize {
        self.cells.len() - self.wildcard_count()
    }

    /// Canonical text form: uppercase hex bytes and `??` wildcards separated
    /// by single spaces. Parsing the result yields an equal pattern.
    pub fn to_hex_string(&self) -> String {
        self.cells
            .iter()
            .map(|c| {
                if c.wildcard {
                    "??".to_string()
                } else {
                    format!("{:02X}", c.value)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Pattern {}

impl Signature for Pattern {
    fn cells(&self) -> &[PatternCell] {
        &self.cells
    }

    fn find_in(&self, data: &[u8], cancel: &CancelToken) -> Option<usize> {
        match &self.strategy {
            ScanStrategy::Simple { bytes, skip } => kernels::scan_simple(bytes, skip, data, cancel),
            ScanStrategy::ForwardAnchor { first } => {
                kernels::scan_forward_anchor(&self.cells, *first, data, cancel)
            }
            ScanStrategy::BackwardAnchor { last } => {
                kernels::scan_backward_anchor(&self.cells, *last, data, cancel)
            }
            ScanStrategy::DualAnchor { first, last } => {
                kernels::scan_dual_anchor(&self.cells, *first, *last, data, cancel)
            }
            ScanStrategy::DynamicAnchor => kernels::scan_dynamic_anchor(&self.cells, data, cancel),
        }
    }
}

pub(crate) const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
