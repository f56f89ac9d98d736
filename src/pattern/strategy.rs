// Wed Jul 29 2026 - Alex

use crate::pattern::PatternCell;
use std::fmt;

/// The scan strategy chosen for a pattern, with the auxiliary data the
/// matching kernel needs. Selected once when the pattern is compiled.
#[derive(Debug, Clone)]
pub enum ScanStrategy {
    /// No wildcards. Carries a contiguous copy of the bytes and the
    /// Boyer-Moore-Horspool skip table.
    Simple {
        bytes: Vec<u8>,
        skip: Box<[usize; 256]>,
    },
    /// Solid first cell, wildcard last cell. Anchored on the first byte.
    ForwardAnchor { first: u8 },
    /// Wildcard first cell, solid last cell. Anchored on the last byte.
    BackwardAnchor { last: u8 },
    /// Solid on both ends with wildcards in between.
    DualAnchor { first: u8, last: u8 },
    /// Wildcards on both ends. The anchor is picked at scan time.
    DynamicAnchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Simple,
    ForwardAnchor,
    BackwardAnchor,
    DualAnchor,
    DynamicAnchor,
}

impl ScanStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ScanStrategy::Simple { .. } => StrategyKind::Simple,
            ScanStrategy::ForwardAnchor { .. } => StrategyKind::ForwardAnchor,
            ScanStrategy::BackwardAnchor { .. } => StrategyKind::BackwardAnchor,
            ScanStrategy::DualAnchor { .. } => StrategyKind::DualAnchor,
            ScanStrategy::DynamicAnchor => StrategyKind::DynamicAnchor,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Simple => "simple",
            StrategyKind::ForwardAnchor => "forward-anchor",
            StrategyKind::BackwardAnchor => "backward-anchor",
            StrategyKind::DualAnchor => "dual-anchor",
            StrategyKind::DynamicAnchor => "dynamic-anchor",
        };
        write!(f, "{}", name)
    }
}

/// Classify a cell sequence into its scan strategy.
pub(crate) fn analyze(cells: &[PatternCell]) -> ScanStrategy {
    if cells.is_empty() {
        // Degenerate: scanning an empty pattern always reports not-found,
        // the kernel never consults the table.
        return ScanStrategy::Simple {
            bytes: Vec::new(),
            skip: Box::new([0; 256]),
        };
    }

    let has_wildcard = cells.iter().any(|c| c.wildcard);
    let first_is_wildcard = cells[0].wildcard;
    let last_is_wildcard = cells[cells.len() - 1].wildcard;

    if !has_wildcard {
        let bytes: Vec<u8> = cells.iter().map(|c| c.value).collect();
        let skip = build_skip_table(&bytes);
        ScanStrategy::Simple { bytes, skip }
    } else if !first_is_wildcard && !last_is_wildcard {
        ScanStrategy::DualAnchor {
            first: cells[0].value,
            last: cells[cells.len() - 1].value,
        }
    } else if !first_is_wildcard {
        ScanStrategy::ForwardAnchor {
            first: cells[0].value,
        }
    } else if !last_is_wildcard {
        ScanStrategy::BackwardAnchor {
            last: cells[cells.len() - 1].value,
        }
    } else {
        ScanStrategy::DynamicAnchor
    }
}

/// Horspool bad-character table: every slot defaults to the pattern length,
/// bytes before the last position shift to align their rightmost occurrence.
/// The last byte is excluded so the in-window byte never yields a zero skip.
pub(crate) fn build_skip_table(bytes: &[u8]) -> Box<[usize; 256]> {
    let n = bytes.len();
    let mut table = Box::new([n; 256]);
    for (i, &b) in bytes.iter().enumerate().take(n.saturating_sub(1)) {
        table[b as usize] = n - 1 - i;
    }
    table
}
