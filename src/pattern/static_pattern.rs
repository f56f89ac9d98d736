// Fri Jul 31 2026 - Alex

//! Const-evaluable signature variant.
//!
//! `StaticPattern` holds its cells in a fixed 256-slot array so the whole
//! pattern, including strategy classification and the Horspool skip table,
//! can be built in a `const` context:
//!
//! ```
//! use sigscan::StaticPattern;
//!
//! const CALL_SITE: StaticPattern = StaticPattern::compile("E8 ?? ?? ?? ?? 48 8B");
//! ```
//!
//! Scanning goes through the exact same kernels as the runtime `Pattern`.

use crate::engine::CancelToken;
use crate::pattern::kernels;
use crate::pattern::pattern::hex_value;
use crate::pattern::strategy::StrategyKind;
use crate::pattern::{PatternCell, PatternError, Signature};
use std::fmt;

/// Cell capacity of a static pattern. Longer signatures need the runtime
/// `Pattern`, which is unbounded.
pub const MAX_STATIC_CELLS: usize = 256;

#[derive(Debug, Clone)]
pub struct StaticPattern {
    cells: [PatternCell; MAX_STATIC_CELLS],
    bytes: [u8; MAX_STATIC_CELLS],
    skip: [usize; 256],
    len: usize,
    kind: StrategyKind,
}

impl StaticPattern {
    /// Parse at compile time, panicking on malformed or oversized input.
    /// Intended for `const` items where the literal is known good.
    pub const fn compile(text: &str) -> Self {
        match Self::try_compile(text) {
            Ok(pattern) => pattern,
            Err(PatternError::InvalidSyntax(_)) => panic!("invalid signature literal"),
            Err(PatternError::OverLength(_)) => panic!("signature literal exceeds 256 cells"),
        }
    }

    /// Parse the same grammar as `Pattern::parse`, capped at 256 cells.
    pub const fn try_compile(text: &str) -> Result<Self, PatternError> {
        let src = text.as_bytes();
        let mut cells = [PatternCell::byte(0); MAX_STATIC_CELLS];
        let mut len = 0usize;
        let mut i = 0usize;

        while i < src.len() {
            let c = src[i];
            if c == b' ' {
                i += 1;
                continue;
            }
            if c == b'?' {
                if len == MAX_STATIC_CELLS {
                    return Err(PatternError::OverLength(len + 1));
                }
                cells[len] = PatternCell::wildcard();
                len += 1;
                i += 1;
                if i < src.len() && src[i] == b'?' {
                    i += 1;
                }
                continue;
            }
            let hi = match hex_value(c) {
                Some(v) => v,
                None => return Err(PatternError::InvalidSyntax(i)),
            };
            if i + 1 >= src.len() {
                return Err(PatternError::InvalidSyntax(i));
            }
            let lo = match hex_value(src[i + 1]) {
                Some(v) => v,
                None => return Err(PatternError::InvalidSyntax(i + 1)),
            };
            if len == MAX_STATIC_CELLS {
                return Err(PatternError::OverLength(len + 1));
            }
            cells[len] = PatternCell::byte((hi << 4) | lo);
            len += 1;
            i += 2;
        }

        let bytes = collect_values(&cells, len);
        Ok(Self {
            cells,
            bytes,
            skip: build_skip(&bytes, len),
            len,
            kind: classify(&cells, len),
        })
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn strategy_kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn cells(&self) -> &[PatternCell] {
        &self.cells[..self.len]
    }

    fn solid_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl PartialEq for StaticPattern {
    fn eq(&self, other: &Self) -> bool {
        self.cells() == other.cells()
    }
}

impl Eq for StaticPattern {}

impl fmt::Display for StaticPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cell) in self.cells().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if cell.wildcard {
                write!(f, "??")?;
            } else {
                write!(f, "{:02X}", cell.value)?;
            }
        }
        Ok(())
    }
}

impl Signature for StaticPattern {
    fn cells(&self) -> &[PatternCell] {
        &self.cells[..self.len]
    }

    fn find_in(&self, data: &[u8], cancel: &CancelToken) -> Option<usize> {
        let cells = &self.cells[..self.len];
        match self.kind {
            StrategyKind::Simple => {
                kernels::scan_simple(self.solid_bytes(), &self.skip, data, cancel)
            }
            StrategyKind::ForwardAnchor => {
                kernels::scan_forward_anchor(cells, self.cells[0].value, data, cancel)
            }
            StrategyKind::BackwardAnchor => {
                kernels::scan_backward_anchor(cells, self.cells[self.len - 1].value, data, cancel)
            }
            StrategyKind::DualAnchor => kernels::scan_dual_anchor(
                cells,
                self.cells[0].value,
                self.cells[self.len - 1].value,
                data,
                cancel,
            ),
            StrategyKind::DynamicAnchor => kernels::scan_dynamic_anchor(cells, data, cancel),
        }
    }
}

const fn collect_values(
    cells: &[PatternCell; MAX_STATIC_CELLS],
    len: usize,
) -> [u8; MAX_STATIC_CELLS] {
    let mut bytes = [0u8; MAX_STATIC_CELLS];
    let mut i = 0;
    while i < len {
        bytes[i] = cells[i].value;
        i += 1;
    }
    bytes
}

const fn classify(cells: &[PatternCell; MAX_STATIC_CELLS], len: usize) -> StrategyKind {
    if len == 0 {
        return StrategyKind::Simple;
    }

    let mut has_wildcard = false;
    let mut i = 0;
    while i < len {
        if cells[i].wildcard {
            has_wildcard = true;
            break;
        }
        i += 1;
    }

    let first_is_wildcard = cells[0].wildcard;
    let last_is_wildcard = cells[len - 1].wildcard;

    if !has_wildcard {
        StrategyKind::Simple
    } else if !first_is_wildcard && !last_is_wildcard {
        StrategyKind::DualAnchor
    } else if !first_is_wildcard {
        StrategyKind::ForwardAnchor
    } else if !last_is_wildcard {
        StrategyKind::BackwardAnchor
    } else {
        StrategyKind::DynamicAnchor
    }
}

const fn build_skip(bytes: &[u8; MAX_STATIC_CELLS], len: usize) -> [usize; 256] {
    let mut table = [len; 256];
    if len == 0 {
        return table;
    }
    let mut i = 0;
    while i + 1 < len {
        table[bytes[i] as usize] = len - 1 - i;
        i += 1;
    }
    table
}
