// Wed Jul 29 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternError {
    #[error("Invalid pattern syntax at offset {0}")]
    InvalidSyntax(usize),
    #[error("Pattern too long: {0} cells")]
    OverLength(usize),
}
