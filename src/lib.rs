// Wed Jul 29 2026 - Alex

//! High-throughput binary signature scanner.
//!
//! Compile a byte pattern with single-byte wildcards, then find its first
//! occurrence in a borrowed memory range:
//!
//! ```
//! use sigscan::{compile, Address, MemoryRegion, PatternScanner};
//!
//! let pattern = compile("48 8B ?? ?? 05").unwrap();
//! let image = [0u8; 64];
//! let region = MemoryRegion::new(Address::new(0x10_0000), &image);
//! assert_eq!(PatternScanner::new().scan(&pattern, &region), None);
//! ```
//!
//! Patterns are classified at compile time into one of five scan
//! strategies; large ranges are split into overlapping chunks and spread
//! over a process-wide work-stealing worker pool, with the first hit
//! cancelling the remaining chunks.

pub mod engine;
pub mod memory;
pub mod pattern;
pub mod utils;

pub use engine::{CancelToken, WorkStealingQueue, WorkerPool};
pub use memory::{scan, scan_many, Address, MemoryRegion, PatternScanner};
pub use pattern::{
    compile, Pattern, PatternCell, PatternError, ScanStrategy, Signature, StaticPattern,
    StrategyKind,
};
