// Wed Jul 29 2026 - Alex

pub mod address;
pub mod region;
pub mod scanner;

pub use address::Address;
pub use region::MemoryRegion;
pub use scanner::{PatternScanner, SCAN_CHUNK_SIZE};

use crate::pattern::Signature;

/// Scan one region with the default scanner configuration.
pub fn scan<S: Signature>(sig: &S, region: &MemoryRegion<'_>) -> Option<Address> {
    PatternScanner::new().scan(sig, region)
}

/// Scan an ordered list of regions with the default scanner configuration.
pub fn scan_many<S: Signature>(sig: &S, regions: &[MemoryRegion<'_>]) -> Option<Address> {
    PatternScanner::new().scan_many(sig, regions)
}
