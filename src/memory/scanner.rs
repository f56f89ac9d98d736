// Fri Jul 31 2026 - Alex

use crate::engine::{CancelToken, WorkerPool};
use crate::memory::{Address, MemoryRegion};
use crate::pattern::Signature;
use log::debug;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Chunk length for parallel scans. Overlap between neighbouring chunks is
/// the pattern length minus one, so a match straddling a boundary is fully
/// contained in the earlier chunk.
pub const SCAN_CHUNK_SIZE: usize = 256 * 1024;

/// Range driver: dispatches a compiled signature over one or more memory
/// regions, serially or across the global worker pool.
///
/// Serial `scan_many` reports the first match of the first region (in
/// caller order) that contains one. Parallel `scan_many` reports the lowest
/// absolute address across all regions; within a single region both modes
/// always report the lowest address.
pub struct PatternScanner {
    chunk_size: usize,
    parallel: bool,
}

impl PatternScanner {
    pub fn new() -> Self {
        Self {
            chunk_size: SCAN_CHUNK_SIZE,
            parallel: cfg!(feature = "parallel"),
        }
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        assert!(size > 0, "chunk size must be non-zero");
        self.chunk_size = size;
        self
    }

    pub fn use_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Find the lowest address in `region` where the signature matches.
    pub fn scan<S: Signature>(&self, sig: &S, region: &MemoryRegion<'_>) -> Option<Address> {
        let n = sig.len();
        if n == 0 || region.len() < n {
            return None;
        }

        if self.parallel {
            let pool = WorkerPool::global();
            // Small ranges are not worth the submission overhead; the
            // serial kernel returns the same address.
            if pool.worker_count() > 1 && region.len() >= self.chunk_size * pool.worker_count() {
                return self.scan_region_parallel(sig, region);
            }
        }
        self.scan_serial(sig, region)
    }

    /// Scan an ordered list of regions. See the type docs for the ordering
    /// semantics of the serial and parallel modes.
    pub fn scan_many<S: Signature>(
        &self,
        sig: &S,
        regions: &[MemoryRegion<'_>],
    ) -> Option<Address> {
        let n = sig.len();
        if n == 0 {
            return None;
        }

        if !self.parallel {
            let cancel = CancelToken::new();
            return regions.iter().find_map(|region| {
                sig.find_in(region.data(), &cancel)
                    .map(|off| region.base() + off as u64)
            });
        }

        let pool = WorkerPool::global();
        let cancel = Arc::new(CancelToken::new());
        let (tx, rx) = mpsc::channel();
        let mut submitted = 0;
        for region in regions {
            if region.len() < n {
                continue;
            }
            // Modest regions go in whole; only ranges that would produce at
            // least two full chunks are split.
            let split = region.len() >= 2 * self.chunk_size;
            submitted += self.submit_region(pool, sig, region, &cancel, &tx, split);
        }
        drop(tx);
        debug!("parallel scan_many over {} tasks", submitted);
        collect_lowest(&rx, submitted)
    }

    fn scan_serial<S: Signature>(&self, sig: &S, region: &MemoryRegion<'_>) -> Option<Address> {
        let cancel = CancelToken::new();
        sig.find_in(region.data(), &cancel)
            .map(|off| region.base() + off as u64)
    }

    fn scan_region_parallel<S: Signature>(
        &self,
        sig: &S,
        region: &MemoryRegion<'_>,
    ) -> Option<Address> {
        let pool = WorkerPool::global();
        let cancel = Arc::new(CancelToken::new());
        let (tx, rx) = mpsc::channel();
        let submitted = self.submit_region(pool, sig, region, &cancel, &tx, true);
        drop(tx);
        debug!(
            "parallel scan of {} bytes in {} chunks",
            region.len(),
            submitted
        );
        collect_lowest(&rx, submitted)
    }

    /// Queue scan tasks for one region, either whole or in overlapping
    /// chunks, and return how many were submitted.
    fn submit_region<S: Signature>(
        &self,
        pool: &WorkerPool,
        sig: &S,
        region: &MemoryRegion<'_>,
        cancel: &Arc<CancelToken>,
        tx: &Sender<Option<Address>>,
        split: bool,
    ) -> usize {
        let n = sig.len();
        let data = region.data();
        let find = erased_find::<S> as ErasedFind;
        let sig_ptr = sig as *const S as *const ();

        if !split {
            let task = ChunkTask {
                find,
                sig: sig_ptr,
                ptr: data.as_ptr(),
                len: data.len(),
                base: region.base(),
            };
            submit_chunk(pool, task, cancel.clone(), tx.clone());
            return 1;
        }

        let overlap = n.saturating_sub(1);
        let mut submitted = 0;
        for start in (0..data.len()).step_by(self.chunk_size) {
            let end = (start + self.chunk_size + overlap).min(data.len());
            if end - start < n {
                continue;
            }
            let task = ChunkTask {
                find,
                sig: sig_ptr,
                ptr: data[start..].as_ptr(),
                len: end - start,
                base: region.base() + start as u64,
            };
            submit_chunk(pool, task, cancel.clone(), tx.clone());
            submitted += 1;
        }
        submitted
    }
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self::new()
    }
}

type ErasedFind = unsafe fn(*const (), &[u8], &CancelToken) -> Option<usize>;

unsafe fn erased_find<S: Signature>(
    sig: *const (),
    data: &[u8],
    cancel: &CancelToken,
) -> Option<usize> {
    (*(sig as *const S)).find_in(data, cancel)
}

/// Raw view of one chunk. The pointers stay valid because the driver does
/// not return until the result channel has produced one message per
/// submitted task, and an unrun task dropped at pool shutdown closes its
/// channel end without touching the pointers.
struct ChunkTask {
    find: ErasedFind,
    sig: *const (),
    ptr: *const u8,
    len: usize,
    base: Address,
}

unsafe impl Send for ChunkTask {}

fn submit_chunk(
    pool: &WorkerPool,
    task: ChunkTask,
    cancel: Arc<CancelToken>,
    tx: Sender<Option<Address>>,
) {
    pool.submit(Box::new(move || {
        let task = task;
        let data = unsafe { std::slice::from_raw_parts(task.ptr, task.len) };
        let hit = unsafe { (task.find)(task.sig, data, &cancel) };
        let _ = tx.send(hit.map(|off| task.base + off as u64));
    }));
}

/// Chunk completion order is unspecified, so every result is drained and
/// the minimum address wins.
fn collect_lowest(rx: &Receiver<Option<Address>>, submitted: usize) -> Option<Address> {
    let mut best: Option<Address> = None;
    for _ in 0..submitted {
        match rx.recv() {
            Ok(Some(addr)) => best = Some(best.map_or(addr, |b| b.min(addr))),
            Ok(None) => {}
            Err(_) => break,
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Pattern, StaticPattern};

    const BASE: u64 = 0x10_0000;

    fn region(data: &[u8]) -> MemoryRegion<'_> {
        MemoryRegion::new(Address::new(BASE), data)
    }

    fn filled(len: usize) -> Vec<u8> {
        vec![0xCDu8; len]
    }

    #[test]
    fn test_serial_simple_hit() {
        let mut data = filled(256);
        data[100..103].copy_from_slice(&[0x12, 0x34, 0x56]);
        let pattern = Pattern::parse("12 34 56").unwrap();
        let scanner = PatternScanner::new().use_parallel(false);
        assert_eq!(
            scanner.scan(&pattern, &region(&data)),
            Some(Address::new(BASE + 100))
        );
    }

    #[test]
    fn test_empty_pattern_not_found() {
        let data = filled(64);
        let pattern = Pattern::parse("").unwrap();
        let scanner = PatternScanner::new();
        assert_eq!(scanner.scan(&pattern, &region(&data)), None);
        assert_eq!(scanner.scan_many(&pattern, &[region(&data)]), None);
    }

    #[test]
    fn test_short_range_not_found() {
        let data = [0x12u8, 0x34];
        let pattern = Pattern::parse("12 34 56").unwrap();
        let scanner = PatternScanner::new();
        assert_eq!(scanner.scan(&pattern, &region(&data)), None);
    }

    #[test]
    fn test_all_wildcards_not_found() {
        let data = filled(256);
        let pattern = Pattern::parse("?? ?? ??").unwrap();
        let scanner = PatternScanner::new();
        assert_eq!(scanner.scan(&pattern, &region(&data)), None);
    }

    #[test]
    fn test_chunk_boundary_straddle() {
        // Chunk size 4 with a 4-byte pattern: the hit at offset 3 crosses
        // the first chunk boundary and must be caught by chunk 0's overlap.
        let mut data = filled(4096);
        data[3..7].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let pattern = Pattern::parse("DE AD BE EF").unwrap();
        let scanner = PatternScanner::new().use_parallel(true).with_chunk_size(4);
        assert_eq!(
            scanner.scan(&pattern, &region(&data)),
            Some(Address::new(BASE + 3))
        );
    }

    #[test]
    fn test_parallel_matches_serial() {
        let mut data = filled(64 * 1024);
        data[40_000..40_004].copy_from_slice(&[0x48, 0x12, 0x34, 0x8B]);
        let pattern = Pattern::parse("48 ?? ?? 8B").unwrap();

        let serial = PatternScanner::new().use_parallel(false);
        let parallel = PatternScanner::new().use_parallel(true).with_chunk_size(512);
        assert_eq!(
            parallel.scan(&pattern, &region(&data)),
            serial.scan(&pattern, &region(&data))
        );
    }

    #[test]
    fn test_parallel_returns_lowest_of_many() {
        let mut data = filled(32 * 1024);
        for &offset in &[29_000usize, 12_000, 500] {
            data[offset..offset + 3].copy_from_slice(&[0x12, 0x34, 0x56]);
        }
        let pattern = Pattern::parse("12 34 56").unwrap();
        let scanner = PatternScanner::new().use_parallel(true).with_chunk_size(256);
        assert_eq!(
            scanner.scan(&pattern, &region(&data)),
            Some(Address::new(BASE + 500))
        );
    }

    #[test]
    fn test_scan_many_serial_takes_first_region_in_order() {
        let mut low = filled(128);
        low[10..13].copy_from_slice(&[0x12, 0x34, 0x56]);
        let mut high = filled(128);
        high[90..93].copy_from_slice(&[0x12, 0x34, 0x56]);

        // The higher-addressed region comes first in caller order; serial
        // mode must honour that order, not the address order.
        let regions = [
            MemoryRegion::new(Address::new(0x9000), &high),
            MemoryRegion::new(Address::new(0x1000), &low),
        ];
        let pattern = Pattern::parse("12 34 56").unwrap();
        let scanner = PatternScanner::new().use_parallel(false);
        assert_eq!(
            scanner.scan_many(&pattern, &regions),
            Some(Address::new(0x9000 + 90))
        );
    }

    #[test]
    fn test_scan_many_parallel_takes_lowest_address() {
        let mut low = filled(128);
        low[10..13].copy_from_slice(&[0x12, 0x34, 0x56]);
        let mut high = filled(128);
        high[90..93].copy_from_slice(&[0x12, 0x34, 0x56]);

        let regions = [
            MemoryRegion::new(Address::new(0x9000), &high),
            MemoryRegion::new(Address::new(0x1000), &low),
        ];
        let pattern = Pattern::parse("12 34 56").unwrap();
        let scanner = PatternScanner::new().use_parallel(true);
        assert_eq!(
            scanner.scan_many(&pattern, &regions),
            Some(Address::new(0x1000 + 10))
        );
    }

    #[test]
    fn test_scan_many_skips_short_regions() {
        let tiny = [0x12u8, 0x34];
        let mut data = filled(64);
        data[20..23].copy_from_slice(&[0x12, 0x34, 0x56]);
        let regions = [
            MemoryRegion::new(Address::new(0x100), &tiny),
            MemoryRegion::new(Address::new(0x1000), &data),
        ];
        let pattern = Pattern::parse("12 34 56").unwrap();
        for parallel in [false, true] {
            let scanner = PatternScanner::new().use_parallel(parallel);
            assert_eq!(
                scanner.scan_many(&pattern, &regions),
                Some(Address::new(0x1000 + 20)),
                "parallel={}",
                parallel
            );
        }
    }

    #[test]
    fn test_scan_many_empty_list() {
        let pattern = Pattern::parse("12 34").unwrap();
        let scanner = PatternScanner::new();
        assert_eq!(scanner.scan_many(&pattern, &[]), None);
    }

    #[test]
    fn test_large_region_in_scan_many_is_chunked() {
        let chunk = 512;
        let mut data = filled(8 * chunk);
        data[3000..3004].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let pattern = Pattern::parse("DE AD BE EF").unwrap();
        let scanner = PatternScanner::new()
            .use_parallel(true)
            .with_chunk_size(chunk);
        let regions = [MemoryRegion::new(Address::new(0x4000), &data)];
        assert_eq!(
            scanner.scan_many(&pattern, &regions),
            Some(Address::new(0x4000 + 3000))
        );
    }

    #[test]
    fn test_match_at_very_end_survives_chunking() {
        let mut data = filled(4096);
        let end = data.len() - 4;
        data[end..].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let pattern = Pattern::parse("DE AD BE EF").unwrap();
        let scanner = PatternScanner::new().use_parallel(true).with_chunk_size(64);
        assert_eq!(
            scanner.scan(&pattern, &region(&data)),
            Some(Address::new(BASE + end as u64))
        );
    }

    #[test]
    fn test_static_pattern_through_driver() {
        const SIG: StaticPattern = StaticPattern::compile("48 ?? ?? 8B");
        let mut data = filled(256);
        data[50..54].copy_from_slice(&[0x48, 0x12, 0x34, 0x8B]);
        let scanner = PatternScanner::new();
        assert_eq!(
            scanner.scan(&SIG, &region(&data)),
            Some(Address::new(BASE + 50))
        );
    }

    #[test]
    fn test_deterministic_across_repeats() {
        let mut data = filled(16 * 1024);
        data[9_999..10_003].copy_from_slice(&[0x48, 0x12, 0x34, 0x8B]);
        let pattern = Pattern::parse("48 ?? ?? 8B").unwrap();
        let scanner = PatternScanner::new().use_parallel(true).with_chunk_size(128);
        let first = scanner.scan(&pattern, &region(&data));
        for _ in 0..16 {
            assert_eq!(scanner.scan(&pattern, &region(&data)), first);
        }
        assert_eq!(first, Some(Address::new(BASE + 9_999)));
    }
}
