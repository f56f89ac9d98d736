// Wed Jul 29 2026 - Alex

//! Per-strategy search kernels.
//!
//! Every kernel takes the haystack and a cancellation token, returns the
//! lowest matching offset, checks the token once per outer-loop step, and
//! sets it before returning a hit so sibling chunk scans can bail out.

use crate::engine::CancelToken;
use crate::pattern::PatternCell;

/// Wildcard-aware comparison of the whole pattern against `window`.
/// The caller guarantees `window.len() >= cells.len()`.
pub(crate) fn full_match_at(cells: &[PatternCell], window: &[u8]) -> bool {
    cells
        .iter()
        .zip(window)
        .all(|(cell, &byte)| cell.wildcard || cell.value == byte)
}

/// Boyer-Moore-Horspool over a wildcard-free pattern.
pub(crate) fn scan_simple(
    bytes: &[u8],
    skip: &[usize; 256],
    data: &[u8],
    cancel: &CancelToken,
) -> Option<usize> {
    let n = bytes.len();
    if n == 0 || data.len() < n {
        return None;
    }

    let last = bytes[n - 1];
    let mut i = 0usize;
    while i <= data.len() - n {
        if cancel.is_cancelled() {
            return None;
        }
        let tail = data[i + n - 1];
        if tail == last && (n == 1 || data[i..i + n - 1] == bytes[..n - 1]) {
            cancel.cancel();
            return Some(i);
        }
        i += skip[tail as usize];
    }
    None
}

/// Anchor on the solid first byte, verify the rest at each occurrence.
pub(crate) fn scan_forward_anchor(
    cells: &[PatternCell],
    first: u8,
    data: &[u8],
    cancel: &CancelToken,
) -> Option<usize> {
    let n = cells.len();
    if data.len() < n {
        return None;
    }

    let mut pos = 0usize;
    while let Some(found) = memchr::memchr(first, &data[pos..]) {
        let start = pos + found;
        if cancel.is_cancelled() {
            return None;
        }
        if start + n > data.len() {
            break;
        }
        if full_match_at(cells, &data[start..start + n]) {
            cancel.cancel();
            return Some(start);
        }
        pos = start + 1;
    }
    None
}

/// Anchor on the solid last byte, verify backwards from each occurrence.
pub(crate) fn scan_backward_anchor(
    cells: &[PatternCell],
    last: u8,
    data: &[u8],
    cancel: &CancelToken,
) -> Option<usize> {
    let n = cells.len();
    if data.len() < n || n == 0 {
        return None;
    }

    let last_offset = n - 1;
    let mut pos = 0usize;
    while let Some(found) = memchr::memchr(last, &data[pos..]) {
        let at = pos + found;
        if cancel.is_cancelled() {
            return None;
        }
        pos = at + 1;
        let Some(start) = at.checked_sub(last_offset) else {
            continue;
        };
        if full_match_at(cells, &data[start..start + n]) {
            cancel.cancel();
            return Some(start);
        }
    }
    None
}

/// Anchor on the first byte and short-circuit on the last byte before the
/// full wildcard-aware check.
pub(crate) fn scan_dual_anchor(
    cells: &[PatternCell],
    first: u8,
    last: u8,
    data: &[u8],
    cancel: &CancelToken,
) -> Option<usize> {
    let n = cells.len();
    if data.len() < n || n == 0 {
        return None;
    }

    let mut pos = 0usize;
    while let Some(found) = memchr::memchr(first, &data[pos..]) {
        let start = pos + found;
        if cancel.is_cancelled() {
            return None;
        }
        if start + n > data.len() {
            break;
        }
        if data[start + n - 1] == last && full_match_at(cells, &data[start..start + n]) {
            cancel.cancel();
            return Some(start);
        }
        pos = start + 1;
    }
    None
}

/// Both ends are wildcards: anchor on a solid interior cell.
///
/// With the `simd` feature on a supported target this routes to the
/// vectorized variant with rarity-ranked anchor selection; the portable
/// variant anchors on the first solid cell. Both return identical results.
pub(crate) fn scan_dynamic_anchor(
    cells: &[PatternCell],
    data: &[u8],
    cancel: &CancelToken,
) -> Option<usize> {
    #[cfg(all(
        feature = "simd",
        any(target_arch = "aarch64", target_arch = "x86_64")
    ))]
    {
        crate::pattern::simd::scan_dynamic_anchor(cells, data, cancel)
    }
    #[cfg(not(all(
        feature = "simd",
        any(target_arch = "aarch64", target_arch = "x86_64")
    )))]
    {
        scan_dynamic_anchor_portable(cells, data, cancel)
    }
}

/// Portable dynamic-anchor kernel: seed the scan with the first solid cell.
/// A pattern with no solid cell at all matches nothing.
pub(crate) fn scan_dynamic_anchor_portable(
    cells: &[PatternCell],
    data: &[u8],
    cancel: &CancelToken,
) -> Option<usize> {
    let n = cells.len();
    if data.len() < n || n == 0 {
        return None;
    }

    let anchor_offset = cells.iter().position(|c| !c.wildcard)?;
    let anchor = cells[anchor_offset].value;

    let mut pos = anchor_offset;
    while pos < data.len() {
        let Some(found) = memchr::memchr(anchor, &data[pos..]) else {
            break;
        };
        let at = pos + found;
        if cancel.is_cancelled() {
            return None;
        }
        pos = at + 1;
        let Some(start) = at.checked_sub(anchor_offset) else {
            continue;
        };
        if start + n > data.len() {
            continue;
        }
        if full_match_at(cells, &data[start..start + n]) {
            cancel.cancel();
            return Some(start);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Pattern, Signature};

    fn haystack() -> Vec<u8> {
        vec![0xCD; 256]
    }

    fn token() -> CancelToken {
        CancelToken::new()
    }

    #[test]
    fn test_simple_hit() {
        let mut data = haystack();
        data[100..103].copy_from_slice(&[0x12, 0x34, 0x56]);
        let pattern = Pattern::parse("12 34 56").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(100));
    }

    #[test]
    fn test_simple_single_byte() {
        let mut data = haystack();
        data[7] = 0x42;
        let pattern = Pattern::parse("42").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(7));
    }

    #[test]
    fn test_simple_no_hit() {
        let data = haystack();
        let pattern = Pattern::parse("12 34 56").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), None);
    }

    #[test]
    fn test_forward_anchor_hit() {
        let mut data = haystack();
        data[200..204].copy_from_slice(&[0x48, 0x8B, 0x05, 0xAA]);
        let pattern = Pattern::parse("48 8B ?? AA").unwrap();
        // Solid head with a wildcard tail is the forward-anchor shape.
        let pattern_fwd = Pattern::parse("48 8B ?? ??").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(200));
        assert_eq!(pattern_fwd.find_in(&data, &token()), Some(200));
    }

    #[test]
    fn test_backward_anchor_hit() {
        let mut data = vec![0xCDu8; 512];
        data[300..304].copy_from_slice(&[0xAA, 0xBB, 0xCC, 0x8B]);
        let pattern = Pattern::parse("?? BB CC 8B").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(300));
    }

    #[test]
    fn test_backward_anchor_ignores_early_partial() {
        // Anchor byte occurs before a full window fits in front of it.
        let mut data = vec![0xCDu8; 64];
        data[1] = 0x8B;
        data[40..44].copy_from_slice(&[0xAA, 0xBB, 0xCC, 0x8B]);
        let pattern = Pattern::parse("?? BB CC 8B").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(40));
    }

    #[test]
    fn test_dual_anchor_hit() {
        let mut data = haystack();
        data[50..54].copy_from_slice(&[0x48, 0x12, 0x34, 0x8B]);
        let pattern = Pattern::parse("48 ?? ?? 8B").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(50));
    }

    #[test]
    fn test_dual_anchor_rejects_wrong_tail() {
        let mut data = haystack();
        data[50..54].copy_from_slice(&[0x48, 0x12, 0x34, 0x8C]);
        let pattern = Pattern::parse("48 ?? ?? 8B").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), None);
    }

    #[test]
    fn test_dynamic_anchor_hit() {
        let mut data = vec![0xCDu8; 1024];
        data[600..604].copy_from_slice(&[0xAA, 0x48, 0x8B, 0xBB]);
        let pattern = Pattern::parse("?? 48 8B ??").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(600));
    }

    #[test]
    fn test_dynamic_anchor_near_start() {
        // The anchored cell is not the first cell, so a hit at offset zero
        // exercises the potential-start underflow guard.
        let mut data = vec![0xCDu8; 64];
        data[0..4].copy_from_slice(&[0xAA, 0x48, 0x8B, 0xBB]);
        let pattern = Pattern::parse("?? 48 8B ??").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(0));
    }

    #[test]
    fn test_all_wildcards_is_not_found() {
        let data = haystack();
        let pattern = Pattern::parse("?? ?? ??").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), None);
    }

    #[test]
    fn test_leftmost_of_many() {
        let mut data = haystack();
        data[100..103].copy_from_slice(&[0x12, 0x34, 0x56]);
        data[150..153].copy_from_slice(&[0x12, 0x34, 0x56]);
        let pattern = Pattern::parse("12 34 56").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(100));
    }

    #[test]
    fn test_overlapping_occurrences_leftmost() {
        let mut data = haystack();
        data[10..14].copy_from_slice(&[0xAB, 0xAB, 0xAB, 0xAB]);
        let pattern = Pattern::parse("AB AB").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(10));
    }

    #[test]
    fn test_match_at_base_and_at_end() {
        let mut data = haystack();
        data[0..3].copy_from_slice(&[0x01, 0x02, 0x03]);
        let pattern = Pattern::parse("01 02 03").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(0));

        let mut data = haystack();
        data[253..256].copy_from_slice(&[0x01, 0x02, 0x03]);
        assert_eq!(pattern.find_in(&data, &token()), Some(253));
    }

    #[test]
    fn test_range_shorter_than_pattern() {
        let data = [0x12u8, 0x34];
        let pattern = Pattern::parse("12 34 56").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), None);
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let mut data = haystack();
        data[100..103].copy_from_slice(&[0x12, 0x34, 0x56]);
        let pattern = Pattern::parse("12 34 56").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(pattern.find_in(&data, &cancel), None);
    }

    #[test]
    fn test_kernel_sets_token_on_hit() {
        let mut data = haystack();
        data[100..103].copy_from_slice(&[0x12, 0x34, 0x56]);
        let pattern = Pattern::parse("12 34 56").unwrap();
        let cancel = CancelToken::new();
        assert_eq!(pattern.find_in(&data, &cancel), Some(100));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_strategy_equivalence_on_wildcard_free_pattern() {
        // Every kernel must report the same position when forced onto the
        // same wildcard-free pattern.
        let mut data = vec![0xCDu8; 2048];
        data[777..781].copy_from_slice(&[0x48, 0x12, 0x34, 0x8B]);
        let pattern = Pattern::parse("48 12 34 8B").unwrap();
        let cells = pattern.cells();
        let bytes: Vec<u8> = cells.iter().map(|c| c.value).collect();
        let skip = crate::pattern::strategy::build_skip_table(&bytes);

        let expected = Some(777);
        assert_eq!(scan_simple(&bytes, &skip, &data, &token()), expected);
        assert_eq!(scan_forward_anchor(cells, 0x48, &data, &token()), expected);
        assert_eq!(scan_backward_anchor(cells, 0x8B, &data, &token()), expected);
        assert_eq!(
            scan_dual_anchor(cells, 0x48, 0x8B, &data, &token()),
            expected
        );
        assert_eq!(
            scan_dynamic_anchor_portable(cells, &data, &token()),
            expected
        );
    }

    #[test]
    fn test_bmh_skip_does_not_overshoot() {
        // Repeated prefix bytes force small skips; the window must still
        // land exactly on the match.
        let mut data = vec![0xAAu8; 128];
        data[60..64].copy_from_slice(&[0xAA, 0xAA, 0xAB, 0xAC]);
        let pattern = Pattern::parse("AA AA AB AC").unwrap();
        assert_eq!(pattern.find_in(&data, &token()), Some(60));
    }
}
