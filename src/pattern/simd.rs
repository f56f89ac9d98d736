// Fri Jul 31 2026 - Alex

//! Vectorized dynamic-anchor kernel.
//!
//! Both ends of the pattern are wildcards here, so the anchor byte is free
//! to be any solid cell. An arbitrary pick (say the first solid cell) can
//! land on a very common byte and drown the scan in false candidates; this
//! variant samples the range, ranks the first 16 solid cells by rarity and
//! scans for the winner 16 bytes at a time. Candidates are confirmed with a
//! masked 16-byte compare before the scalar check for longer patterns.
//!
//! The portable kernel and this one return identical results on identical
//! input; only the candidate order of inspection differs internally.

use crate::engine::CancelToken;
use crate::pattern::kernels::{full_match_at, scan_dynamic_anchor_portable};
use crate::pattern::PatternCell;

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

const SAMPLE_STRIDE: usize = 4096;
const LANES: usize = 16;

/// Anchor choice plus the zero-padded prefix and validity mask used by the
/// 16-byte confirmation step.
pub(crate) struct AnchorPlan {
    pub anchor: u8,
    pub offset: usize,
    pub pattern16: [u8; LANES],
    pub mask16: [u8; LANES],
}

/// Estimate byte frequencies by sampling the range at a fixed stride, or
/// exhaustively when the range is smaller than one stride.
pub(crate) fn sample_frequencies(data: &[u8]) -> [u32; 256] {
    let mut freq = [0u32; 256];
    if data.len() < SAMPLE_STRIDE {
        for &b in data {
            freq[b as usize] += 1;
        }
    } else {
        let mut i = 0;
        while i < data.len() {
            freq[data[i] as usize] += 1;
            i += SAMPLE_STRIDE;
        }
    }
    freq
}

/// Pick the solid cell within the first 16 positions whose byte is rarest
/// in the sampled range. Later offsets are penalized so a tie prefers the
/// cell closer to the pattern start.
pub(crate) fn select_anchor(cells: &[PatternCell], freq: &[u32; 256]) -> Option<AnchorPlan> {
    let mut best: Option<(u32, usize)> = None;
    for (i, cell) in cells.iter().take(LANES).enumerate() {
        if cell.wildcard {
            continue;
        }
        let score = freq[cell.value as usize] + (i as u32) * 2;
        if best.map_or(true, |(s, _)| score < s) {
            best = Some((score, i));
        }
    }
    let (_, offset) = best?;

    let mut pattern16 = [0u8; LANES];
    let mut mask16 = [0u8; LANES];
    for (i, cell) in cells.iter().take(LANES).enumerate() {
        if !cell.wildcard {
            pattern16[i] = cell.value;
            mask16[i] = 0xFF;
        }
    }

    Some(AnchorPlan {
        anchor: cells[offset].value,
        offset,
        pattern16,
        mask16,
    })
}

pub(crate) fn scan_dynamic_anchor(
    cells: &[PatternCell],
    data: &[u8],
    cancel: &CancelToken,
) -> Option<usize> {
    let n = cells.len();
    if n == 0 || data.len() < n {
        return None;
    }
    if data.len() < LANES {
        return scan_dynamic_anchor_portable(cells, data, cancel);
    }

    let freq = sample_frequencies(data);
    let Some(plan) = select_anchor(cells, &freq) else {
        // No solid cell in the first 16 positions; the portable kernel
        // anchors on the first solid cell wherever it sits.
        return scan_dynamic_anchor_portable(cells, data, cancel);
    };

    #[cfg(target_arch = "aarch64")]
    unsafe {
        scan_neon(cells, &plan, data, cancel)
    }
    #[cfg(target_arch = "x86_64")]
    unsafe {
        scan_sse2(cells, &plan, data, cancel)
    }
}

/// Check one candidate start produced by an anchor-lane hit. Uses the
/// masked 16-byte compare when a full block fits, the scalar check
/// otherwise, and the scalar check again for the cells past 16.
macro_rules! define_scan {
    ($name:ident, $lanes_fn:ident, $verify_fn:ident) => {
        unsafe fn $name(
            cells: &[PatternCell],
            plan: &AnchorPlan,
            data: &[u8],
            cancel: &CancelToken,
        ) -> Option<usize> {
            let n = cells.len();
            let last_block = data.len() - LANES;

            let mut block = 0usize;
            while block <= last_block {
                if cancel.is_cancelled() {
                    return None;
                }
                let mut lanes = $lanes_fn(data.as_ptr().add(block), plan.anchor);
                while lanes != 0 {
                    let lane = lanes.trailing_zeros() as usize;
                    lanes &= lanes - 1;
                    let at = block + lane;
                    let Some(start) = at.checked_sub(plan.offset) else {
                        continue;
                    };
                    if start + n > data.len() {
                        continue;
                    }
                    let confirmed = if start + LANES <= data.len() {
                        $verify_fn(data.as_ptr().add(start), plan)
                            && (n <= LANES || full_match_at(cells, &data[start..start + n]))
                    } else {
                        full_match_at(cells, &data[start..start + n])
                    };
                    if confirmed {
                        cancel.cancel();
                        return Some(start);
                    }
                }
                block += LANES;
            }

            // Anchors past the last full block were never inspected; their
            // candidate starts begin at block - offset.
            let mut start = block.saturating_sub(plan.offset);
            while start + n <= data.len() {
                if cancel.is_cancelled() {
                    return None;
                }
                if full_match_at(cells, &data[start..start + n]) {
                    cancel.cancel();
                    return Some(start);
                }
                start += 1;
            }
            None
        }
    };
}

#[cfg(target_arch = "aarch64")]
define_scan!(scan_neon, neon_anchor_lanes, neon_verify16);
#[cfg(target_arch = "x86_64")]
define_scan!(scan_sse2, sse2_anchor_lanes, sse2_verify16);

#[cfg(target_arch = "aarch64")]
unsafe fn neon_anchor_lanes(ptr: *const u8, anchor: u8) -> u16 {
    let eq = vceqq_u8(vld1q_u8(ptr), vdupq_n_u8(anchor));
    if vmaxvq_u8(eq) == 0 {
        return 0;
    }
    let mut bytes = [0u8; LANES];
    vst1q_u8(bytes.as_mut_ptr(), eq);
    let mut mask = 0u16;
    for (i, &b) in bytes.iter().enumerate() {
        if b != 0 {
            mask |= 1 << i;
        }
    }
    mask
}

#[cfg(target_arch = "aarch64")]
unsafe fn neon_verify16(ptr: *const u8, plan: &AnchorPlan) -> bool {
    let mem = vld1q_u8(ptr);
    let masked = vandq_u8(mem, vld1q_u8(plan.mask16.as_ptr()));
    let eq = vceqq_u8(masked, vld1q_u8(plan.pattern16.as_ptr()));
    vminvq_u8(eq) == 0xFF
}

#[cfg(target_arch = "x86_64")]
unsafe fn sse2_anchor_lanes(ptr: *const u8, anchor: u8) -> u16 {
    let eq = _mm_cmpeq_epi8(
        _mm_loadu_si128(ptr as *const __m128i),
        _mm_set1_epi8(anchor as i8),
    );
    _mm_movemask_epi8(eq) as u16
}

#[cfg(target_arch = "x86_64")]
unsafe fn sse2_verify16(ptr: *const u8, plan: &AnchorPlan) -> bool {
    let mem = _mm_loadu_si128(ptr as *const __m128i);
    let masked = _mm_and_si128(
        mem,
        _mm_loadu_si128(plan.mask16.as_ptr() as *const __m128i),
    );
    let eq = _mm_cmpeq_epi8(
        masked,
        _mm_loadu_si128(plan.pattern16.as_ptr() as *const __m128i),
    );
    _mm_movemask_epi8(eq) == 0xFFFF
}
