// Wed Jul 29 2026 - Alex

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared one-way flag that lets a winning kernel tell the losers to stop.
///
/// One token is created per scan call and once set it stays set. Kernels
/// poll it with a relaxed load at their outer loop; the match itself is
/// communicated through the result channel, not through this flag, so no
/// ordering is required for correctness.
#[derive(Debug, Default)]
pub struct CancelToken {
    flag: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}
