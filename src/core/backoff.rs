//! Bounded spin untuk CAS retry pada slot state
//!
//! Spin dengan `spin_loop` hint sampai `limit`, setelah itu yield ke scheduler.
//! Tidak pernah parking: window tunggu slot selalu pendek (lihat `CircularBuffer`).

#[cfg(feature = "loom")]
use loom::thread;
#[cfg(not(feature = "loom"))]
use std::thread;

/// Default jumlah spin sebelum mulai yield
pub const DEFAULT_SPIN_LIMIT: u32 = 64;

#[derive(Debug)]
pub(crate) struct Backoff {
    step: u32,
    limit: u32,
}

impl Backoff {
    #[inline(always)]
    pub(crate) const fn new(limit: u32) -> Self {
        Self { step: 0, limit }
    }

    /// Satu langkah tunggu. Loom selalu yield supaya model tetap finite.
    #[inline]
    pub(crate) fn snooze(&mut self) {
        if cfg!(feature = "loom") || self.step >= self.limit {
            thread::yield_now();
        } else {
            std::hint::spin_loop();
            self.step += 1;
        }
    }
}
