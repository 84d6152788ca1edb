//! Event: thread-parking primitive (auto-reset / manual-reset)
//!
//! Atomic state word adalah satu-satunya sumber kebenaran. Park/wake di OS
//! hanya optimasi scheduling: sebelum parkir, futex selalu membandingkan word
//! dengan `UNSET`, jadi `notify()` yang mendahului `wait()` tidak pernah hilang.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use log::trace;

use super::futex::Futex;

const UNSET: u32 = 0;
const SET: u32 = 1;
// Broadcast: signaled sampai `reset()`, tidak dikonsumsi oleh auto-reset wait
const LATCHED: u32 = 2;

/// Perilaku sinyal setelah wait berhasil
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Wait yang berhasil mengonsumsi sinyal
    Auto,
    /// Sinyal bertahan sampai `reset()`
    Manual,
}

/// Hasil [`Event::wait`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Signaled,
    TimedOut,
}

#[derive(Debug)]
pub struct Event {
    state: Futex,
    // Jumlah thread yang (akan) parkir; notify skip syscall jika nol
    waiters: AtomicU32,
    mode: ResetMode,
}

impl Event {
    pub fn new(mode: ResetMode, signaled: bool) -> Self {
        Self {
            state: Futex::new(if signaled { SET } else { UNSET }),
            waiters: AtomicU32::new(0),
            mode,
        }
    }

    pub fn auto_reset() -> Self {
        Self::new(ResetMode::Auto, false)
    }

    pub fn manual_reset() -> Self {
        Self::new(ResetMode::Manual, false)
    }

    #[inline(always)]
    pub fn mode(&self) -> ResetMode {
        self.mode
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::Acquire) != UNSET
    }

    #[inline]
    fn try_take(&self) -> bool {
        match self.mode {
            ResetMode::Manual => self.is_set(),
            ResetMode::Auto => match self.state.load(Ordering::Acquire) {
                UNSET => false,
                LATCHED => true,
                _ => self
                    .state
                    .compare_exchange(SET, UNSET, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok(),
            },
        }
    }

    /// Tunggu sampai signaled.
    ///
    /// - `None`: tunggu tanpa batas
    /// - `Some(Duration::ZERO)`: poll sekali
    /// - `Some(t)`: parkir maksimal `t`
    ///
    /// Timeout tidak mengubah state apa pun.
    pub fn wait(&self, timeout: Option<Duration>) -> WaitStatus {
        // Overflow deadline diperlakukan sebagai tanpa batas
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            if self.try_take() {
                return WaitStatus::Signaled;
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return WaitStatus::TimedOut;
                    }
                    Some(deadline - now)
                }
                None => None,
            };

            trace!("event: parking, timeout {:?}", remaining);
            self.waiters.fetch_add(1, Ordering::SeqCst);
            self.state.wait(UNSET, remaining);
            self.waiters.fetch_sub(1, Ordering::Release);
        }
    }

    /// Set signaled dan bangunkan satu waiter (auto) atau semua waiter (manual).
    pub fn notify(&self) {
        // fetch_max: jangan turunkan LATCHED menjadi SET
        self.state.fetch_max(SET, Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) == 0 {
            return;
        }
        match self.mode {
            ResetMode::Auto => self.state.wake_one(),
            ResetMode::Manual => self.state.wake_all(),
        }
    }

    /// Broadcast: semua waiter sekarang dan berikutnya lolos sampai `reset()`,
    /// termasuk pada auto-reset event.
    pub fn notify_all(&self) {
        self.state.swap(LATCHED, Ordering::SeqCst);
        if self.waiters.load(Ordering::SeqCst) != 0 {
            self.state.wake_all();
        }
    }

    /// Hapus sinyal (termasuk broadcast). Utamanya untuk manual-reset.
    pub fn reset(&self) {
        self.state.store(UNSET, Ordering::Release);
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::auto_reset()
    }
}
