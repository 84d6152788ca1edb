//! Futex: atomic word + park/wake pada OS
//!
//! Linux memakai syscall `futex(2)` langsung (FUTEX_WAIT/FUTEX_WAKE, private).
//! Platform lain memakai `parking_lot` Mutex + Condvar dengan disiplin yang sama:
//! word dicek ulang di bawah lock sebelum parkir, jadi wake tidak pernah hilang.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Hasil satu kali parkir
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    /// Bangun karena wake (atau spurious wake)
    Woken,
    /// Word sudah bukan `expected` saat akan parkir
    NotEqual,
    /// Timeout habis sebelum ada wake
    TimedOut,
}

/// Atomic u32 yang bisa ditunggu
#[derive(Debug)]
pub struct Futex {
    word: AtomicU32,
    #[cfg(not(target_os = "linux"))]
    parker: fallback::Parker,
}

impl Futex {
    pub fn new(value: u32) -> Self {
        Self {
            word: AtomicU32::new(value),
            #[cfg(not(target_os = "linux"))]
            parker: fallback::Parker::new(),
        }
    }

    #[inline(always)]
    pub fn load(&self, order: Ordering) -> u32 {
        self.word.load(order)
    }

    #[inline(always)]
    pub fn store(&self, value: u32, order: Ordering) {
        self.word.store(value, order)
    }

    #[inline(always)]
    pub fn swap(&self, value: u32, order: Ordering) -> u32 {
        self.word.swap(value, order)
    }

    #[inline(always)]
    pub fn fetch_max(&self, value: u32, order: Ordering) -> u32 {
        self.word.fetch_max(value, order)
    }

    #[inline(always)]
    pub fn compare_exchange(
        &self,
        current: u32,
        new: u32,
        success: Ordering,
        failure: Ordering,
    ) -> Result<u32, u32> {
        self.word.compare_exchange(current, new, success, failure)
    }

    /// Parkir selama word == `expected`, sampai wake atau `timeout` habis.
    ///
    /// `None` = tanpa batas waktu. Spurious wake mungkin terjadi; caller wajib
    /// cek ulang state-nya sendiri.
    #[inline]
    pub fn wait(&self, expected: u32, timeout: Option<Duration>) -> WaitResult {
        #[cfg(target_os = "linux")]
        {
            linux::wait(&self.word, expected, timeout)
        }
        #[cfg(not(target_os = "linux"))]
        {
            self.parker.wait(&self.word, expected, timeout)
        }
    }

    /// Bangunkan maksimal satu thread yang parkir
    #[inline]
    pub fn wake_one(&self) {
        #[cfg(target_os = "linux")]
        linux::wake(&self.word, 1);
        #[cfg(not(target_os = "linux"))]
        self.parker.wake_one();
    }

    /// Bangunkan semua thread yang parkir
    #[inline]
    pub fn wake_all(&self) {
        #[cfg(target_os = "linux")]
        linux::wake(&self.word, i32::MAX);
        #[cfg(not(target_os = "linux"))]
        self.parker.wake_all();
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use super::WaitResult;
    use std::io;
    use std::ptr;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    pub(super) fn wait(word: &AtomicU32, expected: u32, timeout: Option<Duration>) -> WaitResult {
        // FUTEX_WAIT memakai timeout relatif
        let timespec = timeout.map(|t| {
            // SAFETY: timespec adalah POD; zeroed juga mengisi padding di target 32-bit
            let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
            ts.tv_sec = libc::time_t::try_from(t.as_secs()).unwrap_or(libc::time_t::MAX);
            ts.tv_nsec = t.subsec_nanos() as _;
            ts
        });
        let timespec_ptr = timespec
            .as_ref()
            .map_or(ptr::null(), |ts| ts as *const libc::timespec);

        // SAFETY: word hidup selama pemanggilan; kernel hanya membaca u32 di alamat ini
        let ret = unsafe {
            libc::syscall(
                libc::SYS_futex,
                word as *const AtomicU32,
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                expected,
                timespec_ptr,
            )
        };

        if ret == 0 {
            return WaitResult::Woken;
        }
        match io::Error::last_os_error().raw_os_error() {
            Some(libc::ETIMEDOUT) => WaitResult::TimedOut,
            Some(libc::EAGAIN) => WaitResult::NotEqual,
            // EINTR: perlakukan sebagai spurious wake
            _ => WaitResult::Woken,
        }
    }

    pub(super) fn wake(word: &AtomicU32, count: i32) {
        // SAFETY: FUTEX_WAKE tidak menyentuh memori, hanya memakai alamat sebagai key
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                word as *const AtomicU32,
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                count,
            );
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod fallback {
    use super::WaitResult;
    use parking_lot::{Condvar, Mutex};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default)]
    pub(super) struct Parker {
        lock: Mutex<()>,
        cond: Condvar,
    }

    impl Parker {
        pub(super) fn new() -> Self {
            Self::default()
        }

        pub(super) fn wait(
            &self,
            word: &AtomicU32,
            expected: u32,
            timeout: Option<Duration>,
        ) -> WaitResult {
            let mut guard = self.lock.lock();
            // Cek ulang di bawah lock: waker selalu ambil lock sebelum notify
            if word.load(Ordering::SeqCst) != expected {
                return WaitResult::NotEqual;
            }
            match timeout {
                Some(t) => {
                    if self.cond.wait_for(&mut guard, t).timed_out() {
                        WaitResult::TimedOut
                    } else {
                        WaitResult::Woken
                    }
                }
                None => {
                    self.cond.wait(&mut guard);
                    WaitResult::Woken
                }
            }
        }

        pub(super) fn wake_one(&self) {
            let _guard = self.lock.lock();
            self.cond.notify_one();
        }

        pub(super) fn wake_all(&self) {
            let _guard = self.lock.lock();
            self.cond.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_not_equal_returns_immediately() {
        let futex = Futex::new(1);
        assert_eq!(futex.wait(0, None), WaitResult::NotEqual);
    }

    #[test]
    fn test_wait_times_out() {
        let futex = Futex::new(0);
        let start = Instant::now();
        let result = futex.wait(0, Some(Duration::from_millis(20)));
        // Spurious wake diperbolehkan, tapi normalnya timeout
        if result == WaitResult::TimedOut {
            assert!(start.elapsed() >= Duration::from_millis(15));
        }
    }

    #[test]
    fn test_wake_after_store() {
        let futex = Arc::new(Futex::new(0));

        let waiter = {
            let futex = Arc::clone(&futex);
            thread::spawn(move || {
                while futex.load(Ordering::Acquire) == 0 {
                    futex.wait(0, None);
                }
            })
        };

        thread::sleep(Duration::from_millis(10));
        futex.store(1, Ordering::Release);
        futex.wake_all();
        waiter.join().unwrap();
    }
}
