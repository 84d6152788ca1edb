//! Bounded MPMC Channel
//!
//! `CircularBuffer` untuk storage, dua `Event` auto-reset untuk
//! "space-available" / "data-available", plus flag `closed`.
//!
//! Kebijakan close:
//! - Send setelah close selalu gagal, tidak pernah block
//! - Item yang sudah di-commit tetap dikirim ke receiver (FIFO)
//! - `Eof` hanya jika channel closed DAN kosong

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::config::ChannelConfig;
use crate::core::CircularBuffer;
use crate::error::{ChannelError, ConfigError, Result, SendError, TrySendError};
use crate::sync::{Event, WaitStatus};

pub struct Channel<T> {
    buffer: CircularBuffer<T>,
    space_available: Event,
    data_available: Event,
    closed: AtomicBool,
    // Sender yang sudah lolos cek `closed` tapi belum selesai commit
    sending: AtomicUsize,
}

impl<T> Channel<T> {
    /// Channel dengan `capacity` slot (kapasitas efektif `capacity - 1`).
    ///
    /// # Panics
    /// Panic jika `capacity < 2`. Pakai [`Channel::with_config`] untuk versi fallible.
    pub fn new(capacity: usize) -> Self {
        Self::from_buffer(CircularBuffer::new(capacity))
    }

    pub fn with_config(config: ChannelConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_buffer(CircularBuffer::with_spin_limit(
            config.capacity,
            config.spin_limit,
        )))
    }

    fn from_buffer(buffer: CircularBuffer<T>) -> Self {
        Self {
            buffer,
            space_available: Event::auto_reset(),
            data_available: Event::auto_reset(),
            closed: AtomicBool::new(false),
            sending: AtomicUsize::new(0),
        }
    }

    /// Non-blocking send.
    ///
    /// Gagal dengan `Full` jika tidak ada slot, atau `Closed` jika `close()`
    /// sudah dipanggil (walaupun masih ada slot kosong).
    pub fn try_send(&self, value: T) -> std::result::Result<(), TrySendError<T>> {
        self.sending.fetch_add(1, Ordering::SeqCst);
        let result = if self.closed.load(Ordering::SeqCst) {
            Err(TrySendError::Closed(value))
        } else {
            self.buffer.push(value).map_err(TrySendError::Full)
        };
        self.sending.fetch_sub(1, Ordering::SeqCst);

        if result.is_ok() {
            self.data_available.notify();
        }
        result
    }

    /// Blocking send. `timeout = None` menunggu tanpa batas.
    ///
    /// Setiap bangun dari wait, closed-state dan buffer dicek ulang.
    pub fn send(&self, value: T, timeout: Option<Duration>) -> std::result::Result<(), SendError<T>> {
        let deadline = deadline(timeout);
        let mut value = value;
        let mut waited = false;

        loop {
            match self.try_send(value) {
                Ok(()) => {
                    // Sinyal space bisa menyatu; teruskan jika masih ada ruang
                    if waited && !self.buffer.is_full() {
                        self.space_available.notify();
                    }
                    return Ok(());
                }
                Err(TrySendError::Closed(v)) => return Err(SendError::Closed(v)),
                Err(TrySendError::Full(v)) => value = v,
            }

            if self.space_available.wait(remaining(deadline)) == WaitStatus::TimedOut {
                trace!("channel: send timed out after {:?}", timeout);
                return Err(SendError::Timeout(value));
            }
            waited = true;
        }
    }

    /// Non-blocking receive. `Empty` jika tidak ada item, apa pun closed-state-nya.
    pub fn try_receive(&self) -> Result<T> {
        let value = self.buffer.pop().ok_or(ChannelError::Empty)?;
        self.space_available.notify();
        Ok(value)
    }

    /// Blocking receive. `timeout = None` menunggu tanpa batas.
    ///
    /// Returns `Eof` begitu channel closed dan kosong; item yang tersisa
    /// setelah close tetap dikembalikan dulu.
    pub fn receive(&self, timeout: Option<Duration>) -> Result<T> {
        let deadline = deadline(timeout);
        let mut waited = false;

        loop {
            match self.try_receive() {
                Ok(value) => {
                    if waited && !self.buffer.is_empty() {
                        self.data_available.notify();
                    }
                    return Ok(value);
                }
                Err(_) if self.is_drained() => return Err(ChannelError::Eof),
                Err(_) => {}
            }

            if self.data_available.wait(remaining(deadline)) == WaitStatus::TimedOut {
                trace!("channel: receive timed out after {:?}", timeout);
                return Err(ChannelError::ReceiveTimeout);
            }
            waited = true;
        }
    }

    /// Tutup channel. Idempotent; returns `true` hanya untuk pemanggilan pertama.
    ///
    /// Semua thread yang parkir di kedua event dibangunkan: sender gagal cepat,
    /// receiver menguras sisa item lalu melihat `Eof`.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        debug!("channel: closed with {} buffered item(s)", self.buffer.len());
        self.space_available.notify_all();
        self.data_available.notify_all();
        true
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // Closed, tidak ada sender in-flight, dan buffer kosong
    fn is_drained(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
            && self.sending.load(Ordering::SeqCst) == 0
            && self.buffer.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.buffer.is_full()
    }

    /// Kapasitas efektif (slot - 1)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Blocking iterator: berhenti saat `Eof`
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { channel: self }
    }

    /// Non-blocking iterator: berhenti saat buffer kosong
    pub fn try_iter(&self) -> TryIter<'_, T> {
        TryIter { channel: self }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new(ChannelConfig::default().capacity)
    }
}

#[inline]
fn deadline(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}

// Sisa waktu untuk satu wait; tanpa deadline = tanpa batas
#[inline]
fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
}

pub struct Iter<'a, T> {
    channel: &'a Channel<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.receive(None).ok()
    }
}

pub struct TryIter<'a, T> {
    channel: &'a Channel<T>,
}

impl<T> Iterator for TryIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.try_receive().ok()
    }
}
