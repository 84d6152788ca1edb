//! Lock-Free Multi-Producer Multi-Consumer (MPMC) Circular Buffer
//!
//! Dua state machine berlapis pada index space yang sama:
//! - Cursor `head`/`tail`: siapa memiliki index mana (CAS pada counter)
//! - Slot state: apakah data di index itu sudah siap (CAS pada slot)
//!
//! Producer: `reserve` -> tulis -> `commit`. Consumer: `acquire` -> baca -> `release`.
//! Siklus slot: `Idle -> Putting -> Valid -> Taking -> Idle`.
//!
//! Kapasitas efektif N-1: satu slot dikorbankan supaya full/empty bisa
//! dibedakan hanya dari dua counter.

use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;

#[cfg(feature = "loom")]
use loom::sync::atomic::{AtomicUsize, Ordering};
#[cfg(not(feature = "loom"))]
use std::sync::atomic::{AtomicUsize, Ordering};

use super::backoff::{Backoff, DEFAULT_SPIN_LIMIT};

/// Status readiness satu slot
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Kosong, boleh di-claim producer
    Idle = 0,
    /// Di-claim producer, value sedang ditulis
    Putting = 1,
    /// Value sudah di-commit, boleh di-claim consumer
    Valid = 2,
    /// Di-claim consumer, value sedang dibaca
    Taking = 3,
}

const STATE_BITS: u32 = 2;
const STATE_MASK: usize = (1 << STATE_BITS) - 1;

impl SlotState {
    #[inline(always)]
    fn from_tag(tag: usize) -> Self {
        match tag & STATE_MASK {
            0 => Self::Idle,
            1 => Self::Putting,
            2 => Self::Valid,
            _ => Self::Taking,
        }
    }
}

/// Tag slot = (lap << 2) | state.
///
/// Lap mencegah ABA: producer lap k yang terlambat dan producer lap k+1
/// yang menunggu di index yang sama tidak akan pernah meng-claim slot yang sama.
#[inline(always)]
const fn tag(lap: usize, state: SlotState) -> usize {
    (lap << STATE_BITS) | state as usize
}

#[repr(C, align(64))] // Cache line alignment untuk menghindari false sharing
struct Slot<T> {
    state: AtomicUsize,
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn new(state: usize) -> Self {
        Self {
            state: AtomicUsize::new(state),
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Padding untuk cache line isolation (64 bytes pada x86-64)
#[repr(C, align(64))]
struct CacheLinePadded<T> {
    value: T,
}

impl<T> CacheLinePadded<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

/// Lock-Free MPMC Circular Buffer
///
/// Cursor adalah counter virtual yang hanya naik dan di-wrap pada `bound`
/// (kelipatan persis dari jumlah slot), jadi `index = cursor % N` tetap stabil
/// saat wraparound. Reduksi ke index hanya terjadi saat mengakses slot.
pub struct CircularBuffer<T> {
    // Consumer side - cache line aligned
    head: CacheLinePadded<AtomicUsize>,
    // Producer side - cache line aligned
    tail: CacheLinePadded<AtomicUsize>,
    slots: Box<[Slot<T>]>,
    // Jumlah slot fisik (N)
    slot_count: usize,
    // Jumlah lap sebelum cursor wrap
    laps: usize,
    // laps * N
    bound: usize,
    spin_limit: u32,
}

// SAFETY: Akses ke `data` tiap slot dieksklusifkan oleh slot state:
// hanya thread yang memindahkan slot ke Putting/Taking yang boleh menyentuh value.
unsafe impl<T: Send> Send for CircularBuffer<T> {}
unsafe impl<T: Send> Sync for CircularBuffer<T> {}

impl<T> CircularBuffer<T> {
    /// Membuat buffer dengan `slot_count` slot (kapasitas efektif `slot_count - 1`).
    ///
    /// # Panics
    /// Panic jika `slot_count < 2`
    pub fn new(slot_count: usize) -> Self {
        Self::with_spin_limit(slot_count, DEFAULT_SPIN_LIMIT)
    }

    /// Sama dengan [`CircularBuffer::new`], dengan batas spin kustom untuk slot claim.
    ///
    /// # Panics
    /// Panic jika `slot_count < 2`
    pub fn with_spin_limit(slot_count: usize, spin_limit: u32) -> Self {
        assert!(slot_count >= 2, "slot_count must be at least 2");

        let laps = (usize::MAX >> STATE_BITS) / slot_count;
        Self::with_cursor(slot_count, spin_limit, laps, 0)
    }

    fn with_cursor(slot_count: usize, spin_limit: u32, laps: usize, start_lap: usize) -> Self {
        let start = start_lap * slot_count;

        // Alokasi sekali saat init, tidak ada alokasi di hot path
        let slots = (0..slot_count)
            .map(|_| Slot::new(tag(start_lap, SlotState::Idle)))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            head: CacheLinePadded::new(AtomicUsize::new(start)),
            tail: CacheLinePadded::new(AtomicUsize::new(start)),
            slots,
            slot_count,
            laps,
            bound: laps * slot_count,
            spin_limit,
        }
    }

    #[inline(always)]
    fn advance(&self, cursor: usize) -> usize {
        let next = cursor + 1;
        if next == self.bound {
            0
        } else {
            next
        }
    }

    /// Jarak virtual tail - head, aman terhadap wrap di `bound`
    #[inline(always)]
    fn distance(&self, head: usize, tail: usize) -> usize {
        if tail >= head {
            tail - head
        } else {
            self.bound - head + tail
        }
    }

    #[inline(always)]
    fn locate(&self, cursor: usize) -> (usize, usize) {
        (cursor % self.slot_count, cursor / self.slot_count)
    }

    /// Spin CAS sampai slot berpindah `from -> to`.
    ///
    /// Window-nya pendek: cursor sudah menjamin index ini milik kita, yang
    /// ditunggu hanya pemilik sebelumnya menyelesaikan transisinya.
    #[inline]
    fn transition(&self, index: usize, from: usize, to: usize) {
        let slot = &self.slots[index];
        let mut backoff = Backoff::new(self.spin_limit);
        while slot
            .state
            .compare_exchange_weak(from, to, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            backoff.snooze();
        }
    }

    /// Claim satu index untuk ditulis (Producer side)
    ///
    /// Returns `None` jika buffer penuh saat dicek. Hasil `Some(index)` berarti
    /// slot sudah `Putting` dan eksklusif milik caller sampai [`commit`](Self::commit).
    pub fn reserve(&self) -> Option<usize> {
        let cursor = loop {
            let head = self.head.value.load(Ordering::Acquire);
            let tail = self.tail.value.load(Ordering::Acquire);

            if self.distance(head, tail) >= self.slot_count - 1 {
                // Penuh hanya jika head tidak bergerak selama snapshot
                if self.head.value.load(Ordering::Acquire) == head {
                    return None;
                }
                continue;
            }

            if self
                .tail
                .value
                .compare_exchange_weak(tail, self.advance(tail), Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                break tail;
            }
        };

        let (index, lap) = self.locate(cursor);
        self.transition(index, tag(lap, SlotState::Idle), tag(lap, SlotState::Putting));
        Some(index)
    }

    /// Publish value di `index`: slot menjadi `Valid` dan terlihat oleh `acquire`.
    ///
    /// `index` harus berasal dari [`reserve`](Self::reserve) dan value sudah ditulis.
    #[inline]
    pub fn commit(&self, index: usize) {
        let state = &self.slots[index].state;
        let current = state.load(Ordering::Relaxed);
        debug_assert_eq!(SlotState::from_tag(current), SlotState::Putting);

        // Release: write value visible sebelum state Valid
        state.store(tag(current >> STATE_BITS, SlotState::Valid), Ordering::Release);
    }

    /// Claim satu index untuk dibaca (Consumer side)
    ///
    /// Returns `None` jika buffer kosong. Hasil `Some(index)` berarti slot sudah
    /// `Taking` dan eksklusif milik caller sampai [`release`](Self::release).
    pub fn acquire(&self) -> Option<usize> {
        let cursor = loop {
            let head = self.head.value.load(Ordering::Acquire);
            let tail = self.tail.value.load(Ordering::Acquire);

            if head == tail {
                return None;
            }

            if self
                .head
                .value
                .compare_exchange_weak(head, self.advance(head), Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                break head;
            }
        };

        let (index, lap) = self.locate(cursor);
        self.transition(index, tag(lap, SlotState::Valid), tag(lap, SlotState::Taking));
        Some(index)
    }

    /// Recycle slot di `index` menjadi `Idle` untuk lap berikutnya.
    ///
    /// `index` harus berasal dari [`acquire`](Self::acquire) dan value sudah dibaca.
    #[inline]
    pub fn release(&self, index: usize) {
        let state = &self.slots[index].state;
        let current = state.load(Ordering::Relaxed);
        debug_assert_eq!(SlotState::from_tag(current), SlotState::Taking);

        let next_lap = ((current >> STATE_BITS) + 1) % self.laps;
        // Release: read value selesai sebelum slot bisa dipakai ulang
        state.store(tag(next_lap, SlotState::Idle), Ordering::Release);
    }

    /// Tulis value ke slot `index`.
    ///
    /// # Safety
    /// `index` harus didapat dari `reserve` dan belum di-`commit`.
    /// Tidak ada bounds/state check.
    #[inline(always)]
    pub unsafe fn write(&self, index: usize, value: T) {
        (*self.slots.get_unchecked(index).data.get()).write(value);
    }

    /// Pindahkan value keluar dari slot `index`.
    ///
    /// # Safety
    /// `index` harus didapat dari `acquire` dan belum di-`release`.
    /// Value hanya boleh dibaca sekali.
    #[inline(always)]
    pub unsafe fn read(&self, index: usize) -> T {
        (*self.slots.get_unchecked(index).data.get()).assume_init_read()
    }

    /// reserve -> write -> commit dalam satu langkah.
    ///
    /// Returns `Err(value)` jika buffer penuh.
    #[inline]
    pub fn push(&self, value: T) -> Result<(), T> {
        match self.reserve() {
            Some(index) => {
                // SAFETY: index baru saja di-reserve oleh thread ini
                unsafe { self.write(index, value) };
                self.commit(index);
                Ok(())
            }
            None => Err(value),
        }
    }

    /// acquire -> read -> release dalam satu langkah.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        let index = self.acquire()?;
        // SAFETY: index baru saja di-acquire oleh thread ini
        let value = unsafe { self.read(index) };
        self.release(index);
        Some(value)
    }

    /// Jumlah index yang sudah di-reserve tapi belum di-acquire
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.value.load(Ordering::Acquire);
        let tail = self.tail.value.load(Ordering::Acquire);
        self.distance(head, tail).min(self.capacity())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        let head = self.head.value.load(Ordering::Acquire);
        let tail = self.tail.value.load(Ordering::Acquire);
        head == tail
    }

    /// Penuh pada N-1 slot terisi, tidak pernah N
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Kapasitas efektif (N-1)
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.slot_count - 1
    }

    /// Jumlah slot fisik (N)
    #[inline(always)]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    #[cfg(all(test, not(feature = "loom")))]
    fn state_of(&self, index: usize) -> SlotState {
        SlotState::from_tag(self.slots[index].state.load(Ordering::Acquire))
    }
}

impl<T> Drop for CircularBuffer<T> {
    fn drop(&mut self) {
        // Value yang sudah Valid tapi belum di-consume masih milik buffer
        for slot in self.slots.iter() {
            if SlotState::from_tag(slot.state.load(Ordering::Relaxed)) == SlotState::Valid {
                // SAFETY: &mut self, tidak ada thread lain; slot Valid berarti sudah ditulis
                unsafe { (*slot.data.get()).assume_init_drop() };
            }
        }
    }
}

impl<T> fmt::Debug for CircularBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_basic_push_pop() {
        let cb: CircularBuffer<u64> = CircularBuffer::new(16);

        assert!(cb.is_empty());
        assert!(!cb.is_full());

        assert!(cb.push(42).is_ok());
        assert!(!cb.is_empty());
        assert_eq!(cb.len(), 1);

        assert_eq!(cb.pop(), Some(42));
        assert!(cb.is_empty());
        assert_eq!(cb.pop(), None);
    }

    #[test]
    fn test_full_at_n_minus_one() {
        let cb: CircularBuffer<u64> = CircularBuffer::new(4);
        assert_eq!(cb.capacity(), 3);
        assert_eq!(cb.slot_count(), 4);

        assert!(cb.push(1).is_ok());
        assert!(cb.push(2).is_ok());
        assert!(cb.push(3).is_ok());

        assert!(cb.is_full());
        assert_eq!(cb.len(), 3);
        assert_eq!(cb.reserve(), None);
        assert_eq!(cb.push(4), Err(4)); // Should fail - buffer full

        assert_eq!(cb.pop(), Some(1));
        assert!(cb.push(4).is_ok()); // Tepat satu slot kembali
        assert_eq!(cb.push(5), Err(5));
    }

    #[test]
    fn test_slot_state_cycle() {
        let cb: CircularBuffer<String> = CircularBuffer::new(4);

        let index = cb.reserve().unwrap();
        assert_eq!(cb.state_of(index), SlotState::Putting);
        // Belum di-commit: cursor bilang ada data, tapi acquire belum dipanggil
        assert_eq!(cb.len(), 1);

        unsafe { cb.write(index, "corong".to_string()) };
        cb.commit(index);
        assert_eq!(cb.state_of(index), SlotState::Valid);

        let taken = cb.acquire().unwrap();
        assert_eq!(taken, index);
        assert_eq!(cb.state_of(taken), SlotState::Taking);

        let value = unsafe { cb.read(taken) };
        cb.release(taken);
        assert_eq!(value, "corong");
        assert_eq!(cb.state_of(taken), SlotState::Idle);
        assert!(cb.is_empty());
    }

    #[test]
    fn test_wraparound() {
        let cb: CircularBuffer<u64> = CircularBuffer::new(4);

        // Fill and drain multiple times to test wraparound
        for round in 0..10 {
            for i in 0..3 {
                assert!(cb.push(round * 3 + i).is_ok());
            }
            for i in 0..3 {
                assert_eq!(cb.pop(), Some(round * 3 + i));
            }
        }
    }

    #[test]
    fn test_cursor_wraps_at_bound() {
        // Mulai di lap terakhir supaya cursor melewati `bound` -> 0
        let laps = 5;
        let cb: CircularBuffer<u64> = CircularBuffer::with_cursor(4, 8, laps, laps - 1);

        for i in 0..40 {
            assert!(cb.push(i).is_ok());
            assert!(cb.push(i + 1000).is_ok());
            assert_eq!(cb.pop(), Some(i));
            assert_eq!(cb.pop(), Some(i + 1000));
            assert!(cb.is_empty());
        }
        assert!(cb.head.value.load(Ordering::Relaxed) < cb.bound);
    }

    #[test]
    fn test_drop_releases_buffered_values() {
        let marker = Arc::new(());
        {
            let cb = CircularBuffer::new(8);
            for _ in 0..5 {
                cb.push(Arc::clone(&marker)).unwrap();
            }
            drop(cb.pop());
            assert_eq!(Arc::strong_count(&marker), 5);
        }
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    #[test]
    fn test_concurrent_producers_consumers() {
        const PRODUCERS: u64 = 4;
        const CONSUMERS: usize = 4;
        const PER_PRODUCER: u64 = 20_000;

        let cb = Arc::new(CircularBuffer::<(u64, u64)>::new(64));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let cb = Arc::clone(&cb);
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        let mut item = (p, seq);
                        while let Err(back) = cb.push(item) {
                            item = back;
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let total = PRODUCERS * PER_PRODUCER;
        let consumed = Arc::new(AtomicUsize::new(0));
        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let cb = Arc::clone(&cb);
                let consumed = Arc::clone(&consumed);
                thread::spawn(move || {
                    let mut last_seen: HashMap<u64, u64> = HashMap::new();
                    let mut count = 0u64;
                    while consumed.load(Ordering::Relaxed) < total as usize {
                        match cb.pop() {
                            Some((p, seq)) => {
                                // Per consumer, urutan per producer tidak boleh mundur
                                if let Some(prev) = last_seen.insert(p, seq) {
                                    assert!(seq > prev, "producer {p}: {seq} after {prev}");
                                }
                                count += 1;
                                consumed.fetch_add(1, Ordering::Relaxed);
                            }
                            None => thread::yield_now(),
                        }
                    }
                    count
                })
            })
            .collect();

        for p in producers {
            p.join().unwrap();
        }
        let received: u64 = consumers.into_iter().map(|c| c.join().unwrap()).sum();

        assert_eq!(received, total);
        assert!(cb.is_empty());
    }
}
