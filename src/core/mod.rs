//! Core module: Lock-Free Circular Buffer
//!
//! Prinsip desain:
//! - Lock-Free: Hanya atomic CAS, tidak ada Mutex/RwLock di fast path
//! - No-Allocation: Semua slot pre-allocated saat init
//! - Tidak tahu soal blocking atau timeout (lihat `sync` dan `channel`)

mod backoff;
mod circular_buffer;

pub use backoff::DEFAULT_SPIN_LIMIT;
pub use circular_buffer::{CircularBuffer, SlotState};
