//! Error domain channel
//!
//! Tiga kelompok kondisi:
//! - Kapasitas (`Empty`, `Full`): normal control flow, bukan exceptional
//! - Timeout (`SendTimeout`, `ReceiveTimeout`): hanya dari blocking API
//! - Lifecycle (`Closed`, `Eof`): terminal, tidak bisa di-retry
//!
//! Setiap kondisi dipetakan ke `io::ErrorKind` supaya caller bisa branch pada
//! semantik portable.

use std::fmt;
use std::io;

use thiserror::Error;

pub type Result<T, E = ChannelError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel is empty")]
    Empty,

    #[error("channel is full")]
    Full,

    #[error("send timed out")]
    SendTimeout,

    #[error("receive timed out")]
    ReceiveTimeout,

    #[error("channel is closed and drained")]
    Eof,

    #[error("channel is closed")]
    Closed,
}

impl ChannelError {
    /// Kondisi portable untuk error ini
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Empty | Self::Full => io::ErrorKind::WouldBlock,
            Self::SendTimeout | Self::ReceiveTimeout => io::ErrorKind::TimedOut,
            Self::Eof => io::ErrorKind::UnexpectedEof,
            Self::Closed => io::ErrorKind::BrokenPipe,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::SendTimeout | Self::ReceiveTimeout)
    }

    /// `Closed`/`Eof`: channel tidak akan pernah berubah lagi
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Eof)
    }
}

impl From<ChannelError> for io::Error {
    fn from(err: ChannelError) -> Self {
        io::Error::new(err.kind(), err)
    }
}

/// Error `try_send`; value dikembalikan ke caller
#[derive(Error, Clone, Copy, PartialEq, Eq)]
pub enum TrySendError<T> {
    #[error("channel is full")]
    Full(T),

    #[error("channel is closed")]
    Closed(T),
}

impl<T> TrySendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(value) | Self::Closed(value) => value,
        }
    }

    pub fn error(&self) -> ChannelError {
        match self {
            Self::Full(_) => ChannelError::Full,
            Self::Closed(_) => ChannelError::Closed,
        }
    }
}

/// Error blocking `send`; value dikembalikan ke caller
#[derive(Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError<T> {
    #[error("send timed out")]
    Timeout(T),

    #[error("channel is closed")]
    Closed(T),
}

impl<T> SendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Timeout(value) | Self::Closed(value) => value,
        }
    }

    pub fn error(&self) -> ChannelError {
        match self {
            Self::Timeout(_) => ChannelError::SendTimeout,
            Self::Closed(_) => ChannelError::Closed,
        }
    }
}

// Debug tanpa bound `T: Debug`, value tidak dicetak
impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(_) => f.write_str("Timeout(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> From<TrySendError<T>> for ChannelError {
    fn from(err: TrySendError<T>) -> Self {
        err.error()
    }
}

impl<T> From<SendError<T>> for ChannelError {
    fn from(err: SendError<T>) -> Self {
        err.error()
    }
}

/// Konfigurasi channel tidak valid
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("capacity must be at least 2 slots, got {0}")]
    CapacityTooSmall(usize),

    #[error("spin limit must be non-zero")]
    ZeroSpinLimit,

    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}
