//! Error types for the recorder
//!
//! - [`LayoutError`] - The static key table is inconsistent (fatal, startup)
//! - [`InitError`] - A capability failed to come up (fatal, startup)
//! - [`ScanError`] - A matrix line failed structurally (fatal, teardown follows)
//! - [`FeedbackError`] - An LED or tone command failed (logged, never fatal)
//!
//! Persistence failures are reported through the session log's own error
//! type and are logged by the controller without interrupting the session.

use embedded_hal::digital::ErrorKind;

use crate::key_codes::Key;

/// The key table bound at startup is not a bijection.
///
/// Positions are the table indices, so a position can never hold two keys;
/// the remaining ways to break the bijection are listed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// The same key appears at two matrix positions
    DuplicateKey {
        key: Key,
    },
    /// Two different keys are wired to the same LED
    DuplicateLed {
        led: u8,
        first: Key,
        second: Key,
    },
    /// An LED index does not exist on the strip
    LedOutOfRange {
        key: Key,
        led: u8,
        num_pixels: usize,
    },
    /// `Commit` or `Erase` is not bound anywhere
    MissingControlKey(Key),
    /// The strip has more pixels than [`LedIndex`](crate::key_mapping::LedIndex) can address
    StripTooLong {
        num_pixels: usize,
    },
}

impl core::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LayoutError::DuplicateKey { key } => {
                write!(f, "Key {key} is bound to more than one matrix position")
            },
            LayoutError::DuplicateLed { led, first, second } => {
                write!(f, "LED {led} is bound to both {first} and {second}")
            },
            LayoutError::LedOutOfRange { key, led, num_pixels } => {
                write!(f, "LED {led} for key {key} is outside the strip (0..{num_pixels})")
            },
            LayoutError::MissingControlKey(key) => {
                write!(f, "Control key {key} has no matrix position")
            },
            LayoutError::StripTooLong { num_pixels } => {
                write!(f, "Strip of {num_pixels} LEDs exceeds the 256 addressable indices")
            },
        }
    }
}

impl core::error::Error for LayoutError {}

/// A hardware capability could not be brought up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    Layout(LayoutError),
    /// The LED strip rejected the initial frame
    Strip,
    /// The tone source could not be silenced
    Tone,
    /// A matrix row could not be parked at its inactive level
    Pin(ErrorKind),
}

impl From<LayoutError> for InitError {
    fn from(err: LayoutError) -> Self {
        InitError::Layout(err)
    }
}

impl core::fmt::Display for InitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InitError::Layout(err) => write!(f, "Malformed key layout: {err}"),
            InitError::Strip => write!(f, "LED strip failed to initialize"),
            InitError::Tone => write!(f, "Tone source failed to initialize"),
            InitError::Pin(kind) => write!(f, "Matrix pin failed to initialize: {kind:?}"),
        }
    }
}

impl core::error::Error for InitError {}

/// A row or column line failed while scanning.
///
/// Levels themselves are never erroneous; this only covers the I/O layer
/// refusing the operation, which is not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    Pin(ErrorKind),
}

impl core::fmt::Display for ScanError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ScanError::Pin(kind) => write!(f, "Matrix pin error: {kind:?}"),
        }
    }
}

impl core::error::Error for ScanError {}

/// An LED or tone command failed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FeedbackError {
    Strip,
    Tone,
}

impl core::fmt::Display for FeedbackError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FeedbackError::Strip => write!(f, "LED strip write failed"),
            FeedbackError::Tone => write!(f, "Tone source command failed"),
        }
    }
}

impl core::error::Error for FeedbackError {}
