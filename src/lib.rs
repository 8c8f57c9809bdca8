//! Core of a button-matrix session recorder.
//!
//! A [`Controller`] scans a primary letter grid and a small auxiliary grid
//! holding the commit and erase keys, toggles letters in and out of the
//! current session, mirrors the selection on a per-key LED strip with short
//! tones, and appends one CSV line per committed session to a
//! [`SessionLog`].
//!
//! All hardware is reached through embedded-hal pins and delays plus the
//! small traits in [`devices`] and [`time`], so the crate runs unchanged on
//! the board and against the fakes used by its tests.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod controller;
pub mod debounce;
pub mod devices;
pub mod error;
pub mod feedback;
pub mod host;
pub mod key_codes;
pub mod key_mapping;
pub mod key_scan;
pub mod session;
pub mod time;

#[cfg(test)]
mod mock;

pub use config::{Builder, Level, Note, Palette, RecorderConfig};
pub use controller::{Board, Controller, Event};
pub use devices::{BufferedStrip, ColorOrder, LedStrip, SessionLog, ToneSource};
pub use error::{FeedbackError, InitError, LayoutError, ScanError};
pub use host::{Command, HostCommands};
pub use key_codes::{Key, Letter};
pub use key_mapping::{recorder_layout, RecorderLayout};
pub use key_scan::GridLines;
pub use session::{SessionId, SessionRecord};
pub use time::{Duration, Instant, Monotonic, Timestamp, TimestampError, WallClock};
