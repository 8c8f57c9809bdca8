//! Forwards `log` records from the recorder core to defmt.

use core::fmt::Write;

use heapless::String;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Longer messages are cut short.
const LINE_CAPACITY: usize = 128;

struct DefmtLogger;

static LOGGER: DefmtLogger = DefmtLogger;

impl Log for DefmtLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let mut line: String<LINE_CAPACITY> = String::new();
        // A full buffer only truncates the message.
        let _ = write!(line, "{}", record.args());
        let target = record.target();

        match record.level() {
            Level::Error => defmt::error!("[{=str}] {=str}", target, line.as_str()),
            Level::Warn => defmt::warn!("[{=str}] {=str}", target, line.as_str()),
            Level::Info => defmt::info!("[{=str}] {=str}", target, line.as_str()),
            Level::Debug => defmt::debug!("[{=str}] {=str}", target, line.as_str()),
            Level::Trace => defmt::trace!("[{=str}] {=str}", target, line.as_str()),
        }
    }

    fn flush(&self) {}
}

/// Install the bridge. Call once, before interrupts are enabled.
pub fn init(max_level: LevelFilter) {
    // thumbv6m has no compare-and-swap, so the racy setters are the only
    // ones available. Nothing else runs yet.
    let installed = unsafe {
        log::set_max_level_racy(max_level);
        log::set_logger_racy(&LOGGER)
    };
    if installed.is_err() {
        defmt::warn!("A logger was already installed");
    }
}
