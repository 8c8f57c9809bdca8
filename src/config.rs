//! Recorder timing, colors and sounds

use smart_leds_trait::RGB8;

use crate::{debounce::DEFAULT_INTERVAL, time::Duration};

pub const WHITE: RGB8 = RGB8 { r: 255, g: 255, b: 255 };
pub const GREEN: RGB8 = RGB8 { r: 0, g: 255, b: 0 };
pub const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };

/// A single tone: frequency and how long it sounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    pub hz: f32,
    pub duration_ms: u32,
}

impl Note {
    pub const fn new(hz: f32, duration_ms: u32) -> Self {
        Self { hz, duration_ms }
    }
}

/// A4 blip played on every accepted keypress except commit.
pub const KEY_BEEP: Note = Note::new(440.0, 50);

/// G major arpeggio (G4 B4 D5 G5) played when a session is saved.
pub const SUCCESS_MELODY: [Note; 4] = [
    Note::new(392.0, 100),
    Note::new(493.88, 100),
    Note::new(587.33, 100),
    Note::new(783.99, 200),
];

/// Logic level that makes a matrix line active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Rows are pulled low to select them; columns have pull-ups and read
    /// low through a closed switch
    #[default]
    Low,
    /// Rows are driven high; columns have pull-downs
    High,
}

/// Colors the four LED states map to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub default: RGB8,
    pub selected: RGB8,
    pub commit: RGB8,
    pub erase: RGB8,
}

impl Default for Palette {
    fn default() -> Self {
        Palette { default: WHITE, selected: GREEN, commit: GREEN, erase: RED }
    }
}

/// Recorder configuration
///
/// Use [`Builder`] to create one, or `RecorderConfig::default()` for the
/// recorder board's values.
#[derive(Clone, Debug, PartialEq)]
pub struct RecorderConfig {
    /// Minimum spacing between accepted keypresses
    pub debounce: Duration,
    /// Wait between activating a row and sampling its columns
    pub row_settle: Duration,
    /// Pause between scan cycles
    pub scan_interval: Duration,
    /// Level that activates a row and marks a pressed column
    pub active_level: Level,
    pub palette: Palette,
    /// Tone for ordinary keypresses and erase
    pub key_beep: Note,
    /// Tone sequence for a commit that saved a session
    pub success_melody: [Note; 4],
    /// Duty cycle of every tone, in percent
    pub tone_duty: u8,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Builder::new().build()
    }
}

/// Builder for [`RecorderConfig`]
///
/// # Example
///
/// ```
/// use key_recorder::{Builder, Duration};
///
/// let config = Builder::new()
///     .debounce(Duration::millis(150))
///     .scan_interval(Duration::millis(5))
///     .build();
/// assert_eq!(config.tone_duty, 50);
/// ```
#[derive(Clone, Debug)]
pub struct Builder {
    debounce: Duration,
    row_settle: Duration,
    scan_interval: Duration,
    active_level: Level,
    palette: Palette,
    key_beep: Note,
    success_melody: [Note; 4],
    tone_duty: u8,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            debounce: DEFAULT_INTERVAL,
            row_settle: Duration::millis(1),
            scan_interval: Duration::millis(10),
            active_level: Level::Low,
            palette: Palette::default(),
            key_beep: KEY_BEEP,
            success_melody: SUCCESS_MELODY,
            tone_duty: 50,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debounce(mut self, interval: Duration) -> Self {
        self.debounce = interval;
        self
    }

    pub fn row_settle(mut self, settle: Duration) -> Self {
        self.row_settle = settle;
        self
    }

    pub fn scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    pub fn active_level(mut self, level: Level) -> Self {
        self.active_level = level;
        self
    }

    pub fn palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn key_beep(mut self, note: Note) -> Self {
        self.key_beep = note;
        self
    }

    pub fn success_melody(mut self, melody: [Note; 4]) -> Self {
        self.success_melody = melody;
        self
    }

    /// Set the tone duty cycle, clamped to 100%.
    pub fn tone_duty(mut self, percent: u8) -> Self {
        self.tone_duty = percent.min(100);
        self
    }

    pub fn build(self) -> RecorderConfig {
        RecorderConfig {
            debounce: self.debounce,
            row_settle: self.row_settle,
            scan_interval: self.scan_interval,
            active_level: self.active_level,
            palette: self.palette,
            key_beep: self.key_beep,
            success_melody: self.success_melody,
            tone_duty: self.tone_duty,
        }
    }
}
