//! Time sources: the monotonic scan clock and the wall clock that stamps
//! session records.

use core::{fmt, str::FromStr};

/// Microsecond instant, matching the RP2040 timer's counter.
pub type Instant = fugit::TimerInstantU64<1_000_000>;
/// Microsecond duration, matching [`Instant`].
pub type Duration = fugit::TimerDurationU64<1_000_000>;

/// A free-running clock used for debouncing.
pub trait Monotonic {
    fn now(&self) -> Instant;
}

/// Calendar clock used to stamp committed sessions.
pub trait WallClock {
    type Error: fmt::Debug;

    fn timestamp(&mut self) -> Result<Timestamp, Self::Error>;
}

/// Calendar date and time of day, second resolution, no time zone.
///
/// Renders as `YYYY-MM-DD HH:MM:SS`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimestampError {
    /// The text is not `YYYY-MM-DD HH:MM:SS`
    Format,
    /// A field is outside its calendar range
    OutOfRange,
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format => write!(f, "Expected YYYY-MM-DD HH:MM:SS"),
            TimestampError::OutOfRange => write!(f, "Date or time field out of range"),
        }
    }
}

impl core::error::Error for TimestampError {}

impl Timestamp {
    /// Used when the wall clock cannot be read.
    pub const EPOCH: Timestamp =
        Timestamp { year: 2000, month: 1, day: 1, hour: 0, minute: 0, second: 0 };

    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, TimestampError> {
        let valid_date = year >= 1
            && (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month);
        if !valid_date || hour > 23 || minute > 59 || second > 59 {
            return Err(TimestampError::OutOfRange);
        }
        Ok(Self { year, month, day, hour, minute, second })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    /// Day of the week, 0 = Sunday.
    pub fn weekday(&self) -> u8 {
        // Sakamoto's method
        const OFFSETS: [u16; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];
        let year = if self.month < 3 { self.year - 1 } else { self.year };
        let days = year + year / 4 - year / 100 + year / 400
            + OFFSETS[self.month as usize - 1]
            + self.day as u16;
        (days % 7) as u8
    }
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bytes = text.as_bytes();
        if bytes.len() != 19
            || bytes[4] != b'-'
            || bytes[7] != b'-'
            || bytes[10] != b' '
            || bytes[13] != b':'
            || bytes[16] != b':'
        {
            return Err(TimestampError::Format);
        }

        let field = |start: usize, len: usize| -> Result<u16, TimestampError> {
            bytes[start..start + len].iter().try_fold(0u16, |acc, byte| match byte {
                b'0'..=b'9' => Ok(acc * 10 + (byte - b'0') as u16),
                _ => Err(TimestampError::Format),
            })
        };

        Timestamp::new(
            field(0, 4)?,
            field(5, 2)? as u8,
            field(8, 2)? as u8,
            field(11, 2)? as u8,
            field(14, 2)? as u8,
            field(17, 2)? as u8,
        )
    }
}
