//! Board time sources: the RP2040 timer for scanning, the RTC for stamping
//! sessions.

use key_recorder::{Instant, Monotonic, Timestamp, TimestampError, WallClock};
use rp2040_hal::{
    rtc::{DateTime, DayOfWeek, RealTimeClock, RtcError},
    Timer,
};

/// Monotonic microsecond clock.
pub struct TimerClock(pub Timer);

impl Monotonic for TimerClock {
    fn now(&self) -> Instant {
        self.0.get_counter()
    }
}

#[derive(Debug)]
pub enum ClockError {
    Rtc(RtcError),
    /// The RTC holds a date the recorder cannot represent
    Invalid(TimestampError),
}

impl From<RtcError> for ClockError {
    fn from(err: RtcError) -> Self {
        ClockError::Rtc(err)
    }
}

/// Wall clock backed by the RTC. It starts at [`Timestamp::EPOCH`] on every
/// reset until the host sets it.
pub struct RtcClock {
    rtc: RealTimeClock,
}

impl RtcClock {
    pub fn new(rtc: RealTimeClock) -> Self {
        Self { rtc }
    }

    pub fn set(&mut self, timestamp: Timestamp) -> Result<(), ClockError> {
        self.rtc.set_datetime(to_datetime(timestamp))?;
        Ok(())
    }
}

impl WallClock for RtcClock {
    type Error = ClockError;

    fn timestamp(&mut self) -> Result<Timestamp, Self::Error> {
        let now = self.rtc.now()?;
        Timestamp::new(now.year, now.month, now.day, now.hour, now.minute, now.second)
            .map_err(ClockError::Invalid)
    }
}

pub fn to_datetime(timestamp: Timestamp) -> DateTime {
    let day_of_week = match timestamp.weekday() {
        0 => DayOfWeek::Sunday,
        1 => DayOfWeek::Monday,
        2 => DayOfWeek::Tuesday,
        3 => DayOfWeek::Wednesday,
        4 => DayOfWeek::Thursday,
        5 => DayOfWeek::Friday,
        _ => DayOfWeek::Saturday,
    };
    DateTime {
        year: timestamp.year(),
        month: timestamp.month(),
        day: timestamp.day(),
        day_of_week,
        hour: timestamp.hour(),
        minute: timestamp.minute(),
        second: timestamp.second(),
    }
}
