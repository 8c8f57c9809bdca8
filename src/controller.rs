//! The recorder's owning object: one scan loop over the matrix, the session
//! it feeds and the feedback it drives.

use core::ops::ControlFlow;

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use log::{debug, error, info, warn};
use rand::RngCore;

use crate::{
    config::RecorderConfig,
    debounce::Debounce,
    devices::{LedStrip, SessionLog, ToneSource},
    error::{FeedbackError, InitError, ScanError},
    feedback::Feedback,
    key_codes::{Key, Letter},
    key_mapping::{
        RecorderLayout, AUXILIARY_COLS, AUXILIARY_ROWS, PRIMARY_COLS, PRIMARY_ROWS,
    },
    key_scan::{GridLines, KeyScan, RecorderScan},
    session::{SessionRecord, SessionState, Toggle},
    time::{Duration, Instant, Monotonic, Timestamp, WallClock},
};

/// Hardware handed to the controller at startup and returned by
/// [`Controller::release`].
pub struct Board<O, I, D, S, T, L, C> {
    pub primary: GridLines<O, I, PRIMARY_ROWS, PRIMARY_COLS>,
    pub auxiliary: GridLines<O, I, AUXILIARY_ROWS, AUXILIARY_COLS>,
    pub delay: D,
    pub strip: S,
    pub tone: T,
    pub log: L,
    pub clock: C,
}

/// What one accepted keypress did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Selected(Letter),
    Deselected(Letter),
    Erased,
    /// Carries the record when the session held a selection.
    Committed(Option<SessionRecord>),
}

pub struct Controller<O, I, D, S, T, L, C, R> {
    layout: RecorderLayout,
    scan: RecorderScan<O, I>,
    delay: D,
    feedback: Feedback<S, T>,
    session: SessionState<R>,
    log: L,
    clock: C,
    scan_interval: Duration,
    shut_down: bool,
}

impl<O, I, D, S, T, L, C, R> Controller<O, I, D, S, T, L, C, R>
where
    O: OutputPin,
    I: InputPin,
    D: DelayNs,
    S: LedStrip,
    T: ToneSource,
    L: SessionLog,
    C: WallClock,
    R: RngCore,
{
    /// Park the rows, silence the speaker and paint the idle layout.
    ///
    /// # Errors
    ///
    /// Any of those steps failing is fatal; the board is dropped. The
    /// speaker is still silenced when parking the rows fails.
    pub fn new(
        layout: RecorderLayout,
        board: Board<O, I, D, S, T, L, C>,
        rng: R,
        config: &RecorderConfig,
    ) -> Result<Self, InitError> {
        let Board { primary, auxiliary, delay, strip, tone, log, clock } = board;

        let mut scan = KeyScan::new(
            primary,
            auxiliary,
            Debounce::with_interval(config.debounce),
            config.row_settle,
            config.active_level,
        );
        let mut feedback = Feedback::new(strip, tone, &layout, config);

        if let Err(ScanError::Pin(kind)) = scan.park() {
            if let Err(err) = feedback.silence() {
                warn!("Could not silence speaker: {err}");
            }
            return Err(InitError::Pin(kind));
        }

        feedback.init().map_err(|err| match err {
            FeedbackError::Strip => InitError::Strip,
            FeedbackError::Tone => InitError::Tone,
        })?;

        let session = SessionState::new(rng);
        info!("Recorder ready, session {}", session.session_id());

        Ok(Self {
            layout,
            scan,
            delay,
            feedback,
            session,
            log,
            clock,
            scan_interval: config.scan_interval,
            shut_down: false,
        })
    }

    /// Run one scan cycle and dispatch the accepted keypress, if any.
    pub fn tick(&mut self, now: Instant) -> Result<Option<Event>, ScanError> {
        let key = self.scan.scan(&self.layout, now, &mut self.delay)?;
        Ok(key.map(|key| self.dispatch(key)))
    }

    /// Scan at the configured cadence until `hook` breaks or a matrix line
    /// fails, then shut down.
    ///
    /// `hook` runs before every scan; the firmware uses it to service USB
    /// and host commands.
    pub fn run<M, H>(&mut self, clock: &M, mut hook: H) -> Result<(), ScanError>
    where
        M: Monotonic,
        H: FnMut(&mut Self) -> ControlFlow<()>,
    {
        let interval_us = self.scan_interval.to_micros().min(u32::MAX as u64) as u32;

        let result = loop {
            if hook(self).is_break() {
                info!("Shutdown requested");
                break Ok(());
            }
            if let Err(err) = self.tick(clock.now()) {
                error!("Scan failed: {err}");
                break Err(err);
            }
            self.delay.delay_us(interval_us);
        };

        self.shutdown();
        result
    }

    /// Silence the speaker, park the rows and flush the session log.
    ///
    /// Every step is attempted even if an earlier one fails. Calling it again
    /// does nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Err(err) = self.feedback.silence() {
            warn!("Could not silence speaker: {err}");
        }
        if let Err(err) = self.scan.park() {
            warn!("Could not park matrix rows: {err}");
        }
        if let Err(err) = self.log.flush() {
            error!("Could not flush session log: {err:?}");
        }
        info!("Recorder shut down");
    }

    /// Hand the hardware back. Call [`Controller::shutdown`] first.
    pub fn release(self) -> Board<O, I, D, S, T, L, C> {
        let (primary, auxiliary) = self.scan.release();
        let (strip, tone) = self.feedback.release();
        Board {
            primary,
            auxiliary,
            delay: self.delay,
            strip,
            tone,
            log: self.log,
            clock: self.clock,
        }
    }

    pub fn layout(&self) -> &RecorderLayout {
        &self.layout
    }

    pub fn session(&self) -> &SessionState<R> {
        &self.session
    }

    pub fn session_log_mut(&mut self) -> &mut L {
        &mut self.log
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    fn dispatch(&mut self, key: Key) -> Event {
        match key {
            Key::Erase => {
                info!("Erase pressed, dropping {}", self.session.selection());
                report(self.feedback.on_erase(&mut self.delay));
                self.session.erase();
                Event::Erased
            },
            Key::Commit => Event::Committed(self.commit()),
            Key::Letter(letter) => self.toggle(letter),
        }
    }

    fn toggle(&mut self, letter: Letter) -> Event {
        let toggle = self.session.toggle(letter);

        match self.layout.led_of(letter.into()) {
            Some(led) => {
                debug!("{letter} {toggle:?} (LED {})", led.get());
                report(match toggle {
                    Toggle::Selected => self.feedback.on_select(led, &mut self.delay),
                    Toggle::Deselected => self.feedback.on_deselect(led),
                });
            },
            None => warn!("{letter} has no LED"),
        }

        match toggle {
            Toggle::Selected => Event::Selected(letter),
            Toggle::Deselected => Event::Deselected(letter),
        }
    }

    fn commit(&mut self) -> Option<SessionRecord> {
        if self.session.selection().is_empty() {
            info!("Commit pressed with nothing selected");
            report(self.feedback.on_commit(false, &mut self.delay));
            return None;
        }

        let timestamp = self.clock.timestamp().unwrap_or_else(|err| {
            warn!("Wall clock unavailable ({err:?}), stamping with {}", Timestamp::EPOCH);
            Timestamp::EPOCH
        });

        let record = self.session.commit(timestamp);
        report(self.feedback.on_commit(record.is_some(), &mut self.delay));

        if let Some(record) = &record {
            match self.log.append(record) {
                Ok(()) => info!("Session saved: {record}"),
                Err(err) => error!("Failed to save session {record}: {err:?}"),
            }
        }
        record
    }
}

fn report(result: Result<(), FeedbackError>) {
    if let Err(err) = result {
        warn!("Feedback failed: {err}");
    }
}
