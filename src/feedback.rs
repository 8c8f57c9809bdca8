//! LED and tone side effects of selection changes.
//!
//! Every public operation ends with at most one `show`, and every tone
//! sequence ends by silencing the tone source even when a step fails.

use embedded_hal::delay::DelayNs;

use crate::{
    config::{Note, Palette, RecorderConfig},
    devices::{LedStrip, ToneSource},
    error::FeedbackError,
    key_mapping::{KeyLayout, LedIndex},
};

pub struct Feedback<S, T> {
    strip: S,
    tone: T,
    num_pixels: usize,
    commit_led: LedIndex,
    erase_led: LedIndex,
    palette: Palette,
    key_beep: Note,
    success_melody: [Note; 4],
    tone_duty: u8,
}

impl<S, T> Feedback<S, T>
where
    S: LedStrip,
    T: ToneSource,
{
    pub fn new<const PR: usize, const PC: usize, const AR: usize, const AC: usize>(
        strip: S,
        tone: T,
        layout: &KeyLayout<PR, PC, AR, AC>,
        config: &RecorderConfig,
    ) -> Self {
        Self {
            strip,
            tone,
            num_pixels: layout.num_pixels(),
            commit_led: layout.commit_led(),
            erase_led: layout.erase_led(),
            palette: config.palette,
            key_beep: config.key_beep,
            success_melody: config.success_melody,
            tone_duty: config.tone_duty,
        }
    }

    /// Silence the speaker and paint the idle layout.
    pub fn init(&mut self) -> Result<(), FeedbackError> {
        self.silence()?;
        self.paint_idle();
        self.strip.show().map_err(|_| FeedbackError::Strip)
    }

    pub fn on_select<D: DelayNs>(
        &mut self,
        led: LedIndex,
        delay: &mut D,
    ) -> Result<(), FeedbackError> {
        self.strip.set_pixel(led, self.palette.selected);
        let shown = self.strip.show().map_err(|_| FeedbackError::Strip);
        let beeped = self.play(&[self.key_beep], delay);
        shown.and(beeped)
    }

    pub fn on_deselect(&mut self, led: LedIndex) -> Result<(), FeedbackError> {
        self.strip.set_pixel(led, self.palette.default);
        self.strip.show().map_err(|_| FeedbackError::Strip)
    }

    pub fn on_erase<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), FeedbackError> {
        self.paint_idle();
        let shown = self.strip.show().map_err(|_| FeedbackError::Strip);
        let beeped = self.play(&[self.key_beep], delay);
        shown.and(beeped)
    }

    /// The melody only plays when a session was actually saved; the LEDs
    /// are reset either way.
    pub fn on_commit<D: DelayNs>(
        &mut self,
        had_selection: bool,
        delay: &mut D,
    ) -> Result<(), FeedbackError> {
        let played = if had_selection {
            let melody = self.success_melody;
            self.play(&melody, delay)
        } else {
            Ok(())
        };
        self.paint_idle();
        let shown = self.strip.show().map_err(|_| FeedbackError::Strip);
        played.and(shown)
    }

    pub fn silence(&mut self) -> Result<(), FeedbackError> {
        self.tone.stop().map_err(|_| FeedbackError::Tone)
    }

    pub fn release(self) -> (S, T) {
        (self.strip, self.tone)
    }

    /// Stage the default color everywhere, with the control keys marked.
    fn paint_idle(&mut self) {
        for led in (0..=u8::MAX).take(self.num_pixels) {
            self.strip.set_pixel(LedIndex(led), self.palette.default);
        }
        self.strip.set_pixel(self.commit_led, self.palette.commit);
        self.strip.set_pixel(self.erase_led, self.palette.erase);
    }

    fn play<D: DelayNs>(&mut self, notes: &[Note], delay: &mut D) -> Result<(), FeedbackError> {
        let duty = self.tone_duty;
        let tone = &mut self.tone;
        let played = notes.iter().try_for_each(|note| {
            tone.set_frequency(note.hz).map_err(|_| FeedbackError::Tone)?;
            tone.set_duty(duty).map_err(|_| FeedbackError::Tone)?;
            delay.delay_ms(note.duration_ms);
            Ok(())
        });

        let silenced = self.silence();
        played.and(silenced)
    }
}
