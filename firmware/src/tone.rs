//! Speaker driven by one RP2040 PWM slice.

use embedded_hal::pwm::SetDutyCycle;
use key_recorder::ToneSource;
use rp2040_hal::pwm::{FreeRunning, Pwm0, Slice};

const MAX_DIVIDER: u32 = 255;
const COUNTER_RANGE: f32 = 65_536.0;

#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub enum ToneError {
    /// The slice cannot divide the system clock down to this frequency
    Unreachable,
}

/// Square wave on channel A of PWM slice 0 (GP16).
pub struct PwmTone {
    slice: Slice<Pwm0, FreeRunning>,
    sys_hz: u32,
    duty: u8,
}

impl PwmTone {
    /// The channel must already be routed to the speaker pin. The slice
    /// starts disabled.
    pub fn new(mut slice: Slice<Pwm0, FreeRunning>, sys_hz: u32) -> Self {
        slice.disable();
        Self { slice, sys_hz, duty: 50 }
    }

    fn apply_duty(&mut self) {
        // Channel errors are `Infallible`.
        let _ = self.slice.channel_a.set_duty_cycle_percent(self.duty);
    }
}

impl ToneSource for PwmTone {
    type Error = ToneError;

    fn set_frequency(&mut self, hz: f32) -> Result<(), Self::Error> {
        if hz.is_nan() || hz <= 0.0 {
            return Err(ToneError::Unreachable);
        }

        // f = sys / (div * (top + 1)); pick the smallest integer divider
        // that keeps TOP within 16 bits for the best resolution.
        let cycles = self.sys_hz as f32 / hz;
        let divider = (cycles / COUNTER_RANGE) as u32 + 1;
        if divider > MAX_DIVIDER {
            return Err(ToneError::Unreachable);
        }
        let top = (cycles / divider as f32) as u32;
        if top < 2 {
            return Err(ToneError::Unreachable);
        }

        self.slice.set_div_int(divider as u8);
        self.slice.set_div_frac(0);
        self.slice.set_top((top - 1) as u16);
        self.apply_duty();
        self.slice.enable();
        Ok(())
    }

    fn set_duty(&mut self, percent: u8) -> Result<(), Self::Error> {
        self.duty = percent.min(100);
        self.apply_duty();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        let _ = self.slice.channel_a.set_duty_cycle_fully_off();
        self.slice.disable();
        Ok(())
    }
}
