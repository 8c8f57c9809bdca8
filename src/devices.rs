//! Output capabilities the recorder drives
//!
//! Matrix lines and delays use the embedded-hal traits directly. The three
//! outputs below have no embedded-hal counterpart:
//!
//! - [`LedStrip`] - one addressable LED per key, flushed in batches
//! - [`ToneSource`] - a square wave on the speaker
//! - [`SessionLog`] - append-only sink for committed sessions

use core::fmt::Debug;

use smart_leds_trait::{SmartLedsWrite, RGB8};

use crate::{key_mapping::LedIndex, session::SessionRecord};

/// An addressable LED strip.
///
/// `set_pixel` only stages a color; nothing reaches the LEDs until `show`.
pub trait LedStrip {
    type Error: Debug;

    fn set_pixel(&mut self, index: LedIndex, color: RGB8);

    fn show(&mut self) -> Result<(), Self::Error>;
}

/// A variable-frequency square wave generator.
pub trait ToneSource {
    type Error: Debug;

    fn set_frequency(&mut self, hz: f32) -> Result<(), Self::Error>;

    /// Duty cycle in percent, `0..=100`.
    fn set_duty(&mut self, percent: u8) -> Result<(), Self::Error>;

    /// Silence the output.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

/// Append-only store of committed sessions.
///
/// Implementations must never rewrite a record once appended.
pub trait SessionLog {
    type Error: Debug;

    fn append(&mut self, record: &SessionRecord) -> Result<(), Self::Error>;

    /// Push buffered records to the underlying store.
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Channel order expected on the data line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorOrder {
    /// What WS2812 drivers send natively; no reordering
    #[default]
    Grb,
    /// WS2811 strips wired for red first
    Rgb,
}

impl ColorOrder {
    /// Map a logical color to what the driver must send so the strip shows it.
    fn encode(self, color: RGB8) -> RGB8 {
        match self {
            ColorOrder::Grb => color,
            ColorOrder::Rgb => RGB8 { r: color.g, g: color.r, b: color.b },
        }
    }
}

/// Frame buffer in front of a [`SmartLedsWrite`] driver.
pub struct BufferedStrip<W, const N: usize> {
    writer: W,
    order: ColorOrder,
    frame: [RGB8; N],
}

impl<W, const N: usize> BufferedStrip<W, N>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: Debug,
{
    pub fn new(writer: W, order: ColorOrder) -> Self {
        Self { writer, order, frame: [RGB8::default(); N] }
    }

    /// The staged frame, in logical colors.
    pub fn frame(&self) -> &[RGB8; N] {
        &self.frame
    }

    pub fn release(self) -> W {
        self.writer
    }
}

impl<W, const N: usize> LedStrip for BufferedStrip<W, N>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: Debug,
{
    type Error = W::Error;

    fn set_pixel(&mut self, index: LedIndex, color: RGB8) {
        match self.frame.get_mut(index.get()) {
            Some(pixel) => *pixel = color,
            None => log::warn!("LED {} is beyond the {} pixel strip", index.get(), N),
        }
    }

    fn show(&mut self) -> Result<(), Self::Error> {
        let order = self.order;
        self.writer.write(self.frame.iter().map(|color| order.encode(*color)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CapturingWriter {
        writes: Vec<Vec<RGB8>>,
    }

    impl SmartLedsWrite for CapturingWriter {
        type Error = ();
        type Color = RGB8;

        fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
        where
            T: IntoIterator<Item = I>,
            I: Into<Self::Color>,
        {
            self.writes.push(iterator.into_iter().map(Into::into).collect());
            Ok(())
        }
    }

    const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };

    #[test]
    fn set_pixel_stages_without_writing() {
        let mut strip: BufferedStrip<_, 4> =
            BufferedStrip::new(CapturingWriter::default(), ColorOrder::Grb);
        strip.set_pixel(LedIndex(2), RED);
        assert_eq!(strip.frame()[2], RED);
        assert!(strip.release().writes.is_empty());
    }

    #[test]
    fn show_writes_the_whole_frame_once() {
        let mut strip: BufferedStrip<_, 4> =
            BufferedStrip::new(CapturingWriter::default(), ColorOrder::Grb);
        strip.set_pixel(LedIndex(0), RED);
        strip.set_pixel(LedIndex(3), RED);
        strip.show().unwrap();
        let writes = strip.release().writes;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], [RED, RGB8::default(), RGB8::default(), RED]);
    }

    #[test]
    fn rgb_order_swaps_red_and_green_on_the_wire() {
        let mut strip: BufferedStrip<_, 1> =
            BufferedStrip::new(CapturingWriter::default(), ColorOrder::Rgb);
        strip.set_pixel(LedIndex(0), RED);
        strip.show().unwrap();
        assert_eq!(strip.frame()[0], RED);
        assert_eq!(strip.release().writes[0], [RGB8 { r: 0, g: 255, b: 0 }]);
    }

    #[test]
    fn out_of_range_pixel_is_ignored() {
        let mut strip: BufferedStrip<_, 2> =
            BufferedStrip::new(CapturingWriter::default(), ColorOrder::Grb);
        strip.set_pixel(LedIndex(9), RED);
        assert_eq!(strip.frame(), &[RGB8::default(); 2]);
    }
}
