//! Session log streamed over USB CDC serial.
//!
//! Each committed session goes out as one CRLF-terminated CSV line; the host
//! appends the stream to `keypress_log.csv`. Bytes typed on the host come
//! back through [`UsbLink::poll`].

use core::fmt::Write;

use heapless::String;
use key_recorder::{SessionLog, SessionRecord};
use usb_device::{bus::UsbBus, device::UsbDevice, UsbError};
use usbd_serial::SerialPort;

/// Polls to wait for the endpoint before a write is abandoned.
const MAX_ATTEMPTS: u32 = 10_000;

#[derive(Debug)]
pub enum UsbLogError {
    /// No terminal has the port open
    NotConnected,
    /// The record line did not fit the line buffer
    LineTooLong,
    /// The host stopped reading
    Timeout,
    Usb(UsbError),
}

pub struct UsbLink<'a, B: UsbBus> {
    device: UsbDevice<'a, B>,
    serial: SerialPort<'a, B>,
}

impl<'a, B: UsbBus> UsbLink<'a, B> {
    pub fn new(device: UsbDevice<'a, B>, serial: SerialPort<'a, B>) -> Self {
        Self { device, serial }
    }

    /// Service the USB device and read what the host sent, returning the
    /// number of bytes placed in `buf`.
    pub fn poll(&mut self, buf: &mut [u8]) -> usize {
        if !self.device.poll(&mut [&mut self.serial]) {
            return 0;
        }
        match self.serial.read(buf) {
            Ok(count) => count,
            Err(UsbError::WouldBlock) => 0,
            Err(err) => {
                log::warn!("USB serial read failed: {err:?}");
                0
            },
        }
    }

    /// Run `op` until it stops reporting `WouldBlock`, polling the device
    /// in between.
    fn retry<T>(
        &mut self,
        mut op: impl FnMut(&mut SerialPort<'a, B>) -> Result<T, UsbError>,
    ) -> Result<T, UsbLogError> {
        for _ in 0..MAX_ATTEMPTS {
            match op(&mut self.serial) {
                Err(UsbError::WouldBlock) => {
                    self.device.poll(&mut [&mut self.serial]);
                },
                Err(err) => return Err(UsbLogError::Usb(err)),
                Ok(value) => return Ok(value),
            }
        }
        Err(UsbLogError::Timeout)
    }
}

impl<B: UsbBus> SessionLog for UsbLink<'_, B> {
    type Error = UsbLogError;

    fn append(&mut self, record: &SessionRecord) -> Result<(), Self::Error> {
        if !self.serial.dtr() {
            return Err(UsbLogError::NotConnected);
        }

        let mut line: String<96> = String::new();
        write!(line, "{record}\r\n").map_err(|_| UsbLogError::LineTooLong)?;

        let mut remaining = line.as_bytes();
        while !remaining.is_empty() {
            let written = self.retry(|serial| serial.write(remaining))?;
            remaining = &remaining[written..];
        }
        self.flush()
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.retry(|serial| serial.flush())
    }
}
