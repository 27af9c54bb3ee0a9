//! # Serial link abstraction
//!
//! The adapter talks to the module through a [ByteChannel] and optionally pulses its reset pin
//! through a [ResetLine]. Serial drivers implementing the [embedded_io] traits can be used by
//! wrapping them into an [IoChannel].
use core::fmt::Debug;
use embedded_io::{Read, ReadReady, Write};

/// Duplex byte stream to the ESP-AT module
pub trait ByteChannel {
    /// Transport error
    type Error: Debug;

    /// Reads a single byte without blocking. Returns [nb::Error::WouldBlock] if no data is ready.
    fn read(&mut self) -> nb::Result<u8, Self::Error>;

    /// Returns the number of bytes which can be read without blocking
    fn available(&mut self) -> usize;

    /// Writes the complete buffer, blocks until done
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// Reset pin of the module
///
/// The pin is pulled low by switching it to output, and released by switching it back to input.
pub trait ResetLine {
    /// Sets the output level to low
    fn set_low(&mut self);

    /// Switches the pin to output mode
    fn set_as_output(&mut self);

    /// Switches the pin to (floating) input mode
    fn set_as_input(&mut self);
}

/// Placeholder if the reset pin is not wired up
#[derive(Copy, Clone, Debug, Default)]
pub struct NoReset;

impl ResetLine for NoReset {
    fn set_low(&mut self) {}

    fn set_as_output(&mut self) {}

    fn set_as_input(&mut self) {}
}

/// Adapts a serial driver implementing the [embedded_io] traits
///
/// [embedded_io::ReadReady] only tells whether data is pending, so at most one byte is reported
/// as available at a time.
pub struct IoChannel<T> {
    inner: T,
}

impl<T> IoChannel<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Returns the wrapped serial driver
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + ReadReady + Write> ByteChannel for IoChannel<T> {
    type Error = T::Error;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        if !self.inner.read_ready()? {
            return Err(nb::Error::WouldBlock);
        }

        let mut byte = [0x0; 1];
        match self.inner.read(&mut byte)? {
            0 => Err(nb::Error::WouldBlock),
            _ => Ok(byte[0]),
        }
    }

    fn available(&mut self) -> usize {
        match self.inner.read_ready() {
            Ok(true) => 1,
            _ => 0,
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(data)?;
        self.inner.flush()
    }
}
