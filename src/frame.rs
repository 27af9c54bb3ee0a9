//! # Inbound frame interception
//!
//! The module pushes received TCP data as `+IPD,<length>:<payload>` at any point of the stream.
//! As soon as the rolling register equals `+IPD`, the session stops matching and reads the
//! header and exactly `<length>` payload bytes straight from the channel. Payload is copied into
//! the registered [PacketBuffer] as long as space is left, the remainder is consumed and dropped,
//! so that the stream stays in sync.
use crate::buffer::PacketBuffer;
use crate::channel::ByteChannel;
use crate::session::Session;
use fugit_timer::Timer;

/// Reasons for aborting an inbound frame
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// Header contained an unexpected byte
    Malformed,

    /// Channel stalled before the frame was complete
    Incomplete,
}

/// Internal state of the header parser
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum HeaderState {
    /// Expecting `,`
    Separator,

    /// Reading decimal digits until `:`
    Length,
}

/// Parser for the `,<length>:` header following `+IPD`
#[derive(Clone, Debug)]
pub(crate) struct FrameHeader {
    state: HeaderState,
    length: usize,
}

impl FrameHeader {
    pub(crate) fn new() -> Self {
        Self {
            state: HeaderState::Separator,
            length: 0,
        }
    }

    /// Consumes the next header byte. Returns the payload length once the header is complete.
    pub(crate) fn feed(&mut self, byte: u8) -> Result<Option<usize>, FrameError> {
        match (self.state, byte) {
            (HeaderState::Separator, b',') => {
                self.state = HeaderState::Length;
                Ok(None)
            }
            (HeaderState::Length, b'0'..=b'9') => {
                self.length = self.length.saturating_mul(10).saturating_add((byte - b'0') as usize);
                Ok(None)
            }
            (HeaderState::Length, b':') => Ok(Some(self.length)),
            _ => Err(FrameError::Malformed),
        }
    }
}

impl<C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Session<C, T, TIMER_HZ> {
    /// Consumes an inbound frame right after `+IPD` has been matched.
    /// Returns the payload length announced by the header.
    ///
    /// Already copied bytes stay in the buffer if the frame gets aborted.
    pub(crate) fn intercept(&mut self, packet: &mut PacketBuffer<'_>) -> Result<usize, FrameError> {
        let mut header = FrameHeader::new();

        let length = loop {
            let byte = self.read_byte_bounded().ok_or(FrameError::Incomplete)?;
            if let Some(length) = header.feed(byte)? {
                break length;
            }
        };

        for _ in 0..length {
            let byte = self.read_byte_bounded().ok_or(FrameError::Incomplete)?;
            packet.push(byte);
        }

        Ok(length)
    }
}
