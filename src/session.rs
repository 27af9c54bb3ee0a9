//! # Command/response exchange
//!
//! [Session] pumps the received bytes through the rolling register, dispatches inbound frames
//! and reports which terminal needle matched. It has no knowledge about specific commands.
//!
//! Every exchange is started by a drain ([Session::drain]), which processes all bytes left over
//! from the previous exchange. Inbound frames are never lost by draining, but are routed to the
//! given packet buffer.
use crate::buffer::PacketBuffer;
use crate::channel::ByteChannel;
use crate::needle::{self, Needle, RollingState, IPD};
use crate::wifi::Error;
use atat::AtatCmd;
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;

/// Max. encoded length of a single command
const COMMAND_BUFFER_SIZE: usize = 256;

/// Default max. time to wait for the next byte of an inbound frame
const FRAME_BYTE_TIMEOUT_MS: u32 = 100;

/// Result of a single wait
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// Needle with the given index matched
    Matched(usize),

    /// Prompt byte was received
    Prompt,

    /// No needle matched within the timeout. Also returned by drains.
    Timeout,
}

/// Link state shared by all exchanges
///
/// Single instance per physical link. Not reentrant, every exchange needs to be completed before
/// the next is started.
pub struct Session<C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    /// Serial link to the module
    pub(crate) channel: C,

    /// Monotonic clock used for all timeouts
    pub(crate) timer: T,

    /// Last four received bytes
    pub(crate) state: RollingState,

    /// Max. time to wait for the next byte of an inbound frame
    pub(crate) frame_byte_timeout: TimerDurationU32<TIMER_HZ>,
}

impl<C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Session<C, T, TIMER_HZ> {
    pub fn new(channel: C, timer: T) -> Self {
        Self {
            channel,
            timer,
            state: RollingState::default(),
            frame_byte_timeout: TimerDurationU32::millis(FRAME_BYTE_TIMEOUT_MS),
        }
    }

    /// Waits until one of the given needles matches, the prompt byte is received or the timeout
    /// elapses. The timeout starts with this call.
    ///
    /// All available bytes are processed before the timeout is checked. So a timeout of zero
    /// processes the pending bytes only. Inbound frames are copied to `packet`, all other
    /// received bytes are mirrored to `record` if given.
    pub fn wait_for(
        &mut self,
        packet: &mut PacketBuffer<'_>,
        needles: &[Needle],
        timeout_ms: u32,
        prompt: Option<u8>,
        mut record: Option<&mut PacketBuffer<'_>>,
    ) -> WaitResult {
        debug_assert!(needle::are_distinct(needles), "needles are ambiguous");

        let start = self.timer.now();
        let timeout = TimerDurationU32::<TIMER_HZ>::millis(timeout_ms);

        if timeout_ms > 0 {
            trace!(
                "Waiting for {} needles (prompt: {:?}, timeout: {} ms)",
                needles.len(),
                prompt,
                timeout_ms
            );
        }

        loop {
            for _ in 0..self.channel.available() {
                let byte = match self.poll_byte() {
                    Some(byte) => byte,
                    None => break,
                };

                self.state.push(byte);
                if let Some(record) = record.as_mut() {
                    record.push(byte);
                }

                if self.state.matches(IPD) {
                    self.receive_frame(packet);
                }

                if prompt == Some(byte) {
                    return WaitResult::Prompt;
                }

                if let Some(index) = self.state.find(needles) {
                    return WaitResult::Matched(index);
                }
            }

            if self.is_elapsed(start, timeout) {
                return WaitResult::Timeout;
            }
        }
    }

    /// Processes all pending bytes without blocking
    pub fn drain(&mut self, packet: &mut PacketBuffer<'_>) {
        self.wait_for(packet, &[], 0, None, None);
    }

    /// Encodes and writes the given command
    pub(crate) fn write_command<Cmd: AtatCmd>(&mut self, command: &Cmd) -> Result<(), Error> {
        debug_assert!(Cmd::MAX_LEN <= COMMAND_BUFFER_SIZE, "command buffer too small");

        let mut buffer = [0x0; COMMAND_BUFFER_SIZE];
        let length = command.write(&mut buffer);
        self.write(&buffer[..length])
    }

    /// Writes raw data to the channel
    pub(crate) fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.channel.write_all(data).map_err(|error| {
            warn!("Writing {} bytes failed: {:?}", data.len(), error);
            Error::WriteFailed
        })
    }

    /// Blocks for the given duration
    pub(crate) fn delay_ms(&mut self, duration_ms: u32) {
        let start = self.timer.now();
        let duration = TimerDurationU32::<TIMER_HZ>::millis(duration_ms);

        while !self.is_elapsed(start, duration) {}
    }

    /// Sets the max. time to wait for the next byte of an inbound frame
    pub fn set_frame_byte_timeout_ms(&mut self, timeout: u32) {
        self.frame_byte_timeout = TimerDurationU32::millis(timeout);
    }

    /// Reads the next byte and retries until the frame byte timeout elapses
    pub(crate) fn read_byte_bounded(&mut self) -> Option<u8> {
        if let Some(byte) = self.poll_byte() {
            return Some(byte);
        }

        let start = self.timer.now();
        let timeout = self.frame_byte_timeout;

        loop {
            if let Some(byte) = self.poll_byte() {
                return Some(byte);
            }

            if self.is_elapsed(start, timeout) {
                return None;
            }
        }
    }

    /// Hands over to frame interception after `+IPD` was matched
    fn receive_frame(&mut self, packet: &mut PacketBuffer<'_>) {
        match self.intercept(packet) {
            Ok(length) => debug!("+IPD: {} bytes, {} buffered", length, packet.len()),
            Err(error) => warn!("Aborted inbound frame: {:?} ({} buffered)", error, packet.len()),
        }

        // Bytes before the frame must not form a needle together with the following bytes
        self.state.reset();
    }

    /// Single non-blocking read
    fn poll_byte(&mut self) -> Option<u8> {
        match self.channel.read() {
            Ok(byte) => Some(byte),
            Err(nb::Error::WouldBlock) => None,
            Err(nb::Error::Other(error)) => {
                warn!("Reading from channel failed: {:?}", error);
                None
            }
        }
    }

    /// Returns true if the given duration has passed since start
    fn is_elapsed(
        &mut self,
        start: TimerInstantU32<TIMER_HZ>,
        duration: TimerDurationU32<TIMER_HZ>,
    ) -> bool {
        match self.timer.now().checked_duration_since(start) {
            Some(elapsed) => elapsed >= duration,
            None => true,
        }
    }
}
