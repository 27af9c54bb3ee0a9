//! # WIFI access point client
//!
//! Restarting the module, joining/leaving a network and querying version and address
//! information. TCP operations are located in [stack](crate::stack).
//!
//! Every operation drains pending input first, writes the command and waits for a fixed set of
//! terminal needles. No operation is retried internally.
//!
//! ## Example
//!
//! ````ignore
//! let mut adapter: Adapter<_, _, _, 1_000> = Adapter::new(channel, timer);
//! adapter.restart()?;
//! adapter.join("test_wifi", "secret")?;
//!
//! let mut buffer = [0x0; 64];
//! let length = adapter.get_ip(&mut buffer)?;
//! ````
use crate::buffer::{Packet, PacketBuffer};
use crate::channel::{ByteChannel, NoReset, ResetLine};
use crate::commands::{
    AccessPointConnectCommand, AccessPointDisconnectCommand, CommandOutcome, EchoOffCommand,
    ObtainLocalAddressCommand, RestartCommand, SetMultipleConnectionsCommand, VersionCommand,
};
use crate::needle::{Needle, ERROR, OK, READY};
use crate::session::{Session, WaitResult};
use atat::AtatCmd;
use core::fmt::Debug;
use fugit_timer::Timer;

/// Max. time to wait for the `ready` banner after a hardware reset
const READY_TIMEOUT_MS: u32 = 3_000;

/// Duration the reset pin is pulled low
const RESET_PULSE_MS: u32 = 100;

/// Settle time before a software restart is requested
const RESTART_DELAY_MS: u32 = 1_000;

/// Default timeout for the confirmation of sent data
const SEND_TIMEOUT_MS: u32 = 5_000;

/// Wifi network adapter trait
pub trait WifiAdapter {
    /// Error when joining or leaving a WIFI network
    type Error: Debug;

    /// Connects to an WIFI access point
    fn join(&mut self, ssid: &str, key: &str) -> Result<(), Self::Error>;

    /// Disconnects from the current access point
    fn leave(&mut self) -> Result<(), Self::Error>;
}

/// Outcome of a failed operation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// No terminal response was matched within the timeout
    Timeout,

    /// Module responded with FAIL or ERROR
    ProtocolFailure,

    /// Module signaled that a connection is already established
    AlreadyConnected,

    /// A needle matched which is not mapped by the operation
    Unknown(usize),

    /// Writing to the channel failed
    WriteFailed,

    /// Given SSID is longer then the max. size of 32 chars
    InvalidSsidLength,

    /// Given password is longer then the max. size of 63 chars
    InvalidPasswordLength,

    /// Given remote host is longer then the max. size of 64 chars
    InvalidHostLength,

    /// Only a single connection is supported, which is already in use
    NoSocketAvailable,

    /// Unable to send data if socket is not connected
    SocketUnconnected,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Timeout => defmt::write!(f, "Error::Timeout"),
            Error::ProtocolFailure => defmt::write!(f, "Error::ProtocolFailure"),
            Error::AlreadyConnected => defmt::write!(f, "Error::AlreadyConnected"),
            Error::Unknown(index) => defmt::write!(f, "Error::Unknown({})", index),
            Error::WriteFailed => defmt::write!(f, "Error::WriteFailed"),
            Error::InvalidSsidLength => defmt::write!(f, "Error::InvalidSsidLength"),
            Error::InvalidPasswordLength => defmt::write!(f, "Error::InvalidPasswordLength"),
            Error::InvalidHostLength => defmt::write!(f, "Error::InvalidHostLength"),
            Error::NoSocketAvailable => defmt::write!(f, "Error::NoSocketAvailable"),
            Error::SocketUnconnected => defmt::write!(f, "Error::SocketUnconnected"),
        }
    }
}

/// Central client for network communication
///
/// `'buf` is the lifetime of the packet buffer lent by [Adapter::put_packet_buffer].
pub struct Adapter<
    'buf,
    C: ByteChannel,
    T: Timer<TIMER_HZ>,
    R: ResetLine,
    const TIMER_HZ: u32,
> {
    /// Link state and channel
    pub(crate) session: Session<C, T, TIMER_HZ>,

    /// Target of inbound frames received during any wait
    pub(crate) packet: PacketBuffer<'buf>,

    /// Reset pin of the module
    pub(crate) reset_line: R,

    /// Timeout for the confirmation of sent data
    pub(crate) send_timeout_ms: u32,

    /// True if the single socket was handed out by `socket()`
    pub(crate) socket_open: bool,

    /// True if the TCP connection is established
    pub(crate) connected: bool,
}

impl<'buf, C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32>
    Adapter<'buf, C, T, NoReset, TIMER_HZ>
{
    /// Creates a new adapter without hardware reset support
    pub fn new(channel: C, timer: T) -> Self {
        Self::with_reset_line(channel, timer, NoReset)
    }
}

impl<'buf, C: ByteChannel, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> WifiAdapter
    for Adapter<'buf, C, T, R, TIMER_HZ>
{
    type Error = Error;

    /// Connects to an WIFI access point.
    ///
    /// Returns [Error::ProtocolFailure] if the module responded with FAIL, e.g. on wrong credentials.
    fn join(&mut self, ssid: &str, key: &str) -> Result<(), Error> {
        if ssid.len() > 32 {
            return Err(Error::InvalidSsidLength);
        }

        if key.len() > 63 {
            return Err(Error::InvalidPasswordLength);
        }

        self.send_command(&AccessPointConnectCommand::new(ssid, key)?)
    }

    /// Disconnects from the current access point
    fn leave(&mut self) -> Result<(), Error> {
        self.send_command(&AccessPointDisconnectCommand)
    }
}

impl<'buf, C: ByteChannel, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32>
    Adapter<'buf, C, T, R, TIMER_HZ>
{
    /// Creates a new adapter, which may restart the module by the given reset pin
    pub fn with_reset_line(channel: C, timer: T, reset_line: R) -> Self {
        Self {
            session: Session::new(channel, timer),
            packet: PacketBuffer::none(),
            reset_line,
            send_timeout_ms: SEND_TIMEOUT_MS,
            socket_open: false,
            connected: false,
        }
    }

    /// Restarts the module by pulsing the reset pin and blocks until ready
    pub fn hardware_reset(&mut self) -> Result<(), Error> {
        self.drain();

        self.reset_line.set_low();
        self.reset_line.set_as_output();
        self.session.delay_ms(RESET_PULSE_MS);
        self.reset_line.set_as_input();

        match self.wait(&[READY], READY_TIMEOUT_MS) {
            WaitResult::Matched(_) => self.configure(),
            _ => Err(Error::Timeout),
        }
    }

    /// Restarts the module by AT command and blocks until ready
    pub fn restart(&mut self) -> Result<(), Error> {
        self.drain();
        self.session.delay_ms(RESTART_DELAY_MS);

        self.send_command(&RestartCommand)?;
        self.configure()
    }

    /// Disables the echo and multiple connections after restart
    fn configure(&mut self) -> Result<(), Error> {
        self.connected = false;

        self.send_command(&EchoOffCommand)?;
        self.send_command(&SetMultipleConnectionsCommand::single())?;
        debug!("Module ready");
        Ok(())
    }

    /// Writes the AT and SDK version information to the given buffer and returns the written
    /// length. Whitespace and line breaks are replaced by zero bytes.
    pub fn get_version(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        self.send_recording_command(&VersionCommand, buffer)
    }

    /// Writes the local address information to the given buffer and returns the written length.
    /// Whitespace and line breaks are replaced by zero bytes.
    pub fn get_ip(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        self.send_recording_command(&ObtainLocalAddressCommand, buffer)
    }

    /// Registers the buffer receiving inbound data. A previous buffer gets replaced.
    pub fn put_packet_buffer(&mut self, buffer: &'buf mut [u8]) {
        self.packet.put(buffer);
    }

    /// Hands back the registered buffer including its fill count.
    /// Inbound data gets discarded until a buffer is registered again.
    pub fn take_packet_buffer(&mut self) -> Option<Packet<'buf>> {
        self.packet.take()
    }

    /// Returns the count of bytes received in the registered buffer.
    /// If nothing was received yet, pending input is processed first.
    pub fn available(&mut self) -> usize {
        if self.packet.is_empty() {
            self.drain();
        }

        self.packet.len()
    }

    /// Sets the timeout for the confirmation of sent TCP data in ms
    pub fn set_send_timeout_ms(&mut self, timeout: u32) {
        self.send_timeout_ms = timeout;
    }

    /// Sets the max. time to wait for the next byte of an inbound frame in ms
    pub fn set_frame_byte_timeout_ms(&mut self, timeout: u32) {
        self.session.set_frame_byte_timeout_ms(timeout);
    }

    /// Sends a command and maps the matched needle
    pub(crate) fn send_command<Cmd: AtatCmd + CommandOutcome>(
        &mut self,
        command: &Cmd,
    ) -> Result<(), Error> {
        self.drain();
        self.session.write_command(command)?;

        match self.wait(Cmd::NEEDLES, Cmd::MAX_TIMEOUT_MS) {
            WaitResult::Matched(index) => Cmd::outcome(index),
            WaitResult::Prompt => Err(Error::Unknown(Cmd::NEEDLES.len())),
            WaitResult::Timeout => Err(Error::Timeout),
        }
    }

    /// Sends a command and records the raw response to the given buffer
    fn send_recording_command<Cmd: AtatCmd + CommandOutcome>(
        &mut self,
        command: &Cmd,
        buffer: &mut [u8],
    ) -> Result<usize, Error> {
        buffer.fill(0x0);

        self.drain();
        self.session.write_command(command)?;

        let mut record = PacketBuffer::new(buffer);
        let result = self.session.wait_for(
            &mut self.packet,
            Cmd::NEEDLES,
            Cmd::MAX_TIMEOUT_MS,
            None,
            Some(&mut record),
        );
        let length = record.len();
        trim_record(buffer);

        match result {
            WaitResult::Matched(index) => Cmd::outcome(index).map(|_| length),
            WaitResult::Prompt => Err(Error::Unknown(Cmd::NEEDLES.len())),
            WaitResult::Timeout => Err(Error::Timeout),
        }
    }

    /// Waits for OK/ERROR, e.g. after transmitting data
    pub(crate) fn confirm(&mut self, timeout_ms: u32) -> Result<(), Error> {
        match self.wait(&[OK, ERROR], timeout_ms) {
            WaitResult::Matched(0) => Ok(()),
            WaitResult::Matched(1) => Err(Error::ProtocolFailure),
            WaitResult::Matched(index) => Err(Error::Unknown(index)),
            WaitResult::Prompt => Err(Error::Unknown(2)),
            WaitResult::Timeout => Err(Error::Timeout),
        }
    }

    /// Waits for the given needles, inbound data is routed to the registered buffer
    pub(crate) fn wait(&mut self, needles: &[Needle], timeout_ms: u32) -> WaitResult {
        self.session.wait_for(&mut self.packet, needles, timeout_ms, None, None)
    }

    /// Processes pending input, inbound data is routed to the registered buffer
    pub(crate) fn drain(&mut self) {
        self.session.drain(&mut self.packet);
    }
}

/// Terminates the recorded response and replaces all whitespace and control characters by zero
fn trim_record(buffer: &mut [u8]) {
    if let Some(last) = buffer.last_mut() {
        *last = 0x0;
    }

    for byte in buffer.iter_mut().filter(|byte| **byte <= b' ') {
        *byte = 0x0;
    }
}
