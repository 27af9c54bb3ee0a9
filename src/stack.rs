//! # TCP client
//!
//! A single TCP connection is supported. Besides the blocking methods of [Adapter]
//! ([Adapter::tcp_open], [Adapter::tcp_send], [Adapter::tcp_receive], [Adapter::tcp_close]),
//! [TcpClientStack] of [embedded_nal] is implemented on top of them.
//!
//! Inbound data is pushed by the module at any time. Data which arrives during other operations
//! is dropped unless a packet buffer is registered (s. [Adapter::put_packet_buffer]).
//!
//! ## Example
//!
//! ````ignore
//! adapter.tcp_open("10.0.0.1", 21)?;
//! adapter.tcp_send(b"hallo!")?;
//!
//! let mut rx_buffer = [0x0; 64];
//! let length = adapter.tcp_receive(&mut rx_buffer, 1_000);
//! assert_eq!(b"nice to see you!", &rx_buffer[..length]);
//!
//! adapter.tcp_close()?;
//! ````
use crate::buffer::PacketBuffer;
use crate::channel::{ByteChannel, ResetLine};
use crate::commands::{CloseSocketCommand, ConnectCommand, TransmissionPrepareCommand};
use crate::session::WaitResult;
use crate::wifi::{Adapter, Error};
use atat::AtatCmd;
use core::fmt::Write;
use embedded_nal::{SocketAddr, TcpClientStack, TcpError, TcpErrorKind};
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use heapless::String;

/// Max. payload length of a single CIPSEND command
const MAX_SEND_LENGTH: usize = 2048;

/// Prompt signaling that the payload can be written
const SEND_PROMPT: u8 = b'>';

/// Handle of the single TCP connection
#[derive(Debug)]
pub struct Socket {
    _private: (),
}

impl Socket {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

impl TcpError for Error {
    fn kind(&self) -> TcpErrorKind {
        match self {
            Error::SocketUnconnected => TcpErrorKind::PipeClosed,
            _ => TcpErrorKind::Other,
        }
    }
}

impl<'buf, C: ByteChannel, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32>
    Adapter<'buf, C, T, R, TIMER_HZ>
{
    /// Opens a TCP connection to the given host (name or IPv4 address) and port.
    ///
    /// Succeeds once the module confirmed the connection in both steps. If the first step is
    /// answered by ERROR, the second step is skipped.
    pub fn tcp_open(&mut self, host: &str, port: u16) -> Result<(), Error> {
        self.open(ConnectCommand::tcp(host, port)?)
    }

    /// Closes the TCP connection
    pub fn tcp_close(&mut self) -> Result<(), Error> {
        self.connected = false;
        self.send_command(&CloseSocketCommand)
    }

    /// Sends the given data. Length is limited by the module to 2048 bytes.
    pub fn tcp_send(&mut self, data: &[u8]) -> Result<(), Error> {
        let command = TransmissionPrepareCommand::new(data.len());

        self.drain();
        self.session.write_command(&command)?;

        let prompt = self.session.wait_for(
            &mut self.packet,
            &[],
            TransmissionPrepareCommand::MAX_TIMEOUT_MS,
            Some(SEND_PROMPT),
            None,
        );
        if prompt != WaitResult::Prompt {
            return Err(Error::Timeout);
        }

        self.session.write(data)?;
        self.confirm(self.send_timeout_ms)
    }

    /// Waits until inbound data is received in the given buffer and returns the received length.
    /// Returns zero if nothing was received within the timeout.
    ///
    /// Data already collected in the registered packet buffer (s. [Adapter::put_packet_buffer])
    /// is returned first. Otherwise pending and arriving frames are copied to the given buffer
    /// directly.
    pub fn tcp_receive(&mut self, buffer: &mut [u8], timeout_ms: u32) -> usize {
        if !self.packet.is_empty() {
            return self.packet.read_into(buffer);
        }

        let mut packet = PacketBuffer::new(buffer);
        let start = self.session.timer.now();
        let timeout = TimerDurationU32::<TIMER_HZ>::millis(timeout_ms);

        loop {
            self.session.drain(&mut packet);
            if !packet.is_empty() {
                return packet.len();
            }

            let elapsed = self.session.timer.now().checked_duration_since(start);
            if elapsed.map_or(true, |elapsed| elapsed >= timeout) {
                return 0;
            }
        }
    }

    /// Returns true if the TCP connection was established by this adapter
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Runs both steps of connection establishment
    fn open(&mut self, command: ConnectCommand) -> Result<(), Error> {
        self.send_command(&command)?;
        self.confirm(ConnectCommand::MAX_TIMEOUT_MS)?;

        self.connected = true;
        Ok(())
    }

    /// Formats the remote address and connects
    fn connect_address(&mut self, remote: SocketAddr) -> Result<(), Error> {
        let mut host: String<39> = String::new();
        write!(host, "{}", remote.ip()).map_err(|_| Error::InvalidHostLength)?;

        let command = match remote {
            SocketAddr::V4(_) => ConnectCommand::tcp(&host, remote.port())?,
            SocketAddr::V6(_) => ConnectCommand::tcp_v6(&host, remote.port())?,
        };

        match self.open(command) {
            // Connection still exists, e.g. after a missed close by the remote side
            Err(Error::AlreadyConnected) => {
                self.connected = true;
                Ok(())
            }
            result => result,
        }
    }
}

impl<'buf, C: ByteChannel, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> TcpClientStack
    for Adapter<'buf, C, T, R, TIMER_HZ>
{
    type TcpSocket = Socket;
    type Error = Error;

    /// Returns the single socket. If it's already in use [Error::NoSocketAvailable] is returned.
    fn socket(&mut self) -> Result<Self::TcpSocket, Self::Error> {
        if self.socket_open {
            return Err(Error::NoSocketAvailable);
        }

        self.socket_open = true;
        Ok(Socket::new())
    }

    /// Opens a new TCP connection. Both IPv4 and IPv6 are supported.
    fn connect(&mut self, _socket: &mut Socket, remote: SocketAddr) -> nb::Result<(), Self::Error> {
        self.connect_address(remote)?;
        Ok(())
    }

    /// Sends the given buffer in chunks of max. 2048 bytes and returns the length sent
    fn send(&mut self, _socket: &mut Socket, buffer: &[u8]) -> nb::Result<usize, Self::Error> {
        if !self.connected {
            return Err(nb::Error::Other(Error::SocketUnconnected));
        }

        for chunk in buffer.chunks(MAX_SEND_LENGTH) {
            self.tcp_send(chunk)?;
        }

        Ok(buffer.len())
    }

    /// Processes pending input and returns the length of data received in the given buffer.
    /// Returns [nb::Error::WouldBlock] if no data was received.
    fn receive(
        &mut self,
        _socket: &mut Socket,
        buffer: &mut [u8],
    ) -> nb::Result<usize, Self::Error> {
        match self.tcp_receive(buffer, 0) {
            0 => Err(nb::Error::WouldBlock),
            length => Ok(length),
        }
    }

    /// Closes the socket. In case of an error the socket is released anyway, so it can be reused.
    fn close(&mut self, _socket: Socket) -> Result<(), Self::Error> {
        self.socket_open = false;

        if !self.connected {
            return Ok(());
        }

        self.tcp_close()
    }
}
