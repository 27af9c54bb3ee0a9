use crate::needle::{Needle, ALREADY_CONNECTED, CHANGE, CONNECT, ERROR, FAIL, OK, READY};
use crate::responses::NoResponse;
use crate::wifi::Error;
use atat::atat_derive::AtatCmd;
use atat::heapless::String;

/// Trait for mapping the terminal needle matched after sending a command
pub trait CommandOutcome {
    /// Terminal needles of the command response. Match index gets passed to `outcome()`
    const NEEDLES: &'static [Needle];

    /// Maps the index of the matched needle
    fn outcome(index: usize) -> Result<(), Error> {
        match index {
            0 => Ok(()),
            1 => Err(Error::ProtocolFailure),
            _ => Err(Error::Unknown(index)),
        }
    }
}

/// Restarts the module. Timeout covers the complete boot until `ready` is signaled.
#[derive(Clone, AtatCmd)]
#[at_cmd("+RST", NoResponse, timeout_ms = 3_000)]
pub struct RestartCommand;

impl CommandOutcome for RestartCommand {
    const NEEDLES: &'static [Needle] = &[READY];
}

/// Disables the command echo
#[derive(Clone, AtatCmd)]
#[at_cmd("E0", NoResponse, timeout_ms = 200)]
pub struct EchoOffCommand;

impl CommandOutcome for EchoOffCommand {
    const NEEDLES: &'static [Needle] = &[OK];
}

/// Enables/Disables multiple connections
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPMUX", NoResponse, timeout_ms = 200)]
pub struct SetMultipleConnectionsCommand {
    /// 0: single connection, 1: multiple connections
    mode: usize,
}

impl SetMultipleConnectionsCommand {
    /// Disables multiple connections
    pub fn single() -> Self {
        Self { mode: 0 }
    }
}

impl CommandOutcome for SetMultipleConnectionsCommand {
    const NEEDLES: &'static [Needle] = &[OK, CHANGE];

    /// `no change` is returned if the mode is already set
    fn outcome(index: usize) -> Result<(), Error> {
        match index {
            0 | 1 => Ok(()),
            _ => Err(Error::Unknown(index)),
        }
    }
}

/// Command for connecting to a WIFI access point
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWJAP", NoResponse, timeout_ms = 20_000)]
pub struct AccessPointConnectCommand {
    /// The SSID of the target access point
    #[at_arg(position = 0)]
    ssid: String<32>,

    /// The password/key of the target access point
    #[at_arg(position = 1)]
    password: String<64>,
}

impl AccessPointConnectCommand {
    pub fn new(ssid: &str, password: &str) -> Result<Self, Error> {
        let mut command = Self {
            ssid: String::new(),
            password: String::new(),
        };

        command.ssid.push_str(ssid).map_err(|_| Error::InvalidSsidLength)?;
        command
            .password
            .push_str(password)
            .map_err(|_| Error::InvalidPasswordLength)?;

        Ok(command)
    }
}

impl CommandOutcome for AccessPointConnectCommand {
    const NEEDLES: &'static [Needle] = &[OK, FAIL];
}

/// Disconnects from the current access point
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWQAP", NoResponse, timeout_ms = 2_000)]
pub struct AccessPointDisconnectCommand;

impl CommandOutcome for AccessPointDisconnectCommand {
    const NEEDLES: &'static [Needle] = &[OK, ERROR];
}

/// Establishes a TCP connection
///
/// Gets confirmed in two steps. First `CONNECT` (or `OK`), followed by `OK` once the connection
/// is fully established.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse, timeout_ms = 20_000)]
pub struct ConnectCommand {
    /// Connection type, TCP or TCPv6
    connection_type: String<5>,

    /// Remote host name, IPv4 or IPv6 address
    remote_host: String<64>,

    /// Remote port
    port: u16,
}

impl ConnectCommand {
    /// Connects to the given host via TCP
    pub fn tcp(remote_host: &str, port: u16) -> Result<Self, Error> {
        Self::new("TCP", remote_host, port)
    }

    /// Connects to the given IPv6 address via TCP
    pub fn tcp_v6(remote_host: &str, port: u16) -> Result<Self, Error> {
        Self::new("TCPv6", remote_host, port)
    }

    fn new(connection_type: &str, remote_host: &str, port: u16) -> Result<Self, Error> {
        let mut command = Self {
            connection_type: String::new(),
            remote_host: String::new(),
            port,
        };

        command
            .connection_type
            .push_str(connection_type)
            .map_err(|_| Error::InvalidHostLength)?;
        command
            .remote_host
            .push_str(remote_host)
            .map_err(|_| Error::InvalidHostLength)?;

        Ok(command)
    }
}

impl CommandOutcome for ConnectCommand {
    const NEEDLES: &'static [Needle] = &[OK, ERROR, ALREADY_CONNECTED, CONNECT];

    fn outcome(index: usize) -> Result<(), Error> {
        match index {
            0 | 3 => Ok(()),
            1 => Err(Error::ProtocolFailure),
            2 => Err(Error::AlreadyConnected),
            _ => Err(Error::Unknown(index)),
        }
    }
}

/// Closes the TCP connection
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse, timeout_ms = 5_000)]
pub struct CloseSocketCommand;

impl CommandOutcome for CloseSocketCommand {
    const NEEDLES: &'static [Needle] = &[OK, ERROR];
}

/// Initiates the transmission of the given byte count. Gets responded by a `>` prompt.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse, timeout_ms = 5_000)]
pub struct TransmissionPrepareCommand {
    length: usize,
}

impl TransmissionPrepareCommand {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

/// Queries the AT and SDK version information
#[derive(Clone, AtatCmd)]
#[at_cmd("+GMR", NoResponse, timeout_ms = 500)]
pub struct VersionCommand;

impl CommandOutcome for VersionCommand {
    const NEEDLES: &'static [Needle] = &[OK];
}

/// Queries the local IP and MAC addresses
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIFSR", NoResponse, timeout_ms = 500)]
pub struct ObtainLocalAddressCommand;

impl CommandOutcome for ObtainLocalAddressCommand {
    const NEEDLES: &'static [Needle] = &[OK];
}
