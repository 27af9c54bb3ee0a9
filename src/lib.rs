//! # Blocking ESP8266 AT driver
//!
//! Turns a byte oriented serial link to an ESP8266 module into blocking network primitives:
//! joining/leaving a WIFI network and a single TCP connection.
//!
//! Responses are never buffered. The driver keeps a 4 byte rolling register over the received
//! stream and compares it against a small set of terminal sequences (s. [needle]). Inbound
//! `+IPD` data frames are intercepted at any point of the stream, even while waiting for the
//! response of an unrelated command, and copied into a caller supplied buffer (s. [buffer]).
//!
//! The central client is [wifi::Adapter].
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

// Needs to be declared first, so that the logging macros are available in all modules
mod fmt;

pub mod buffer;
pub mod channel;
pub(crate) mod commands;
pub mod frame;
pub mod needle;
pub(crate) mod responses;
pub mod session;
pub mod stack;
pub mod wifi;

#[cfg(test)]
mod tests;
