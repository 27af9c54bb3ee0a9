//! # Rolling response matching
//!
//! ESP-AT responses are recognized by their last four bytes only. Every received byte is shifted
//! into a 32 bit register ([RollingState]), which is compared against the needles of the current
//! exchange. No response text is stored.
//!
//! Every needle of an active set has to be uniquely identified by its trailing four bytes, e.g.
//! `OK\r\n` and `OR\r\n` (end of `ERROR\r\n`).
//!
//! ````
//! use esp_at_link::needle::{RollingState, ERROR, OK};
//!
//! let mut state = RollingState::default();
//! for byte in b"\r\nERROR\r\n" {
//!     state.push(*byte);
//! }
//!
//! assert_eq!(Some(1), state.find(&[OK, ERROR]));
//! ````

/// Last four bytes of a terminal token, big endian encoded
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Needle(u32);

impl Needle {
    /// Creates a needle of the given trailing four bytes
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(u32::from_be_bytes(*bytes))
    }

    /// Returns the encoded register value
    pub const fn value(&self) -> u32 {
        self.0
    }
}

/// Start of an inbound data frame: `+IPD`
pub const IPD: Needle = Needle::new(b"+IPD");

/// End of the `ready` banner after restart
pub const READY: Needle = Needle::new(b"dy\r\n");

/// End of `OK`
pub const OK: Needle = Needle::new(b"OK\r\n");

/// End of `no change`. Trailing line feed is not required.
pub const CHANGE: Needle = Needle::new(b"nge\r");

/// End of `FAIL`
pub const FAIL: Needle = Needle::new(b"IL\r\n");

/// End of `ERROR`
pub const ERROR: Needle = Needle::new(b"OR\r\n");

/// End of `CONNECT`
pub const CONNECT: Needle = Needle::new(b"CT\r\n");

/// End of `ALREADY CONNECTED`
pub const ALREADY_CONNECTED: Needle = Needle::new(b"ED\r\n");

/// Sliding window over the last four received bytes
///
/// The window is meaningful after four bytes have been pushed since the last reset. Matches
/// during the first three bytes are possible but require a needle with leading zero bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RollingState(u32);

impl RollingState {
    /// Shifts the given byte in, the oldest byte is dropped
    pub fn push(&mut self, byte: u8) {
        self.0 = self.0 << 8 | byte as u32;
    }

    /// Clears the window
    pub fn reset(&mut self) {
        self.0 = 0;
    }

    /// Returns true if the window equals the given needle
    pub fn matches(&self, needle: Needle) -> bool {
        self.0 == needle.0
    }

    /// Returns the index of the first needle equal to the window
    pub fn find(&self, needles: &[Needle]) -> Option<usize> {
        needles.iter().position(|needle| self.matches(*needle))
    }

    /// Returns the raw register value
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Returns true if no needle is contained twice in the given set
pub fn are_distinct(needles: &[Needle]) -> bool {
    needles
        .iter()
        .enumerate()
        .all(|(index, needle)| !needles[index + 1..].contains(needle))
}
