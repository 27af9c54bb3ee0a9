//! # Packet buffer
//!
//! Inbound frame data gets copied into memory lent by the caller. The buffer is registered via
//! [put_packet_buffer](crate::wifi::Adapter::put_packet_buffer) and handed back by
//! [take_packet_buffer](crate::wifi::Adapter::take_packet_buffer). In between the adapter fills
//! it during any wait, even while an unrelated command is in progress.

/// Optionally present borrowed buffer and its fill count
///
/// Invariant: `len() <= capacity()`. If no buffer is present, all pushed bytes get discarded.
#[derive(Debug, Default)]
pub struct PacketBuffer<'a> {
    data: Option<&'a mut [u8]>,

    /// Count of bytes written to the start of `data`
    filled: usize,
}

impl<'a> PacketBuffer<'a> {
    /// Creates an empty buffer backed by the given memory
    pub fn new(data: &'a mut [u8]) -> Self {
        Self {
            data: Some(data),
            filled: 0,
        }
    }

    /// Creates a buffer without backing memory, which discards every byte
    pub fn none() -> Self {
        Self { data: None, filled: 0 }
    }

    /// Replaces the backing memory. Fill state of the previous buffer is discarded.
    pub fn put(&mut self, data: &'a mut [u8]) {
        self.data = Some(data);
        self.filled = 0;
    }

    /// Hands back the backing memory together with its fill count.
    /// Afterwards no memory is referenced anymore and the fill count is reset to zero.
    pub fn take(&mut self) -> Option<Packet<'a>> {
        let filled = core::mem::take(&mut self.filled);
        self.data.take().map(|data| Packet::new(data, filled))
    }

    /// Appends a single byte. Returns false if the byte was discarded, as no memory is present
    /// or the buffer is already full.
    pub fn push(&mut self, byte: u8) -> bool {
        if let Some(data) = self.data.as_deref_mut() {
            if let Some(slot) = data.get_mut(self.filled) {
                *slot = byte;
                self.filled += 1;
                return true;
            }
        }

        false
    }

    /// Moves filled bytes from the start into `target` and returns the count moved. Bytes not
    /// fitting into `target` are kept and shifted to the start.
    pub fn read_into(&mut self, target: &mut [u8]) -> usize {
        let data = match self.data.as_deref_mut() {
            Some(data) => data,
            None => return 0,
        };

        let length = self.filled.min(target.len());
        target[..length].copy_from_slice(&data[..length]);
        data.copy_within(length..self.filled, 0);
        self.filled -= length;

        length
    }

    /// Returns true if backing memory is present
    pub fn is_present(&self) -> bool {
        self.data.is_some()
    }

    /// Returns the count of filled bytes
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Returns true if no byte has been filled in yet
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Returns the size of the backing memory, zero if no memory is present
    pub fn capacity(&self) -> usize {
        self.data.as_deref().map_or(0, |data| data.len())
    }

    /// Returns true if no further byte can be stored
    pub fn is_full(&self) -> bool {
        self.filled >= self.capacity()
    }

    /// Returns the filled part
    pub fn as_slice(&self) -> &[u8] {
        match self.data.as_deref() {
            Some(data) => &data[..self.filled],
            None => &[],
        }
    }
}

/// Buffer memory handed back by the adapter
#[derive(Debug)]
pub struct Packet<'a> {
    data: &'a mut [u8],

    /// Count of bytes received at the start of `data`
    len: usize,
}

impl<'a> Packet<'a> {
    pub(crate) fn new(data: &'a mut [u8], len: usize) -> Self {
        Self { data, len }
    }

    /// Returns the received bytes
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Returns the count of received bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no bytes were received
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the complete memory, e.g. for registering it again
    pub fn into_inner(self) -> &'a mut [u8] {
        self.data
    }
}
