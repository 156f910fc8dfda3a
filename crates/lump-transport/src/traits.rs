use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// A duplex byte channel to a LUMP device.
///
/// Implementations wrap a serial port (or a simulation of one). Reads are
/// bounded: a read that times out returns an empty buffer instead of an
/// error, so callers can interleave keep-alive traffic.
pub trait Transport {
    /// Read up to `max_bytes`, waiting at most `timeout` for the first byte.
    ///
    /// Returns fewer bytes than requested (possibly none) when the timeout
    /// expires. Fails with [`TransportError::Closed`](crate::TransportError::Closed)
    /// once the transport is closed and drained.
    fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Bytes>;

    /// Write all of `bytes` to the device.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Baud rate currently in force.
    fn baud_rate(&self) -> u32;

    /// Switch the line to a new baud rate.
    fn set_baud_rate(&mut self, baud: u32) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Bytes> {
        (**self).read(max_bytes, timeout)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn baud_rate(&self) -> u32 {
        (**self).baud_rate()
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<()> {
        (**self).set_baud_rate(baud)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Bytes> {
        (**self).read(max_bytes, timeout)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn baud_rate(&self) -> u32 {
        (**self).baud_rate()
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<()> {
        (**self).set_baud_rate(baud)
    }
}
