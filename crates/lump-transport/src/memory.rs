use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Writes kept by a [`MemoryHandle`]; older ones are dropped first.
pub const MAX_WRITTEN_CHUNKS: usize = 4096;

/// Bytes written by the host, tagged with the baud rate in force at the time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenChunk {
    pub baud: u32,
    pub bytes: Bytes,
}

#[derive(Debug)]
struct State {
    inbound: VecDeque<u8>,
    written: VecDeque<WrittenChunk>,
    baud: u32,
    baud_history: Vec<u32>,
    closed: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    readable: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process transport backed by a shared byte queue.
///
/// The transport side is handed to a session; the paired [`MemoryHandle`]
/// plays the device: it injects inbound bytes, inspects what the host wrote,
/// and can close the line to unblock a pending read.
#[derive(Debug)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
}

/// Device-side handle to a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    shared: Arc<Shared>,
}

impl MemoryTransport {
    /// Create a transport starting at `baud`, plus its device-side handle.
    pub fn new(baud: u32) -> (Self, MemoryHandle) {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                inbound: VecDeque::new(),
                written: VecDeque::new(),
                baud,
                baud_history: vec![baud],
                closed: false,
            }),
            readable: Condvar::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MemoryHandle { shared },
        )
    }
}

impl Transport for MemoryTransport {
    fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Bytes> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();

        loop {
            if !state.inbound.is_empty() {
                let n = max_bytes.min(state.inbound.len());
                let chunk: Vec<u8> = state.inbound.drain(..n).collect();
                return Ok(Bytes::from(chunk));
            }
            if state.closed {
                return Err(TransportError::Closed);
            }

            let now = Instant::now();
            if now >= deadline || max_bytes == 0 {
                return Ok(Bytes::new());
            }

            let (guard, _) = self
                .shared
                .readable
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.shared.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        let baud = state.baud;
        if state.written.len() == MAX_WRITTEN_CHUNKS {
            state.written.pop_front();
        }
        state.written.push_back(WrittenChunk {
            baud,
            bytes: Bytes::copy_from_slice(bytes),
        });
        Ok(())
    }

    fn baud_rate(&self) -> u32 {
        self.shared.lock().baud
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<()> {
        if baud == 0 {
            return Err(TransportError::UnsupportedBaudRate(baud));
        }
        let mut state = self.shared.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        if state.baud != baud {
            debug!(from = state.baud, to = baud, "memory transport baud change");
            state.baud = baud;
            state.baud_history.push(baud);
        }
        Ok(())
    }
}

impl MemoryHandle {
    /// Queue bytes for the host to read.
    pub fn push(&self, bytes: &[u8]) {
        let mut state = self.shared.lock();
        state.inbound.extend(bytes.iter().copied());
        self.shared.readable.notify_all();
    }

    /// The most recent writes by the host, oldest first. At most
    /// [`MAX_WRITTEN_CHUNKS`] are kept; use [`take_written`](Self::take_written)
    /// to drain them between checks.
    pub fn written(&self) -> Vec<WrittenChunk> {
        self.shared.lock().written.iter().cloned().collect()
    }

    /// All written bytes concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.shared
            .lock()
            .written
            .iter()
            .flat_map(|chunk| chunk.bytes.iter().copied())
            .collect()
    }

    /// Drain and return the recorded writes.
    pub fn take_written(&self) -> Vec<WrittenChunk> {
        self.shared.lock().written.drain(..).collect()
    }

    /// Baud rates applied so far, starting with the initial one.
    pub fn baud_history(&self) -> Vec<u32> {
        self.shared.lock().baud_history.clone()
    }

    /// Close the line. Pending and future host reads fail once drained.
    pub fn close(&self) {
        let mut state = self.shared.lock();
        state.closed = true;
        self.shared.readable.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_returns_queued_bytes() {
        let (mut transport, handle) = MemoryTransport::new(2400);
        handle.push(&[0x40, 0x22, 0x9D]);

        let first = transport.read(1, Duration::from_millis(10)).unwrap();
        assert_eq!(first.as_ref(), &[0x40]);

        let rest = transport.read(8, Duration::from_millis(10)).unwrap();
        assert_eq!(rest.as_ref(), &[0x22, 0x9D]);
    }

    #[test]
    fn test_read_times_out_empty() {
        let (mut transport, _handle) = MemoryTransport::new(2400);
        let started = Instant::now();
        let bytes = transport.read(1, Duration::from_millis(20)).unwrap();
        assert!(bytes.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_read_wakes_on_push_from_other_thread() {
        let (mut transport, handle) = MemoryTransport::new(2400);
        let device = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            handle.push(&[0x04]);
        });

        let bytes = transport.read(1, Duration::from_secs(2)).unwrap();
        assert_eq!(bytes.as_ref(), &[0x04]);
        device.join().unwrap();
    }

    #[test]
    fn test_close_unblocks_read() {
        let (mut transport, handle) = MemoryTransport::new(2400);
        let closer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            handle.close();
        });

        let err = transport.read(1, Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
        closer.join().unwrap();
    }

    #[test]
    fn test_close_drains_pending_bytes_first() {
        let (mut transport, handle) = MemoryTransport::new(2400);
        handle.push(&[0x02]);
        handle.close();

        assert_eq!(
            transport.read(4, Duration::from_millis(1)).unwrap().as_ref(),
            &[0x02]
        );
        assert!(matches!(
            transport.read(4, Duration::from_millis(1)),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn test_writes_record_baud() {
        let (mut transport, handle) = MemoryTransport::new(2400);
        transport.write(&[0x04]).unwrap();
        transport.set_baud_rate(115_200).unwrap();
        transport.write(&[0x02]).unwrap();

        let written = handle.written();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].baud, 2400);
        assert_eq!(written[1].baud, 115_200);
        assert_eq!(handle.written_bytes(), vec![0x04, 0x02]);
        assert_eq!(handle.baud_history(), vec![2400, 115_200]);
        assert_eq!(transport.baud_rate(), 115_200);
    }

    #[test]
    fn test_written_record_is_bounded() {
        let (mut transport, handle) = MemoryTransport::new(115_200);
        for i in 0..MAX_WRITTEN_CHUNKS + 10 {
            transport.write(&[(i % 256) as u8]).unwrap();
        }

        let written = handle.written();
        assert_eq!(written.len(), MAX_WRITTEN_CHUNKS);
        assert_eq!(written[0].bytes.as_ref(), &[10]);
        assert_eq!(
            written.last().map(|chunk| chunk.bytes.clone()),
            Some(Bytes::copy_from_slice(&[((MAX_WRITTEN_CHUNKS + 9) % 256) as u8]))
        );

        assert_eq!(handle.take_written().len(), MAX_WRITTEN_CHUNKS);
        assert!(handle.written().is_empty());
        transport.write(&[0x02]).unwrap();
        assert_eq!(handle.written_bytes(), vec![0x02]);
    }

    #[test]
    fn test_zero_baud_rejected() {
        let (mut transport, _handle) = MemoryTransport::new(2400);
        let err = transport.set_baud_rate(0).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedBaudRate(0)));
    }

    #[test]
    fn test_write_after_close_fails() {
        let (mut transport, handle) = MemoryTransport::new(2400);
        handle.close();
        assert!(matches!(
            transport.write(&[0x02]),
            Err(TransportError::Closed)
        ));
        assert!(handle.is_closed());
    }
}
