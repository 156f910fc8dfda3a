use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use lump_frame::{
    decode_frame, ChecksumFault, CmdMessage, Header, Message, ReceivedFrame, SysCommand,
};
use lump_transport::{Transport, TransportError};
use tracing::{debug, info, trace, warn};

use crate::capabilities::DeviceCapabilities;
use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::handshake::await_capabilities;
use crate::query::Query;

/// Connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Disconnected,
    Handshaking,
    Active,
}

/// Mutable protocol state of a session. Timestamps come from the session clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: Phase,
    pub last_keepalive: Option<Duration>,
    pub last_query: Option<Duration>,
    /// Set while the second frame of an extended-mode pair is outstanding.
    pub multipart_pending: bool,
    pub active_baud: Option<u32>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Disconnected,
            last_keepalive: None,
            last_query: None,
            multipart_pending: false,
            active_baud: None,
        }
    }
}

/// A frame handed to the caller by [`Session::poll`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub frame: ReceivedFrame,
    /// Offset announced by a preceding CMD EXT_MODE frame (0 or 8).
    pub extended_mode: u8,
}

impl Delivery {
    pub fn header(&self) -> Header {
        self.frame.header
    }

    pub fn payload(&self) -> &Bytes {
        &self.frame.payload
    }

    pub fn message(&self) -> &Message {
        &self.frame.message
    }

    pub fn checksum_fault(&self) -> Option<ChecksumFault> {
        self.frame.checksum_fault
    }

    /// Logical mode: for DATA frames the header mode plus the extended-mode
    /// offset, for INFO frames the decoded mode.
    pub fn mode(&self) -> u8 {
        match &self.frame.message {
            Message::Data { mode, .. } => mode.saturating_add(self.extended_mode),
            Message::Info { mode, .. } => *mode,
            _ => self.frame.header.mode,
        }
    }
}

/// Host side of one LUMP connection.
///
/// The session owns its transport exclusively. All timing is measured on
/// `C`, so tests can drive it with a [`ManualClock`](crate::ManualClock).
pub struct Session<T, C = SystemClock> {
    transport: T,
    clock: C,
    config: SessionConfig,
    state: SessionState,
    pending: Option<Query>,
    extended_mode: u8,
    capabilities: Option<DeviceCapabilities>,
}

impl<T: Transport> Session<T> {
    /// Create a session timed by the system clock.
    pub fn new(transport: T, config: SessionConfig) -> Result<Self> {
        Self::with_clock(transport, SystemClock::new(), config)
    }
}

impl<T: Transport, C: Clock> Session<T, C> {
    /// Create a session with an explicit clock.
    pub fn with_clock(transport: T, clock: C, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            clock,
            config,
            state: SessionState::default(),
            pending: None,
            extended_mode: 0,
            capabilities: None,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Capabilities accepted by the last successful handshake.
    pub fn capabilities(&self) -> Option<&DeviceCapabilities> {
        self.capabilities.as_ref()
    }

    /// Query queued but not yet sent.
    pub fn pending_query(&self) -> Option<&Query> {
        self.pending.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run the handshake and switch to the production baud rate.
    ///
    /// Only valid while disconnected. On failure the session is left
    /// disconnected.
    pub fn start(&mut self) -> Result<DeviceCapabilities> {
        self.expect_phase(Phase::Disconnected)?;
        self.set_phase(Phase::Handshaking);

        match self.handshake() {
            Ok(capabilities) => Ok(capabilities),
            Err(err) => {
                warn!(error = %err, "handshake failed");
                self.disconnect();
                Err(err)
            }
        }
    }

    fn handshake(&mut self) -> Result<DeviceCapabilities> {
        let handshake_baud = self.config.handshake.handshake_baud;
        self.set_baud(handshake_baud)?;

        let blob = await_capabilities(&mut self.transport, &self.clock, &self.config.handshake)?;
        self.send(&[SysCommand::Ack.byte()])?;
        self.clock.sleep(self.config.handshake.settle_delay);

        let production_baud = self.config.handshake.production_baud;
        self.set_baud(production_baud)?;

        self.send(&[SysCommand::Nack.byte()])?;
        let now = self.clock.now();
        self.state.last_keepalive = Some(now);
        self.state.last_query = None;
        self.state.multipart_pending = false;
        self.extended_mode = 0;

        let capabilities = blob.capabilities();
        self.capabilities = Some(capabilities.clone());
        self.set_phase(Phase::Active);
        info!(
            type_id = ?capabilities.type_id,
            baud = production_baud,
            "device connected"
        );
        Ok(capabilities)
    }

    /// Queue the next query, replacing any query not yet sent.
    ///
    /// The query is checked for encodability here so a bad mode fails
    /// before anything reaches the line.
    pub fn submit(&mut self, query: Query) -> Result<()> {
        query.messages()?;
        if let Some(replaced) = self.pending.replace(query) {
            debug!(?replaced, "unsent query replaced");
        }
        Ok(())
    }

    /// Run one iteration of the session loop.
    ///
    /// Sends a keep-alive when due, sends the pending query when its slot is
    /// free, then reads at most one frame. Returns `Ok(None)` when the read
    /// timed out or the frame opened an extended-mode pair.
    ///
    /// A short frame or a closed transport ends the session with
    /// [`SessionError::Disconnected`], and any other transport failure ends it
    /// with the underlying [`SessionError::Transport`]. Frame decoding errors
    /// are returned without leaving the active phase.
    pub fn poll(&mut self) -> Result<Option<Delivery>> {
        self.expect_phase(Phase::Active)?;
        let result = self.poll_once();
        match &result {
            Err(SessionError::Disconnected) => {
                warn!("device disconnected");
                self.disconnect();
            }
            Err(SessionError::Transport(err)) => {
                warn!(error = %err, "transport failed, disconnecting");
                self.disconnect();
            }
            _ => {}
        }
        result
    }

    fn poll_once(&mut self) -> Result<Option<Delivery>> {
        self.keepalive_if_due()?;
        self.send_query_if_due()?;

        let timeout = self.header_timeout();
        let first = self.recv(1, timeout)?;
        let Some(&first) = first.first() else {
            return Ok(None);
        };

        let header = Header::decode(first)?;
        let mut buf = self.read_frame_rest(first, header.frame_len())?;
        debug!(rx = %hex::encode_upper(&buf), "frame received");

        let frame = decode_frame(&mut buf)?.ok_or(SessionError::Disconnected)?;
        if let Some(fault) = frame.checksum_fault {
            warn!(
                found = format_args!("0x{:02X}", fault.found),
                expected = format_args!("0x{:02X}", fault.expected),
                "checksum mismatch, delivering frame anyway"
            );
        }

        if let Message::Cmd(CmdMessage::ExtMode(offset)) = frame.message {
            trace!(offset, "extended mode announced");
            self.state.multipart_pending = true;
            self.extended_mode = offset;
            return Ok(None);
        }

        self.state.multipart_pending = false;
        let extended_mode = std::mem::take(&mut self.extended_mode);
        Ok(Some(Delivery {
            frame,
            extended_mode,
        }))
    }

    /// Drive the session to disconnected. Safe to call in any phase.
    pub fn close(&mut self) {
        if self.state.phase != Phase::Disconnected {
            self.disconnect();
        }
    }

    fn keepalive_if_due(&mut self) -> Result<()> {
        let now = self.clock.now();
        let due = self
            .state
            .last_keepalive
            .is_none_or(|last| now.saturating_sub(last) >= self.config.keepalive_interval);
        if due {
            self.send(&[SysCommand::Nack.byte()])?;
            self.state.last_keepalive = Some(now);
            trace!("keep-alive sent");
        }
        Ok(())
    }

    fn query_slot_free(&self, now: Duration) -> bool {
        !self.state.multipart_pending
            && self
                .state
                .last_query
                .is_none_or(|last| now.saturating_sub(last) >= self.config.min_query_spacing)
    }

    fn send_query_if_due(&mut self) -> Result<()> {
        let now = self.clock.now();
        if self.pending.is_none() || !self.query_slot_free(now) {
            return Ok(());
        }
        let Some(query) = self.pending.take() else {
            return Ok(());
        };

        let bytes = query.to_bytes()?;
        self.send(&bytes)?;
        self.state.last_query = Some(now);
        if query.is_multipart() {
            self.state.multipart_pending = true;
        }
        debug!(?query, "query sent");
        Ok(())
    }

    /// Read timeout for the next header: never past the next keep-alive, and
    /// never past the moment a waiting query may be sent.
    fn header_timeout(&self) -> Duration {
        let now = self.clock.now();
        let mut timeout = self.config.read_timeout;

        if let Some(last) = self.state.last_keepalive {
            let next = last + self.config.keepalive_interval;
            timeout = timeout.min(next.saturating_sub(now));
        }
        if self.pending.is_some() && !self.state.multipart_pending {
            if let Some(last) = self.state.last_query {
                let next = last + self.config.min_query_spacing;
                timeout = timeout.min(next.saturating_sub(now));
            }
        }
        timeout
    }

    fn read_frame_rest(&mut self, first: u8, total: usize) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(total);
        buf.put_u8(first);
        while buf.len() < total {
            let chunk = self.recv(total - buf.len(), self.config.read_timeout)?;
            if chunk.is_empty() {
                warn!(expected = total, received = buf.len(), "short frame");
                return Err(SessionError::Disconnected);
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    fn recv(&mut self, max_bytes: usize, timeout: Duration) -> Result<Bytes> {
        self.transport
            .read(max_bytes, timeout)
            .map_err(transport_error)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        debug!(tx = %hex::encode_upper(bytes), "sending");
        self.transport.write(bytes).map_err(transport_error)
    }

    fn set_baud(&mut self, baud: u32) -> Result<()> {
        self.transport.set_baud_rate(baud).map_err(transport_error)?;
        self.state.active_baud = Some(baud);
        debug!(baud, "baud rate set");
        Ok(())
    }

    fn expect_phase(&self, expected: Phase) -> Result<()> {
        if self.state.phase != expected {
            return Err(SessionError::InvalidPhase {
                expected,
                actual: self.state.phase,
            });
        }
        Ok(())
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.state.phase != phase {
            info!(from = ?self.state.phase, to = ?phase, "session phase change");
            self.state.phase = phase;
        }
    }

    fn disconnect(&mut self) {
        self.set_phase(Phase::Disconnected);
        self.state.multipart_pending = false;
        self.state.last_keepalive = None;
        self.state.last_query = None;
        self.pending = None;
        self.extended_mode = 0;
    }
}

fn transport_error(err: TransportError) -> SessionError {
    match err {
        TransportError::Closed => SessionError::Disconnected,
        other => SessionError::Transport(other),
    }
}
