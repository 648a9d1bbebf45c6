//! TCP transport for a single framed [`Message`] stream.
//!
//! Each of the three logical channels (control, video, audio) is an
//! independent TCP connection carrying [`Message`] frames. A [`Transport`]
//! owns one such connection: a write half behind a mutex so concurrent
//! senders serialize onto the wire in FIFO order, and a read half driving an
//! incremental [`FrameDecoder`]. There is no reconnection logic here — a
//! closed socket surfaces as [`TransportError::Closed`] and the session
//! orchestrator decides whether to tear the whole session down.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::protocol::codec::{encode_message, FrameDecoder, FramingError};
use crate::protocol::messages::Message;

/// Minimum size of the chunk read from the socket per recv syscall.
pub const READ_CHUNK_LEN: usize = 64 * 1024;

/// Requested OS socket buffer size for both directions.
pub const SOCKET_BUFFER_LEN: usize = 256 * 1024;

/// Errors from connecting, accepting, sending, or receiving on a [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(std::io::Error),

    #[error("write failed: {0}")]
    Write(std::io::Error),

    #[error("read failed: {0}")]
    Read(std::io::Error),

    #[error("connection closed by peer")]
    Closed,

    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
}

/// A connection lifecycle event a [`Transport`]'s reader observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
}

/// Resettable byte/frame counters, grounded in the same "one atomic counter
/// per metric, `Ordering::Relaxed` throughout" discipline used for sequence
/// numbering elsewhere in the protocol stack.
#[derive(Debug, Default)]
pub struct TransportStats {
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
}

impl TransportStats {
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Resets every counter back to zero.
    pub fn reset(&self) {
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
        self.frames_sent.store(0, Ordering::Relaxed);
        self.frames_received.store(0, Ordering::Relaxed);
    }
}

/// The sending half of a connection: serializes concurrent `send` calls
/// onto the wire through an internal mutex so frames never interleave.
pub struct Transport {
    write_half: Mutex<OwnedWriteHalf>,
    stats: Arc<TransportStats>,
    peer_addr: SocketAddr,
}

impl Transport {
    /// Connects to `addr`, applying the shared socket tuning, and splits the
    /// stream into a [`Transport`] (send) and [`MessageReader`] (receive).
    pub async fn connect(addr: SocketAddr) -> Result<(Transport, MessageReader), TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| TransportError::Connect { addr, source })?;
        Ok(Self::from_stream(stream, addr))
    }

    /// Connects to `addr`, retrying up to `attempts` times with a linear
    /// backoff (`attempt_index * delay`) between tries.
    pub async fn connect_with_retry(
        addr: SocketAddr,
        attempts: u32,
        delay: Duration,
    ) -> Result<(Transport, MessageReader), TransportError> {
        let mut last_err = None;
        for attempt in 0..attempts.max(1) {
            if attempt > 0 {
                tokio::time::sleep(delay * attempt).await;
            }
            match Self::connect(addr).await {
                Ok(pair) => return Ok(pair),
                Err(e) => {
                    warn!("connect attempt {attempt} to {addr} failed: {e}");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.expect("attempts.max(1) guarantees at least one iteration"))
    }

    fn from_stream(stream: TcpStream, peer_addr: SocketAddr) -> (Transport, MessageReader) {
        tune_socket(&stream);
        let (read_half, write_half) = stream.into_split();
        let stats = Arc::new(TransportStats::default());
        let transport = Transport {
            write_half: Mutex::new(write_half),
            stats: stats.clone(),
            peer_addr,
        };
        let reader = MessageReader {
            read_half,
            decoder: FrameDecoder::new(),
            read_buf: vec![0u8; READ_CHUNK_LEN],
            stats,
            peer_addr,
        };
        (transport, reader)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Encodes `message` and writes it to the socket in a single write call.
    ///
    /// Concurrent callers serialize through an internal mutex, so two tasks
    /// sending at once never interleave each other's bytes on the wire.
    pub async fn send(&self, message: &Message) -> Result<(), TransportError> {
        let bytes = encode_message(message);
        let len = bytes.len();
        let mut write_half = self.write_half.lock().await;
        write_half.write_all(&bytes).await.map_err(TransportError::Write)?;
        self.stats.bytes_sent.fetch_add(len as u64, Ordering::Relaxed);
        self.stats.frames_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A bound listener accepting inbound connections for one channel.
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Binds `addr`.
    pub async fn bind(addr: SocketAddr) -> Result<Listener, TransportError> {
        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        Ok(Listener { inner })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.inner.local_addr().map_err(TransportError::Accept)
    }

    /// Accepts the next inbound connection.
    pub async fn accept(&self) -> Result<(Transport, MessageReader), TransportError> {
        let (stream, peer_addr) = self.inner.accept().await.map_err(TransportError::Accept)?;
        Ok(Transport::from_stream(stream, peer_addr))
    }
}

/// The receiving half of a connection: drives a [`FrameDecoder`] off raw
/// socket reads and yields fully decoded [`Message`]s one at a time.
///
/// Not a `futures::Stream` — the call sites (`tokio::select!` loops in the
/// session orchestrator and each channel's worker task) just `.await` this
/// directly, and adding a `Stream` impl would pull in a dependency this
/// crate otherwise has no use for.
pub struct MessageReader {
    read_half: OwnedReadHalf,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
    stats: Arc<TransportStats>,
    peer_addr: SocketAddr,
}

impl MessageReader {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns the next decoded message, reading more socket data as needed.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] if the peer closed the connection
    /// (a zero-length read) with no complete frame pending, and
    /// [`TransportError::Framing`] for a genuine protocol violation
    /// (oversized payload or unknown message type) rather than a merely
    /// incomplete frame.
    pub async fn recv(&mut self) -> Result<Message, TransportError> {
        loop {
            if let Some(message) = self.decoder.try_decode_one()? {
                self.stats.frames_received.fetch_add(1, Ordering::Relaxed);
                return Ok(message);
            }

            let n = self
                .read_half
                .read(&mut self.read_buf)
                .await
                .map_err(TransportError::Read)?;
            if n == 0 {
                return Err(TransportError::Closed);
            }
            self.stats.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
            self.decoder.feed(&self.read_buf[..n]);
        }
    }
}

/// Applies `TCP_NODELAY`, keepalive, and buffer-size tuning to a freshly
/// connected or accepted socket.
///
/// Tuning failures are logged, not propagated — a socket that can't honor a
/// buffer-size hint still works, just with worse throughput under load.
fn tune_socket(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("failed to disable Nagle's algorithm: {e}");
    }

    let sock_ref = SockRef::from(stream);
    let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(30));
    if let Err(e) = sock_ref.set_tcp_keepalive(&keepalive) {
        warn!("failed to enable TCP keepalive: {e}");
    }
    if let Err(e) = sock_ref.set_recv_buffer_size(SOCKET_BUFFER_LEN) {
        debug!("failed to set receive buffer size: {e}");
    }
    if let Err(e) = sock_ref.set_send_buffer_size(SOCKET_BUFFER_LEN) {
        debug!("failed to set send buffer size: {e}");
    }
}
