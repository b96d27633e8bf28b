//! Line-framed stream adapter for SCPI over raw TCP.
//!
//! Framing contract:
//! - every command is written followed by a single `\n`
//! - the reply is read up to and including the first `\n`
//! - the instrument ends every reply with a two-byte end-of-line, so the last
//!   [`REPLY_TERMINATOR_WIDTH`] bytes of the frame are dropped
//!
//! ## Example Usage
//! ```no_run
//! use dp832_daq::adapters::{Adapter, LineAdapterBuilder};
//! use std::time::Duration;
//!
//! # async fn example() -> dp832_daq::error::AppResult<()> {
//! let mut adapter = LineAdapterBuilder::new("192.168.0.200:5555")
//!     .with_read_timeout(Some(Duration::from_secs(2)))
//!     .connect()
//!     .await?;
//!
//! let idn = adapter.exchange("*IDN?").await?;
//! println!("Instrument: {}", idn);
//! # Ok(())
//! # }
//! ```

use crate::adapters::Adapter;
use crate::error::{AppResult, DaqError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

/// Appended to every outgoing command.
pub const WRITE_TERMINATOR: u8 = b'\n';

/// Byte the reader scans for to find the end of a reply.
pub const READ_DELIMITER: u8 = b'\n';

/// Number of bytes stripped from the end of every reply frame (`\r\n`).
pub const REPLY_TERMINATOR_WIDTH: usize = 2;

/// Adapter over a plain TCP socket.
pub type TcpLineAdapter = LineAdapter<TcpStream>;

/// Builder for a TCP-backed [`LineAdapter`].
pub struct LineAdapterBuilder {
    address: String,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl LineAdapterBuilder {
    /// Create a new builder for `host:port`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout: None,
            read_timeout: None,
        }
    }

    /// Deadline for establishing the TCP connection (`None` = OS default).
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Deadline for each reply (`None` = block until the reply arrives).
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Dial the instrument.
    ///
    /// # Errors
    /// Returns `DaqError::Connect` on any dial failure, including an elapsed
    /// connect deadline.
    pub async fn connect(self) -> AppResult<TcpLineAdapter> {
        let dial = TcpStream::connect(self.address.as_str());
        let result = match self.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, dial).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect timed out after {:?}", limit),
                )),
            },
            None => dial.await,
        };

        let stream = result.map_err(|source| DaqError::Connect {
            address: self.address.clone(),
            source,
        })?;

        info!(address = %self.address, "Connected to instrument");
        Ok(LineAdapter::new(stream)
            .with_read_timeout(self.read_timeout)
            .with_peer(self.address))
    }
}

/// Line-framed command/response adapter over any byte stream.
///
/// The buffered reader lives as long as the adapter, so bytes that arrive
/// after a terminator are kept for the next exchange.
pub struct LineAdapter<S> {
    stream: BufReader<S>,
    read_timeout: Option<Duration>,
    peer: String,
}

impl<S> LineAdapter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-open stream. No read deadline is applied.
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            read_timeout: None,
            peer: "stream".to_string(),
        }
    }

    /// Set the per-reply read deadline.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    fn with_peer(mut self, peer: String) -> Self {
        self.peer = peer;
        self
    }

    /// Current read deadline.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    async fn read_frame(&mut self) -> AppResult<Vec<u8>> {
        let mut frame = Vec::new();
        let read = self.stream.read_until(READ_DELIMITER, &mut frame);

        let bytes_read = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| DaqError::Timeout(limit))??,
            None => read.await?,
        };

        if bytes_read == 0 || frame.last() != Some(&READ_DELIMITER) {
            return Err(DaqError::ConnectionClosed);
        }
        Ok(frame)
    }
}

#[async_trait]
impl<S> Adapter for LineAdapter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn exchange(&mut self, command: &str) -> AppResult<String> {
        let mut line = Vec::with_capacity(command.len() + 1);
        line.extend_from_slice(command.as_bytes());
        line.push(WRITE_TERMINATOR);

        self.stream.write_all(&line).await?;
        self.stream.flush().await?;
        debug!(peer = %self.peer, command, "Sent command");

        let frame = self.read_frame().await?;
        let payload = strip_terminator(&frame)?;
        debug!(peer = %self.peer, reply = %payload, "Received reply");
        Ok(payload)
    }
}

/// Remove the two-byte reply terminator from a frame ending in `\n`.
///
/// The width is fixed: a frame ending in a bare `\n` loses its last payload
/// byte. That case is logged, not corrected.
///
/// # Errors
/// `DaqError::MalformedFrame` if the frame is shorter than the terminator.
pub fn strip_terminator(frame: &[u8]) -> AppResult<String> {
    if frame.len() < REPLY_TERMINATOR_WIDTH {
        return Err(DaqError::MalformedFrame(format!(
            "{} byte frame is shorter than the {} byte terminator",
            frame.len(),
            REPLY_TERMINATOR_WIDTH
        )));
    }

    let split = frame.len() - REPLY_TERMINATOR_WIDTH;
    if frame[split] != b'\r' {
        warn!(
            terminator = ?String::from_utf8_lossy(&frame[split..]),
            "Reply not terminated by CRLF; last payload byte dropped"
        );
    }

    Ok(String::from_utf8_lossy(&frame[..split]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_terminator_width_is_crlf() {
        assert_eq!(REPLY_TERMINATOR_WIDTH, b"\r\n".len());
        assert_eq!(WRITE_TERMINATOR, b'\n');
    }

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator(b"OK\r\n").unwrap(), "OK");
        assert_eq!(strip_terminator(b"\r\n").unwrap(), "");
    }

    #[test]
    fn test_strip_terminator_drops_two_bytes_even_for_bare_lf() {
        assert_eq!(strip_terminator(b"1.5\n").unwrap(), "1.");
    }

    #[test]
    fn test_strip_terminator_rejects_short_frame() {
        assert!(matches!(
            strip_terminator(b"\n"),
            Err(DaqError::MalformedFrame(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_writes_lf_and_strips_crlf() {
        let mock = Builder::new().write(b"*IDN?\n").read(b"OK\r\n").build();
        let mut adapter = LineAdapter::new(mock);
        assert_eq!(adapter.exchange("*IDN?").await.unwrap(), "OK");
    }

    #[tokio::test]
    async fn test_exchange_reassembles_split_reply() {
        let mock = Builder::new()
            .write(b"MEAS:ALL? CH1\n")
            .read(b"0.100,")
            .read(b"5.000,0.5")
            .read(b"00\r\n")
            .build();
        let mut adapter = LineAdapter::new(mock);
        assert_eq!(
            adapter.exchange("MEAS:ALL? CH1").await.unwrap(),
            "0.100,5.000,0.500"
        );
    }

    #[tokio::test]
    async fn test_consecutive_exchanges_keep_buffered_bytes() {
        let mock = Builder::new()
            .write(b"A?\n")
            .read(b"one\r\ntwo\r\n")
            .write(b"B?\n")
            .build();
        let mut adapter = LineAdapter::new(mock);
        assert_eq!(adapter.exchange("A?").await.unwrap(), "one");
        assert_eq!(adapter.exchange("B?").await.unwrap(), "two");
    }

    #[tokio::test]
    async fn test_eof_before_terminator() {
        let mock = Builder::new().write(b"*IDN?\n").read(b"RIGOL").build();
        let mut adapter = LineAdapter::new(mock);
        assert!(matches!(
            adapter.exchange("*IDN?").await,
            Err(DaqError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_error_surfaces_as_io() {
        let mock = Builder::new()
            .write(b"*IDN?\n")
            .read_error(std::io::Error::from(std::io::ErrorKind::ConnectionReset))
            .build();
        let mut adapter = LineAdapter::new(mock);
        assert!(matches!(
            adapter.exchange("*IDN?").await,
            Err(DaqError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_write_error_surfaces_as_io() {
        let mock = Builder::new()
            .write_error(std::io::ErrorKind::BrokenPipe.into())
            .build();
        let mut adapter = LineAdapter::new(mock);
        match adapter.exchange("*IDN?").await {
            Err(DaqError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("expected I/O error, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_deadline_elapses() {
        // Keep the far end open but silent.
        let (near, _far) = tokio::io::duplex(64);
        let mut adapter =
            LineAdapter::new(near).with_read_timeout(Some(Duration::from_millis(250)));
        assert!(matches!(
            adapter.exchange("*IDN?").await,
            Err(DaqError::Timeout(d)) if d == Duration::from_millis(250)
        ));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody is listening on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = LineAdapterBuilder::new(address.clone()).connect().await;
        match result {
            Err(DaqError::Connect { address: a, .. }) => assert_eq!(a, address),
            Err(other) => panic!("expected connect error, got {other}"),
            Ok(_) => panic!("expected connect error"),
        }
    }
}
