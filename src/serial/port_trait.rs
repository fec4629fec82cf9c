//! Byte sink abstraction for the trainer link, so the link can be tested
//! without a serial device.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Write side of a serial connection
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write the whole buffer as one payload
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    async fn flush(&mut self) -> io::Result<()>;
}

/// Any tokio writer as a [`SerialPortIO`]
pub struct AsyncWritePort<W> {
    inner: W,
}

impl<W> AsyncWritePort<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> SerialPortIO for AsyncWritePort<W> {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }
}

/// `tokio_serial::SerialStream` as a [`SerialPortIO`]
pub type TokioSerialPort = AsyncWritePort<tokio_serial::SerialStream>;
