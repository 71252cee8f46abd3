//! Length-prefixed framing.
//!
//! Each frame is a 4-byte big-endian length followed by exactly that many
//! payload bytes. Partial reads and writes are looped over by
//! `read_exact`/`write_all`, so callers always see whole frames.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::MAX_FRAME_LEN;
use crate::error::NetError;

const LEN_PREFIX: usize = 4;

/// Read half of a framed stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    max_len: u32,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, MAX_FRAME_LEN)
    }

    pub fn with_limit(inner: R, max_len: u32) -> Self {
        Self { inner, max_len }
    }

    /// Read the next frame payload.
    ///
    /// End of stream anywhere inside a frame, including before the prefix,
    /// yields [`NetError::PeerClosed`]. An oversized prefix is rejected
    /// before anything is allocated.
    pub async fn receive(&mut self) -> Result<Vec<u8>, NetError> {
        let mut len_buf = [0u8; LEN_PREFIX];
        self.inner.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf);
        if len > self.max_len {
            return Err(NetError::FrameTooLarge {
                len: len as u64,
                max: self.max_len,
            });
        }
        let mut payload = vec![0u8; len as usize];
        self.inner.read_exact(&mut payload).await?;
        Ok(payload)
    }
}

/// Write half of a framed stream.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
    max_len: u32,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_limit(inner, MAX_FRAME_LEN)
    }

    pub fn with_limit(inner: W, max_len: u32) -> Self {
        Self { inner, max_len }
    }

    /// Write one frame. Returns only after every byte has been handed to
    /// the stream and flushed.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), NetError> {
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= self.max_len)
            .ok_or(NetError::FrameTooLarge {
                len: payload.len() as u64,
                max: self.max_len,
            })?;
        let mut frame = Vec::with_capacity(LEN_PREFIX + payload.len());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(payload);
        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shut down the write direction so the peer sees end of stream.
    pub async fn close(&mut self) -> Result<(), NetError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}
