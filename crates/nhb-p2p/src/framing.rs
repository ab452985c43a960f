//! Length-prefixed wire framing and per-peer rate limiting (§4.9).
//!
//! Every message on the wire is a 4-byte big-endian length prefix followed by
//! that many bytes of JSON payload. `max_message_bytes` bounds the prefix
//! itself, so a peer can't make us allocate an unbounded buffer before we've
//! even looked at the message.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::{P2pError, Result};

const LENGTH_PREFIX_BYTES: usize = 4;

/// Read one length-prefixed frame, rejecting anything over `max_message_bytes`.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, max_message_bytes: usize) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; LENGTH_PREFIX_BYTES];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_message_bytes {
        return Err(P2pError::OversizedMessage {
            got: len,
            max: max_message_bytes,
        });
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write one length-prefixed frame.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8], max_message_bytes: usize) -> Result<()> {
    if payload.len() > max_message_bytes {
        return Err(P2pError::OversizedMessage {
            got: payload.len(),
            max: max_message_bytes,
        });
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Token bucket used to rate-limit a single peer's inbound messages.
/// Refills continuously at `rate_msgs_per_sec`, capped at `burst`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    rate_per_sec: f64,
    burst: f64,
    tokens: f64,
    last_refill_secs: f64,
}

impl TokenBucket {
    pub fn new(rate_msgs_per_sec: f64, burst: f64) -> Self {
        Self {
            rate_per_sec: rate_msgs_per_sec,
            burst,
            tokens: burst,
            last_refill_secs: 0.0,
        }
    }

    /// Consume one token at `now_secs`, refilling first. Returns `false` (and
    /// leaves the bucket empty) if there was nothing left to spend — the
    /// caller should treat that as a rate violation and penalize the peer's
    /// score.
    pub fn try_consume(&mut self, now_secs: f64) -> bool {
        let elapsed = (now_secs - self.last_refill_secs).max(0.0);
        self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.burst);
        self.last_refill_secs = now_secs;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
