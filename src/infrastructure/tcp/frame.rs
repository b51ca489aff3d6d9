//! Length-prefixed message framing.
//!
//! Every message is a big-endian `u16` byte count followed by that many
//! bytes of UTF-8 text, the layout produced by Java's
//! `DataOutputStream::writeUTF`.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload a single frame can carry
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("payload of {0} bytes does not fit in a frame")]
    TooLarge(usize),

    #[error("peer closed the connection mid-frame")]
    Truncated,

    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Write one frame and flush it
pub async fn write_frame<W>(writer: &mut W, payload: &str) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let len = payload.len();
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }

    let mut buf = Vec::with_capacity(len + 2);
    buf.extend_from_slice(&(len as u16).to_be_bytes());
    buf.extend_from_slice(payload.as_bytes());
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one complete frame
pub async fn read_frame<R>(reader: &mut R) -> Result<String, FrameError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u16().await.map_err(truncated)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await.map_err(truncated)?;
    String::from_utf8(buf).map_err(|_| FrameError::InvalidUtf8)
}

fn truncated(err: std::io::Error) -> FrameError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::Truncated
    } else {
        FrameError::Io(err)
    }
}
