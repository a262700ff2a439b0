//! Length-prefixed frame I/O shared by the server and the client

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::protocol::{decode_message, encode_message, LENGTH_PREFIX_SIZE};
use crate::error::IpcError;

/// Read one frame body
///
/// Returns `Ok(None)` when the peer closed the stream before a new frame
/// started. A length above `max_len` is reported without reading the body,
/// so the stream cannot be used afterwards.
///
/// # Errors
///
/// Returns `IpcError::FrameTooLarge` for an oversized length and
/// `IpcError::IoError` if the stream fails mid-frame.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>, IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > max_len {
        return Err(IpcError::FrameTooLarge { len, max: max_len });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Read and decode one message, treating a closed stream as an error
///
/// # Errors
///
/// Returns `IpcError` if the stream closes, the frame is oversized, or the
/// body does not decode.
pub async fn read_message<R, T>(reader: &mut R, max_len: usize) -> Result<T, IpcError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let body = read_frame(reader, max_len)
        .await?
        .ok_or_else(|| IpcError::protocol("connection closed before a reply"))?;
    decode_message(&body).map_err(|e| IpcError::protocol(e.to_string()))
}

/// Encode and write one message
///
/// # Errors
///
/// Returns `IpcError` if encoding or writing fails.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_message(message).map_err(|e| IpcError::serialization(e.to_string()))?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::protocol::IpcCommand;

    #[tokio::test]
    async fn test_message_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(256);

        write_message(&mut client, &IpcCommand::ListPeers).await.unwrap();
        let command: IpcCommand = read_message(&mut server, 256).await.unwrap();
        assert!(matches!(command, IpcCommand::ListPeers));
    }

    #[tokio::test]
    async fn test_closed_stream_is_none() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        assert!(read_frame(&mut server, 64).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_length_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&1000u32.to_be_bytes()).await.unwrap();

        let result = read_frame(&mut server, 100).await;
        assert!(matches!(
            result,
            Err(IpcError::FrameTooLarge { len: 1000, max: 100 })
        ));
    }
}
