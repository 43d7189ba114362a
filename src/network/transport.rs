use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::utils::{P2PError, Result};

/// Upper bound for a transfer request frame.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Upper bound for tracker frames, which carry whole file lists and listings.
pub const MAX_TRACKER_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Length-prefixed JSON framing shared by the transfer and tracker protocols.
///
/// A frame is a big-endian `u32` byte count followed by that many bytes of JSON.
pub struct Transport;

impl Transport {
    pub async fn connect(addr: &str) -> Result<TcpStream> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            P2PError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e))
        })?;

        debug!("Connected to {}", addr);
        Ok(stream)
    }

    pub async fn listen(addr: &str) -> Result<TcpListener> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| P2PError::NetworkError(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("Listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    pub async fn send_data<W>(stream: &mut W, data: &[u8], max_size: usize) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        if data.len() > max_size {
            return Err(P2PError::MessageTooLarge(data.len()));
        }

        stream.write_u32(data.len() as u32).await?;
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    pub async fn receive_data<R>(stream: &mut R, max_size: usize) -> Result<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        let len = stream.read_u32().await? as usize;

        if len > max_size {
            return Err(P2PError::MessageTooLarge(len));
        }

        let mut buffer = vec![0u8; len];
        stream.read_exact(&mut buffer).await?;

        Ok(buffer)
    }

    pub async fn send_frame<W, T>(stream: &mut W, message: &T, max_size: usize) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        T: Serialize,
    {
        let serialized = serde_json::to_vec(message)?;
        Self::send_data(stream, &serialized, max_size).await
    }

    pub async fn receive_frame<R, T>(stream: &mut R, max_size: usize) -> Result<T>
    where
        R: AsyncRead + Unpin,
        T: DeserializeOwned,
    {
        let buffer = Self::receive_data(stream, max_size).await?;
        Ok(serde_json::from_slice(&buffer)?)
    }
}
