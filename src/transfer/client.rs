use log::{debug, info, warn};
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

use crate::core::{TransferRequest, NOT_FOUND_SENTINEL};
use crate::network::{Transport, MAX_FRAME_SIZE};
use crate::tracker::PeerAddress;
use crate::utils::{P2PError, Result};

pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(5000);

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Outbound half of the transfer protocol.
///
/// Only the wait for the first response is bounded. Once bytes start
/// arriving the transfer runs until the remote side closes the connection.
#[derive(Debug, Clone)]
pub struct TransferClient {
    response_timeout: Duration,
}

impl Default for TransferClient {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_TIMEOUT)
    }
}

impl TransferClient {
    pub fn new(response_timeout: Duration) -> Self {
        Self { response_timeout }
    }

    /// Fetches `request.path` from the listener at `address` into `dest`.
    ///
    /// Returns the number of bytes written. `dest` is only created once the
    /// remote side has accepted the request.
    pub async fn fetch(
        &self,
        address: &PeerAddress,
        request: &TransferRequest,
        dest: &Path,
    ) -> Result<u64> {
        info!(
            "Requesting {} from {} at {}",
            request.path, request.owner, address
        );

        let mut stream = TcpStream::connect((address.ip.as_str(), address.port))
            .await
            .map_err(|e| {
                P2PError::ConnectionFailed(format!("Failed to connect to {}: {}", address, e))
            })?;

        Transport::send_frame(&mut stream, request, MAX_FRAME_SIZE)
            .await
            .map_err(|e| P2PError::Transfer(e.to_string()))?;

        let head = self.read_head(&mut stream).await?;
        if head == NOT_FOUND_SENTINEL {
            return Err(P2PError::NotFound {
                owner: request.owner.clone(),
                path: request.path.clone(),
            });
        }

        match Self::write_stream(&mut stream, &head, dest).await {
            Ok(bytes) => {
                info!("Received {} bytes into {}", bytes, dest.display());
                Ok(bytes)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(dest).await {
                    debug!("Could not remove partial {}: {}", dest.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    /// Reads the start of the reply, waiting at most `response_timeout` for the first bytes.
    ///
    /// A refusal is the sentinel followed by a close. Bytes that only look like
    /// the sentinel, or continue past it, belong to the file and are returned as-is.
    async fn read_head(&self, stream: &mut TcpStream) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        let n = timeout(self.response_timeout, stream.read(&mut buffer))
            .await
            .map_err(|_| {
                warn!("No response within {:?}", self.response_timeout);
                P2PError::Timeout(self.response_timeout)
            })?
            .map_err(|e| P2PError::Transfer(e.to_string()))?;
        let mut head = buffer[..n].to_vec();

        // The sentinel may arrive split across reads.
        while !head.is_empty()
            && head.len() < NOT_FOUND_SENTINEL.len()
            && NOT_FOUND_SENTINEL.starts_with(&head)
        {
            let n = read_chunk(stream, &mut buffer).await?;
            if n == 0 {
                return Ok(head);
            }
            head.extend_from_slice(&buffer[..n]);
        }

        if head == NOT_FOUND_SENTINEL {
            let n = read_chunk(stream, &mut buffer).await?;
            head.extend_from_slice(&buffer[..n]);
        }

        Ok(head)
    }

    async fn write_stream(stream: &mut TcpStream, head: &[u8], dest: &Path) -> Result<u64> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(dest).await.map_err(|e| {
            P2PError::IoError(format!("Failed to create {}: {}", dest.display(), e))
        })?;
        file.write_all(head).await?;
        let mut written = head.len() as u64;

        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = read_chunk(stream, &mut buffer).await?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n]).await?;
            written += n as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}

async fn read_chunk(stream: &mut TcpStream, buffer: &mut [u8]) -> Result<usize> {
    stream
        .read(buffer)
        .await
        .map_err(|e| P2PError::Transfer(e.to_string()))
}
