use log::{debug, error, info, warn};
use std::net::SocketAddr;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};

use crate::core::{TransferRequest, NOT_FOUND_SENTINEL};
use crate::network::{ServiceHandle, Transport, MAX_FRAME_SIZE};
use crate::tracker::Directory;
use crate::utils::{P2PError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// How a single inbound request was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    Refused,
    Streamed(u64),
}

/// A peer's inbound endpoint: serves files its owner has registered with the directory.
///
/// Every accepted connection runs in its own task and there is no cap on how many
/// run at once. The requester is not identified; authorization only checks that
/// the named owner shares the named path.
pub struct Listener<D> {
    listener: TcpListener,
    directory: D,
    chunk_size: usize,
    request_timeout: Option<Duration>,
}

impl<D: Directory> Listener<D> {
    pub async fn bind(addr: &str, directory: D) -> Result<Self> {
        let listener = Transport::listen(addr).await?;
        Ok(Self {
            listener,
            directory,
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: None,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Bounds how long a connection may take to send its request. Unbounded by default.
    pub fn with_request_timeout(mut self, request_timeout: Option<Duration>) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn spawn(self) -> Result<ServiceHandle> {
        let local_addr = self.local_addr()?;
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));
        Ok(ServiceHandle::new(local_addr, shutdown_tx, task))
    }

    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Listener shutting down");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!("Transfer connection from {}", addr);
                            let directory = self.directory.clone();
                            let chunk_size = self.chunk_size;
                            let request_timeout = self.request_timeout;

                            tokio::spawn(async move {
                                let served =
                                    Self::handle_connection(stream, directory, chunk_size, request_timeout)
                                        .await;
                                match served {
                                    Ok(Served::Streamed(bytes)) => {
                                        info!("Sent {} bytes to {}", bytes, addr);
                                    }
                                    Ok(Served::Refused) => {}
                                    Err(e) => error!("Transfer to {} failed: {}", addr, e),
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
            }
        }
    }

    /// Reads one request, authorizes it and streams the file. The stream is
    /// dropped, and so closed, on every return path.
    async fn handle_connection(
        mut stream: TcpStream,
        directory: D,
        chunk_size: usize,
        request_timeout: Option<Duration>,
    ) -> Result<Served> {
        let request: TransferRequest = match request_timeout {
            Some(limit) => timeout(
                limit,
                Transport::receive_frame::<_, TransferRequest>(&mut stream, MAX_FRAME_SIZE),
            )
            .await
            .map_err(|_| P2PError::Timeout(limit))??,
            None => Transport::receive_frame(&mut stream, MAX_FRAME_SIZE).await?,
        };

        if !Self::authorize(&directory, &request).await {
            info!(
                "Refused {} from owner {}: not shared",
                request.path, request.owner
            );
            stream.write_all(NOT_FOUND_SENTINEL).await?;
            stream.shutdown().await?;
            return Ok(Served::Refused);
        }

        let mut file = File::open(&request.path).await.map_err(|e| {
            P2PError::IoError(format!("Failed to open {}: {}", request.path, e))
        })?;

        let mut buffer = vec![0u8; chunk_size];
        let mut sent = 0u64;
        loop {
            let n = file.read(&mut buffer).await.map_err(|e| {
                P2PError::IoError(format!("Failed to read {}: {}", request.path, e))
            })?;
            if n == 0 {
                break;
            }
            stream.write_all(&buffer[..n]).await?;
            sent += n as u64;
        }

        stream.shutdown().await?;
        Ok(Served::Streamed(sent))
    }

    // Fails closed: a directory that cannot be reached authorizes nothing.
    async fn authorize(directory: &D, request: &TransferRequest) -> bool {
        match directory.files_of(&request.owner).await {
            Ok(files) => files.iter().any(|p| p == &request.path),
            Err(e) => {
                warn!("Could not authorize {}: {}", request.path, e);
                false
            }
        }
    }
}
