use log::{debug, error, info};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use crate::core::{TrackerRequest, TrackerResponse};
use crate::network::{ServiceHandle, Transport, MAX_TRACKER_FRAME_SIZE};
use crate::tracker::RegistryHandle;
use crate::utils::{P2PError, Result};

/// Serves a registry to remote peers over length-prefixed JSON frames.
pub struct TrackerServer {
    listener: TcpListener,
    registry: RegistryHandle,
}

impl TrackerServer {
    pub async fn bind(addr: &str, registry: RegistryHandle) -> Result<Self> {
        let listener = Transport::listen(addr).await?;
        Ok(Self { listener, registry })
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
        info!("Tracker accepting connections");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Tracker shutting down");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!("Tracker connection from {}", addr);
                            let registry = self.registry.clone();
                            tokio::spawn(async move {
                                Self::handle_connection(stream, addr, registry).await;
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept tracker connection: {}", e);
                            sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection(mut stream: TcpStream, addr: SocketAddr, registry: RegistryHandle) {
        loop {
            let received =
                Transport::receive_frame::<_, TrackerRequest>(&mut stream, MAX_TRACKER_FRAME_SIZE).await;
            let request: TrackerRequest = match received {
                Ok(request) => request,
                Err(P2PError::SerializationError(e)) => {
                    debug!("Malformed tracker request from {}: {}", addr, e);
                    let reply = TrackerResponse::Error(format!("malformed request: {}", e));
                    let _ = Transport::send_frame(&mut stream, &reply, MAX_TRACKER_FRAME_SIZE).await;
                    break;
                }
                Err(e) => {
                    debug!("Tracker connection from {} closed: {}", addr, e);
                    break;
                }
            };

            let response = dispatch(&registry, request).await;
            let sent = Transport::send_frame(&mut stream, &response, MAX_TRACKER_FRAME_SIZE).await;
            if let Err(e) = sent {
                debug!("Failed to reply to {}: {}", addr, e);
                break;
            }
        }
    }
}

/// Applies one request to the registry and wraps the outcome for the wire.
pub async fn dispatch(registry: &RegistryHandle, request: TrackerRequest) -> TrackerResponse {
    let outcome = match request {
        TrackerRequest::Register {
            owner,
            files,
            address,
        } => registry
            .register(&owner, files.as_deref(), address)
            .await
            .map(|_| TrackerResponse::Ok),
        TrackerRequest::Unregister { owner, files } => registry
            .unregister(&owner, files.as_deref())
            .await
            .map(|_| TrackerResponse::Ok),
        TrackerRequest::AddPeer { owner, address } => registry
            .add_peer(&owner, address)
            .await
            .map(|_| TrackerResponse::Ok),
        TrackerRequest::RemovePeer { owner } => registry
            .remove_peer(&owner)
            .await
            .map(|_| TrackerResponse::Ok),
        TrackerRequest::ListAll => registry.list_all().await.map(TrackerResponse::Listing),
        TrackerRequest::FilesOf { owner } => {
            registry.files_of(&owner).await.map(TrackerResponse::Files)
        }
        TrackerRequest::AddressOf { owner } => {
            registry.address_of(&owner).await.map(TrackerResponse::Address)
        }
        TrackerRequest::AllCorrespondence => registry
            .all_correspondence()
            .await
            .map(TrackerResponse::Correspondence),
    };

    match outcome {
        Ok(response) => response,
        Err(P2PError::Validation(e)) => TrackerResponse::Invalid(e),
        Err(e) => TrackerResponse::Error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::PeerAddress;
    use crate::utils::ValidationError;

    #[tokio::test]
    async fn test_dispatch_maps_validation_errors() {
        let registry = RegistryHandle::spawn();
        let response = dispatch(
            &registry,
            TrackerRequest::Register {
                owner: "u".to_string(),
                files: Some("rel/path".to_string()),
                address: PeerAddress::new("127.0.0.1", 4040),
            },
        )
        .await;
        assert_eq!(response, TrackerResponse::Invalid(ValidationError::NotAbsolute));
    }

    #[tokio::test]
    async fn test_dispatch_reads() {
        let registry = RegistryHandle::spawn();
        registry
            .register("u", Some("/a, /b"), PeerAddress::new("127.0.0.1", 4040))
            .await
            .unwrap();

        let files = dispatch(
            &registry,
            TrackerRequest::FilesOf {
                owner: "u".to_string(),
            },
        )
        .await;
        assert_eq!(
            files,
            TrackerResponse::Files(vec!["/a".to_string(), "/b".to_string()])
        );

        let address = dispatch(
            &registry,
            TrackerRequest::AddressOf {
                owner: "nobody".to_string(),
            },
        )
        .await;
        assert_eq!(address, TrackerResponse::Address(None));
    }
}
