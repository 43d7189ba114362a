use log::debug;
use std::collections::HashMap;
use tokio::time::{timeout, Duration};

use crate::core::{TrackerRequest, TrackerResponse};
use crate::network::{Transport, MAX_TRACKER_FRAME_SIZE};
use crate::tracker::{Directory, FileRecord, PeerAddress};
use crate::utils::{P2PError, Result};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Talks to a remote [`TrackerServer`](crate::tracker::TrackerServer), one connection per call.
#[derive(Clone, Debug)]
pub struct TrackerClient {
    addr: String,
    call_timeout: Duration,
}

impl TrackerClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn call(&self, request: TrackerRequest) -> Result<TrackerResponse> {
        let response = timeout(self.call_timeout, self.exchange(&request))
            .await
            .map_err(|_| P2PError::Timeout(self.call_timeout))??;

        debug!("Tracker {} replied {:?}", self.addr, response);
        match response {
            TrackerResponse::Invalid(e) => Err(P2PError::Validation(e)),
            TrackerResponse::Error(message) => Err(P2PError::Tracker(message)),
            other => Ok(other),
        }
    }

    async fn exchange(&self, request: &TrackerRequest) -> Result<TrackerResponse> {
        let mut stream = Transport::connect(&self.addr).await?;
        Transport::send_frame(&mut stream, request, MAX_TRACKER_FRAME_SIZE).await?;
        Transport::receive_frame(&mut stream, MAX_TRACKER_FRAME_SIZE).await
    }

    async fn call_unit(&self, request: TrackerRequest) -> Result<()> {
        match self.call(request).await? {
            TrackerResponse::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: TrackerResponse) -> P2PError {
    P2PError::InvalidResponse(format!("unexpected tracker reply: {:?}", response))
}

impl Directory for TrackerClient {
    async fn register(&self, owner: &str, files: Option<&str>, address: PeerAddress) -> Result<()> {
        self.call_unit(TrackerRequest::Register {
            owner: owner.to_string(),
            files: files.map(str::to_string),
            address,
        })
        .await
    }

    async fn unregister(&self, owner: &str, files: Option<&str>) -> Result<()> {
        self.call_unit(TrackerRequest::Unregister {
            owner: owner.to_string(),
            files: files.map(str::to_string),
        })
        .await
    }

    async fn add_peer(&self, owner: &str, address: PeerAddress) -> Result<()> {
        self.call_unit(TrackerRequest::AddPeer {
            owner: owner.to_string(),
            address,
        })
        .await
    }

    async fn remove_peer(&self, owner: &str) -> Result<()> {
        self.call_unit(TrackerRequest::RemovePeer {
            owner: owner.to_string(),
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>> {
        match self.call(TrackerRequest::ListAll).await? {
            TrackerResponse::Listing(records) => Ok(records),
            other => Err(unexpected(other)),
        }
    }

    async fn files_of(&self, owner: &str) -> Result<Vec<String>> {
        let request = TrackerRequest::FilesOf {
            owner: owner.to_string(),
        };
        match self.call(request).await? {
            TrackerResponse::Files(files) => Ok(files),
            other => Err(unexpected(other)),
        }
    }

    async fn address_of(&self, owner: &str) -> Result<Option<PeerAddress>> {
        let request = TrackerRequest::AddressOf {
            owner: owner.to_string(),
        };
        match self.call(request).await? {
            TrackerResponse::Address(address) => Ok(address),
            other => Err(unexpected(other)),
        }
    }

    async fn all_correspondence(&self) -> Result<HashMap<String, PeerAddress>> {
        match self.call(TrackerRequest::AllCorrespondence).await? {
            TrackerResponse::Correspondence(map) => Ok(map),
            other => Err(unexpected(other)),
        }
    }
}
