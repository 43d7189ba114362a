use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tracker::{FileRecord, PeerAddress};
use crate::utils::ValidationError;

/// Reply written by a listener in place of file bytes when a request is refused.
pub const NOT_FOUND_SENTINEL: &[u8] = b"File not found";

/// The single request a downloader sends to a peer listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub owner: String,
    pub path: String,
}

impl TransferRequest {
    pub fn new(owner: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            path: path.into(),
        }
    }
}

/// Requests understood by the tracker service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TrackerRequest {
    Register {
        owner: String,
        files: Option<String>,
        address: PeerAddress,
    },
    Unregister {
        owner: String,
        files: Option<String>,
    },
    AddPeer {
        owner: String,
        address: PeerAddress,
    },
    RemovePeer {
        owner: String,
    },
    ListAll,
    FilesOf {
        owner: String,
    },
    AddressOf {
        owner: String,
    },
    AllCorrespondence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "body", rename_all = "snake_case")]
pub enum TrackerResponse {
    Ok,
    Files(Vec<String>),
    Listing(Vec<FileRecord>),
    Address(Option<PeerAddress>),
    Correspondence(HashMap<String, PeerAddress>),
    Invalid(ValidationError),
    Error(String),
}
