//! Mini Share
//!
//! Tracker-directed P2P file sharing: a central tracker records which files each
//! peer shares and where it listens, and peers fetch files directly from each other.

pub mod core;
pub mod network;
pub mod tracker;
pub mod transfer;
pub mod utils;

// Re-export main types
pub use crate::core::{Config, Node};
pub use tracker::{
    Directory, FileRecord, PeerAddress, RegistryHandle, TrackerClient, TrackerServer,
};
pub use transfer::{Listener, TransferClient};
pub use utils::{
    error::{P2PError, Result, ValidationError},
    setup_logging,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
