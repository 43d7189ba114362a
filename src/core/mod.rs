pub mod config;
pub mod node;
pub mod protocol;

pub use config::Config;
pub use node::Node;
pub use protocol::{TrackerRequest, TrackerResponse, TransferRequest, NOT_FOUND_SENTINEL};
