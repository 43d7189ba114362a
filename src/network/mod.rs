pub mod service;
pub mod transport;

pub use service::ServiceHandle;
pub use transport::{Transport, MAX_FRAME_SIZE, MAX_TRACKER_FRAME_SIZE};
