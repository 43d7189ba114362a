pub mod client;
pub mod listener;

pub use client::{TransferClient, DEFAULT_RESPONSE_TIMEOUT};
pub use listener::{Listener, Served, DEFAULT_CHUNK_SIZE};
