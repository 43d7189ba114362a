pub mod error;
pub mod logger;

pub use error::{P2PError, Result, ValidationError};
pub use logger::setup_logging;
