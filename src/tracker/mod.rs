pub mod client;
pub mod directory;
pub mod file_list;
pub mod port_allocator;
pub mod record;
pub mod registry;
pub mod server;

pub use client::TrackerClient;
pub use directory::Directory;
pub use file_list::FileList;
pub use port_allocator::{first_free_port, PortAllocator};
pub use record::{FileRecord, PeerAddress};
pub use registry::{Registry, RegistryHandle, RegistryWorker};
pub use server::TrackerServer;
