use log::debug;
use std::collections::HashSet;

use crate::tracker::Directory;
use crate::utils::{P2PError, Result};

/// Returns the smallest port at or above `base` that is not in `known`.
pub fn first_free_port(base: u16, known: &HashSet<u16>) -> Result<u16> {
    (base..=u16::MAX)
        .find(|port| !known.contains(port))
        .ok_or(P2PError::NoPortAvailable(base))
}

/// Picks listening ports against a snapshot of the addresses a directory knows about.
///
/// The snapshot is not re-checked: a peer registering between the snapshot and
/// the caller's own registration can end up with the same port.
pub struct PortAllocator<D> {
    directory: D,
}

impl<D: Directory> PortAllocator<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub async fn allocate(&self, base: u16) -> Result<u16> {
        let known: HashSet<u16> = self
            .directory
            .all_correspondence()
            .await?
            .into_values()
            .map(|address| address.port)
            .collect();

        let port = first_free_port(base, &known)?;
        debug!("Allocated port {} (base {}, {} known)", port, base, known.len());
        Ok(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{PeerAddress, RegistryHandle};

    #[test]
    fn test_skips_known_ports() {
        let known: HashSet<u16> = [4040, 4041].into_iter().collect();
        assert_eq!(first_free_port(4040, &known).unwrap(), 4042);
        assert_eq!(first_free_port(5000, &known).unwrap(), 5000);
    }

    #[test]
    fn test_exhausted_range() {
        let known: HashSet<u16> = [65534, 65535].into_iter().collect();
        assert!(matches!(
            first_free_port(65534, &known),
            Err(P2PError::NoPortAvailable(65534))
        ));
        assert_eq!(first_free_port(65533, &known).unwrap(), 65533);
    }

    #[tokio::test]
    async fn test_allocate_from_registry_snapshot() {
        let registry = RegistryHandle::spawn();
        registry
            .add_peer("a", PeerAddress::new("127.0.0.1", 4040))
            .await
            .unwrap();
        registry
            .register("b", Some("/f"), PeerAddress::new("127.0.0.1", 4041))
            .await
            .unwrap();

        let allocator = PortAllocator::new(registry);
        assert_eq!(allocator.allocate(4040).await.unwrap(), 4042);
    }
}
