use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::core::{Config, TransferRequest};
use crate::network::ServiceHandle;
use crate::tracker::{Directory, FileList, FileRecord, PeerAddress, PortAllocator};
use crate::transfer::{Listener, TransferClient};
use crate::utils::{P2PError, Result};

/// One peer: a listener serving its shared files plus a client for fetching others'.
pub struct Node<D: Directory> {
    pub config: Config,
    directory: D,
    client: TransferClient,
    listener: Option<ServiceHandle>,
    address: Option<PeerAddress>,
}

impl<D: Directory> Node<D> {
    pub fn new(config: Config, directory: D) -> Result<Self> {
        config.validate()?;
        let client = TransferClient::new(config.response_timeout());
        Ok(Self {
            config,
            directory,
            client,
            listener: None,
            address: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.config.node_id
    }

    pub fn address(&self) -> Option<&PeerAddress> {
        self.address.as_ref()
    }

    /// Picks a port, starts the listener and announces this peer to the directory.
    ///
    /// On failure nothing is left behind: the listener is stopped and the peer withdrawn.
    pub async fn start(&mut self) -> Result<PeerAddress> {
        if let Some(address) = &self.address {
            return Ok(address.clone());
        }

        if let Some(files) = self.config.shared_files.as_deref() {
            FileList::parse(Some(files))?;
        }

        let port = PortAllocator::new(self.directory.clone())
            .allocate(self.config.base_port)
            .await?;

        let listener = Listener::bind(
            &PeerAddress::new(self.config.listen_ip.as_str(), port).to_string(),
            self.directory.clone(),
        )
        .await?
        .with_chunk_size(self.config.chunk_size)
        .with_request_timeout(self.config.request_timeout());

        let service = listener.spawn()?;
        // Port 0 lets the OS choose; advertise what was actually bound.
        let address = PeerAddress::new(self.config.listen_ip.as_str(), service.local_addr().port());
        self.listener = Some(service);
        info!("Peer {} listening on {}", self.config.node_id, address);

        if let Err(e) = self.announce(&address).await {
            warn!("Peer {} failed to start: {}", self.config.node_id, e);
            if let Err(undo) = self.shutdown().await {
                warn!("Rollback for {} incomplete: {}", self.config.node_id, undo);
            }
            return Err(e);
        }

        Ok(address)
    }

    async fn announce(&mut self, address: &PeerAddress) -> Result<()> {
        self.directory
            .add_peer(&self.config.node_id, address.clone())
            .await?;
        self.address = Some(address.clone());

        if let Some(files) = self.config.shared_files.clone() {
            self.share(&files).await?;
        }
        Ok(())
    }

    pub async fn share(&self, files: &str) -> Result<()> {
        let address = self.require_address()?;
        self.directory
            .register(&self.config.node_id, Some(files), address)
            .await?;
        info!("Peer {} shared {}", self.config.node_id, files);
        Ok(())
    }

    pub async fn unshare(&self, files: &str) -> Result<()> {
        self.directory
            .unregister(&self.config.node_id, Some(files))
            .await?;
        info!("Peer {} stopped sharing {}", self.config.node_id, files);
        Ok(())
    }

    pub async fn shared_files(&self) -> Result<Vec<String>> {
        self.directory.files_of(&self.config.node_id).await
    }

    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        self.directory.list_all().await
    }

    /// Downloads `path` from `owner` into `dest`, or into the download directory
    /// under the file's own name when `dest` is `None`.
    pub async fn download(&self, owner: &str, path: &str, dest: Option<&Path>) -> Result<PathBuf> {
        let address = self
            .directory
            .address_of(owner)
            .await?
            .ok_or_else(|| P2PError::UnknownPeer(owner.to_string()))?;

        let dest = match dest {
            Some(dest) => dest.to_path_buf(),
            None => self.default_destination(path)?,
        };

        let request = TransferRequest::new(owner, path);
        self.client.fetch(&address, &request, &dest).await?;
        Ok(dest)
    }

    /// Stops the listener and withdraws this peer from the directory.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(service) = self.listener.take() {
            service.shutdown().await;
        }
        if self.address.take().is_some() {
            if let Err(e) = self.directory.remove_peer(&self.config.node_id).await {
                warn!("Failed to withdraw {}: {}", self.config.node_id, e);
                return Err(e);
            }
        }
        info!("Peer {} stopped", self.config.node_id);
        Ok(())
    }

    fn require_address(&self) -> Result<PeerAddress> {
        self.address.clone().ok_or_else(|| {
            P2PError::ConfigError(format!("peer {} has not been started", self.config.node_id))
        })
    }

    fn default_destination(&self, path: &str) -> Result<PathBuf> {
        // Windows-style paths are valid registrations even on Unix hosts.
        let name = path
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| P2PError::InvalidResponse(format!("no file name in {}", path)))?;
        Ok(self.config.download_dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::RegistryHandle;

    fn config(id: &str, dir: &Path) -> Config {
        Config {
            node_id: id.to_string(),
            base_port: 0,
            download_dir: dir.join("downloads"),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_two_peers_exchange_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("song.txt");
        std::fs::write(&source, b"la la la").unwrap();
        let source = source.to_string_lossy().to_string();

        let registry = RegistryHandle::spawn();

        let mut alice = Node::new(
            Config {
                shared_files: Some(source.clone()),
                ..config("alice", dir.path())
            },
            registry.clone(),
        )
        .unwrap();
        let alice_address = alice.start().await.unwrap();
        assert_ne!(alice_address.port, 0);

        let mut bob = Node::new(config("bob", dir.path()), registry.clone()).unwrap();
        bob.start().await.unwrap();

        let saved = bob.download("alice", &source, None).await.unwrap();
        assert_eq!(saved, dir.path().join("downloads").join("song.txt"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"la la la");

        alice.shutdown().await.unwrap();
        let err = bob.download("alice", &source, None).await.unwrap_err();
        assert!(matches!(err, P2PError::UnknownPeer(_)));
        bob.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unshare_last_file_drops_peer() {
        let dir = tempfile::tempdir().unwrap();
        let registry = RegistryHandle::spawn();
        let mut node = Node::new(config("carol", dir.path()), registry.clone()).unwrap();
        node.start().await.unwrap();

        node.share("/srv/a.txt, /srv/b.txt").await.unwrap();
        node.unshare("/srv/a.txt").await.unwrap();
        assert_eq!(node.shared_files().await.unwrap(), vec!["/srv/b.txt"]);

        node.unshare("/srv/b.txt").await.unwrap();
        assert_eq!(registry.address_of("carol").await.unwrap(), None);
        assert!(node.list().await.unwrap().is_empty());
        node.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_shared_files_leave_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let registry = RegistryHandle::spawn();
        let mut node = Node::new(
            Config {
                shared_files: Some("relative/a.txt".to_string()),
                ..config("erin", dir.path())
            },
            registry.clone(),
        )
        .unwrap();

        let err = node.start().await.unwrap_err();
        assert!(matches!(
            err,
            P2PError::Validation(crate::utils::ValidationError::NotAbsolute)
        ));
        assert!(node.address().is_none());
        assert_eq!(registry.address_of("erin").await.unwrap(), None);

        // A retry fails the same way instead of reporting a half-started peer.
        assert!(node.start().await.is_err());
        assert!(registry.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_share_before_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let node = Node::new(config("dave", dir.path()), RegistryHandle::spawn()).unwrap();
        assert!(matches!(
            node.share("/srv/a.txt").await,
            Err(P2PError::ConfigError(_))
        ));
    }
}
