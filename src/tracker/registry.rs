//! The tracker's directory of peers, the files they share and where they listen.
//!
//! [`Registry`] is the plain store. [`RegistryHandle`] is the shared front end:
//! every call becomes a [`Command`] on a queue drained by a single
//! [`RegistryWorker`] task, so operations apply one at a time in arrival order
//! and reads see every mutation submitted before them.
//!
//! There is no read-then-write primitive. A caller that reads a snapshot and
//! then writes based on it can race with other writers.

use log::debug;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

use crate::tracker::{FileList, FileRecord, PeerAddress};
use crate::utils::{P2PError, Result, ValidationError};

const COMMAND_QUEUE_SIZE: usize = 256;

#[derive(Debug, Default)]
pub struct Registry {
    records: HashMap<String, FileRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the owner's record or merges new paths into it.
    ///
    /// The address only applies when the record is created.
    pub fn register(&mut self, owner: &str, files: FileList, address: PeerAddress) {
        match self.records.get_mut(owner) {
            Some(record) => {
                let added = record.merge(files.into_paths());
                debug!("Merged {} new path(s) into record of {}", added, owner);
            }
            None => {
                let mut record = FileRecord::new(owner, address);
                record.merge(files.into_paths());
                debug!(
                    "Created record for {} at {} with {} path(s)",
                    owner,
                    record.address,
                    record.paths.len()
                );
                self.records.insert(owner.to_string(), record);
            }
        }
    }

    /// Removes the named paths. A record left without paths is dropped, address included.
    pub fn unregister(&mut self, owner: &str, files: &FileList) {
        let Some(record) = self.records.get_mut(owner) else {
            return;
        };

        record.remove(files.paths());
        if record.paths.is_empty() {
            self.records.remove(owner);
            debug!("Dropped record for {}: no files left", owner);
        }
    }

    pub fn add_peer(&mut self, owner: &str, address: PeerAddress) {
        if !self.records.contains_key(owner) {
            debug!("Peer {} joined at {}", owner, address);
            self.records
                .insert(owner.to_string(), FileRecord::new(owner, address));
        }
    }

    pub fn remove_peer(&mut self, owner: &str) {
        if self.records.remove(owner).is_some() {
            debug!("Peer {} removed", owner);
        }
    }

    pub fn list_all(&self) -> Vec<FileRecord> {
        self.records.values().cloned().collect()
    }

    pub fn files_of(&self, owner: &str) -> Vec<String> {
        self.records
            .get(owner)
            .map(|r| r.paths.clone())
            .unwrap_or_default()
    }

    pub fn address_of(&self, owner: &str) -> Option<PeerAddress> {
        self.records.get(owner).map(|r| r.address.clone())
    }

    pub fn all_correspondence(&self) -> HashMap<String, PeerAddress> {
        self.records
            .values()
            .map(|r| (r.owner.clone(), r.address.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Messages processed by the registry worker. Each carries its reply channel.
#[derive(Debug)]
pub enum Command {
    Register {
        owner: String,
        files: FileList,
        address: PeerAddress,
        reply: oneshot::Sender<()>,
    },
    Unregister {
        owner: String,
        files: FileList,
        reply: oneshot::Sender<()>,
    },
    AddPeer {
        owner: String,
        address: PeerAddress,
        reply: oneshot::Sender<()>,
    },
    RemovePeer {
        owner: String,
        reply: oneshot::Sender<()>,
    },
    ListAll {
        reply: oneshot::Sender<Vec<FileRecord>>,
    },
    FilesOf {
        owner: String,
        reply: oneshot::Sender<Vec<String>>,
    },
    AddressOf {
        owner: String,
        reply: oneshot::Sender<Option<PeerAddress>>,
    },
    AllCorrespondence {
        reply: oneshot::Sender<HashMap<String, PeerAddress>>,
    },
}

/// Owns the [`Registry`] and applies queued commands strictly in order.
pub struct RegistryWorker {
    registry: Registry,
    commands: mpsc::Receiver<Command>,
}

impl RegistryWorker {
    /// Runs until every [`RegistryHandle`] has been dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.apply(command);
        }
        debug!(
            "Registry worker stopped with {} record(s)",
            self.registry.len()
        );
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Register {
                owner,
                files,
                address,
                reply,
            } => {
                self.registry.register(&owner, files, address);
                let _ = reply.send(());
            }
            Command::Unregister {
                owner,
                files,
                reply,
            } => {
                self.registry.unregister(&owner, &files);
                let _ = reply.send(());
            }
            Command::AddPeer {
                owner,
                address,
                reply,
            } => {
                self.registry.add_peer(&owner, address);
                let _ = reply.send(());
            }
            Command::RemovePeer { owner, reply } => {
                self.registry.remove_peer(&owner);
                let _ = reply.send(());
            }
            Command::ListAll { reply } => {
                let _ = reply.send(self.registry.list_all());
            }
            Command::FilesOf { owner, reply } => {
                let _ = reply.send(self.registry.files_of(&owner));
            }
            Command::AddressOf { owner, reply } => {
                let _ = reply.send(self.registry.address_of(&owner));
            }
            Command::AllCorrespondence { reply } => {
                let _ = reply.send(self.registry.all_correspondence());
            }
        }
    }
}

/// Cloneable front end to a running registry worker.
#[derive(Clone, Debug)]
pub struct RegistryHandle {
    commands: mpsc::Sender<Command>,
}

impl RegistryHandle {
    /// Spawns a worker over an empty registry on the current tokio runtime.
    pub fn spawn() -> Self {
        let (handle, worker) = Self::with_registry(Registry::new());
        tokio::spawn(worker.run());
        handle
    }

    /// Builds a handle/worker pair without spawning, for callers that drive the worker themselves.
    pub fn with_registry(registry: Registry) -> (Self, RegistryWorker) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        (
            Self { commands: tx },
            RegistryWorker {
                registry,
                commands: rx,
            },
        )
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| P2PError::RegistryClosed)?;
        rx.await.map_err(|_| P2PError::RegistryClosed)
    }

    pub async fn register(
        &self,
        owner: &str,
        files: Option<&str>,
        address: PeerAddress,
    ) -> Result<()> {
        check_owner(owner)?;
        let files = FileList::parse(files)?;
        self.request(|reply| Command::Register {
            owner: owner.to_string(),
            files,
            address,
            reply,
        })
        .await
    }

    pub async fn unregister(&self, owner: &str, files: Option<&str>) -> Result<()> {
        check_owner(owner)?;
        let files = FileList::parse(files)?;
        self.request(|reply| Command::Unregister {
            owner: owner.to_string(),
            files,
            reply,
        })
        .await
    }

    pub async fn add_peer(&self, owner: &str, address: PeerAddress) -> Result<()> {
        check_owner(owner)?;
        self.request(|reply| Command::AddPeer {
            owner: owner.to_string(),
            address,
            reply,
        })
        .await
    }

    pub async fn remove_peer(&self, owner: &str) -> Result<()> {
        self.request(|reply| Command::RemovePeer {
            owner: owner.to_string(),
            reply,
        })
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        self.request(|reply| Command::ListAll { reply }).await
    }

    pub async fn files_of(&self, owner: &str) -> Result<Vec<String>> {
        self.request(|reply| Command::FilesOf {
            owner: owner.to_string(),
            reply,
        })
        .await
    }

    pub async fn address_of(&self, owner: &str) -> Result<Option<PeerAddress>> {
        self.request(|reply| Command::AddressOf {
            owner: owner.to_string(),
            reply,
        })
        .await
    }

    pub async fn all_correspondence(&self) -> Result<HashMap<String, PeerAddress>> {
        self.request(|reply| Command::AllCorrespondence { reply }).await
    }
}

fn check_owner(owner: &str) -> std::result::Result<(), ValidationError> {
    if owner.is_empty() {
        Err(ValidationError::EmptyOwner)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> PeerAddress {
        PeerAddress::new("127.0.0.1", 4040)
    }

    fn list(raw: &str) -> FileList {
        raw.parse().unwrap()
    }

    #[test]
    fn test_register_then_files_of() {
        let mut registry = Registry::new();
        registry.register("u", list("/p1, /p2"), addr());
        assert_eq!(registry.files_of("u"), vec!["/p1", "/p2"]);
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = Registry::new();
        registry.register("u", list("/p1"), addr());
        registry.register("u", list("/p1"), addr());
        assert_eq!(registry.files_of("u"), vec!["/p1"]);
    }

    #[test]
    fn test_merge_preserves_order_and_address() {
        let mut registry = Registry::new();
        registry.register("u", list("/p1"), addr());
        registry.register("u", list("/p2, /p3"), PeerAddress::new("10.0.0.9", 9999));
        assert_eq!(registry.files_of("u"), vec!["/p1", "/p2", "/p3"]);
        assert_eq!(registry.address_of("u"), Some(addr()));
    }

    #[test]
    fn test_unregister_last_file_drops_record() {
        let mut registry = Registry::new();
        registry.register("u", list("/p1"), addr());
        registry.unregister("u", &list("/p1"));
        assert!(registry.files_of("u").is_empty());
        assert_eq!(registry.address_of("u"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_subset_keeps_record() {
        let mut registry = Registry::new();
        registry.register("u", list("/p1, /p2"), addr());
        registry.unregister("u", &list("/p1"));
        assert_eq!(registry.files_of("u"), vec!["/p2"]);
        assert_eq!(registry.address_of("u"), Some(addr()));
    }

    #[test]
    fn test_unregister_unknown_owner_is_noop() {
        let mut registry = Registry::new();
        registry.unregister("ghost", &list("/p1"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_peer_keeps_existing_address() {
        let mut registry = Registry::new();
        registry.add_peer("u", addr());
        assert_eq!(registry.files_of("u"), Vec::<String>::new());
        assert_eq!(registry.address_of("u"), Some(addr()));

        registry.add_peer("u", PeerAddress::new("10.0.0.9", 1));
        assert_eq!(registry.address_of("u"), Some(addr()));

        registry.remove_peer("u");
        registry.remove_peer("u");
        assert_eq!(registry.address_of("u"), None);
    }

    #[test]
    fn test_all_correspondence_shares_address() {
        let mut registry = Registry::new();
        registry.register("a", list("/x"), addr());
        registry.register("b", list("/y"), addr());

        let map = registry.all_correspondence();
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], addr());
        assert_eq!(map["b"], addr());
    }

    #[tokio::test]
    async fn test_handle_validation_leaves_state_untouched() {
        let registry = RegistryHandle::spawn();

        let err = registry.register("u", None, addr()).await.unwrap_err();
        assert!(matches!(err, P2PError::Validation(ValidationError::FilesNil)));

        let err = registry.register("u", Some(""), addr()).await.unwrap_err();
        assert!(matches!(err, P2PError::Validation(ValidationError::FilesEmpty)));

        let err = registry
            .register("u", Some("/p1,  /p2 "), addr())
            .await
            .unwrap_err();
        assert!(matches!(err, P2PError::Validation(ValidationError::InvalidFormat)));

        let err = registry
            .register("u", Some("rel/path"), addr())
            .await
            .unwrap_err();
        assert!(matches!(err, P2PError::Validation(ValidationError::NotAbsolute)));

        let err = registry.unregister("u", Some("")).await.unwrap_err();
        assert!(matches!(err, P2PError::Validation(ValidationError::FilesEmpty)));

        assert!(registry.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let registry = RegistryHandle::spawn();
        registry.register("u", Some("/p1, /p2"), addr()).await.unwrap();
        registry.add_peer("v", PeerAddress::new("127.0.0.1", 4041)).await.unwrap();
        registry.unregister("ghost", Some("/p1")).await.unwrap();

        assert_eq!(registry.files_of("u").await.unwrap(), vec!["/p1", "/p2"]);
        assert!(registry.files_of("v").await.unwrap().is_empty());
        assert_eq!(registry.address_of("nobody").await.unwrap(), None);

        let map = registry.all_correspondence().await.unwrap();
        assert_eq!(map["u"].port, 4040);
        assert_eq!(map["v"].port, 4041);
    }

    #[tokio::test]
    async fn test_correspondence_follows_queued_mutations() {
        let registry = RegistryHandle::spawn();
        registry.add_peer("a", addr()).await.unwrap();
        registry.register("b", Some("/x"), addr()).await.unwrap();
        registry.remove_peer("a").await.unwrap();
        registry.unregister("b", Some("/x")).await.unwrap();
        registry.add_peer("c", PeerAddress::new("127.0.0.1", 4042)).await.unwrap();

        let map = registry.all_correspondence().await.unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["c"].port, 4042);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_are_serialized() {
        let registry = RegistryHandle::spawn();

        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let path = format!("/shared/{}", i);
                registry.register("u", Some(path.as_str()), addr()).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let files = registry.files_of("u").await.unwrap();
        assert_eq!(files.len(), 32);
    }

    #[tokio::test]
    async fn test_closed_registry_reports_error() {
        let (registry, worker) = RegistryHandle::with_registry(Registry::new());
        drop(worker);

        let err = registry.files_of("u").await.unwrap_err();
        assert!(matches!(err, P2PError::RegistryClosed));
    }
}
