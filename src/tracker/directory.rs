use std::collections::HashMap;
use std::future::Future;

use crate::tracker::{FileRecord, PeerAddress, RegistryHandle};
use crate::utils::Result;

/// The tracker's operation set, whether the registry is in-process or remote.
pub trait Directory: Clone + Send + Sync + 'static {
    fn register(
        &self,
        owner: &str,
        files: Option<&str>,
        address: PeerAddress,
    ) -> impl Future<Output = Result<()>> + Send;

    fn unregister(&self, owner: &str, files: Option<&str>)
        -> impl Future<Output = Result<()>> + Send;

    fn add_peer(&self, owner: &str, address: PeerAddress)
        -> impl Future<Output = Result<()>> + Send;

    fn remove_peer(&self, owner: &str) -> impl Future<Output = Result<()>> + Send;

    fn list_all(&self) -> impl Future<Output = Result<Vec<FileRecord>>> + Send;

    fn files_of(&self, owner: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    fn address_of(&self, owner: &str)
        -> impl Future<Output = Result<Option<PeerAddress>>> + Send;

    fn all_correspondence(
        &self,
    ) -> impl Future<Output = Result<HashMap<String, PeerAddress>>> + Send;
}

impl Directory for RegistryHandle {
    async fn register(&self, owner: &str, files: Option<&str>, address: PeerAddress) -> Result<()> {
        RegistryHandle::register(self, owner, files, address).await
    }

    async fn unregister(&self, owner: &str, files: Option<&str>) -> Result<()> {
        RegistryHandle::unregister(self, owner, files).await
    }

    async fn add_peer(&self, owner: &str, address: PeerAddress) -> Result<()> {
        RegistryHandle::add_peer(self, owner, address).await
    }

    async fn remove_peer(&self, owner: &str) -> Result<()> {
        RegistryHandle::remove_peer(self, owner).await
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>> {
        RegistryHandle::list_all(self).await
    }

    async fn files_of(&self, owner: &str) -> Result<Vec<String>> {
        RegistryHandle::files_of(self, owner).await
    }

    async fn address_of(&self, owner: &str) -> Result<Option<PeerAddress>> {
        RegistryHandle::address_of(self, owner).await
    }

    async fn all_correspondence(&self) -> Result<HashMap<String, PeerAddress>> {
        RegistryHandle::all_correspondence(self).await
    }
}
