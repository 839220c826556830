use crate::domain::model::ListPage;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Blob store contract every backend satisfies.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Base URL for direct public links. Backends without public links
    /// return `StoreError::NotSupported`.
    fn link_base(&self) -> Result<String>;

    async fn download(&self, reference: &str) -> Result<Vec<u8>>;

    async fn put(&self, reference: &str, contents: &[u8]) -> Result<()>;

    async fn delete(&self, reference: &str) -> Result<()>;

    fn close(&self);

    /// Listing capability, when the backend has one.
    fn as_lister(&self) -> Option<&dyn Lister> {
        None
    }
}

#[async_trait]
pub trait Lister: Send + Sync {
    /// Returns one page of references. Pass an empty token to start and the
    /// returned `next_token` to continue.
    async fn list(&self, token: &str) -> Result<ListPage>;
}
