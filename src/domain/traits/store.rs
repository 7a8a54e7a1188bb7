use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::Message;

/// Append-only message log
///
/// Implementations must be safe to call from many handler tasks at once:
/// each call is atomic, ids are unique and strictly increasing, and `all`
/// reflects every `append` that completed before it started. Appends racing
/// with `all` may or may not be included.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Ensure the backing structure exists. Idempotent.
    async fn init(&self) -> Result<(), StorageError>;

    /// Insert one message stamped with the current time, returning its id
    async fn append(&self, sender: &str, text: &str) -> Result<i64, StorageError>;

    /// Every message, ascending by id
    async fn all(&self) -> Result<Vec<Message>, StorageError>;

    async fn count(&self) -> Result<u64, StorageError>;
}
