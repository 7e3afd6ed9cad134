//! Key-value persistence seam for the cutover migration engine
//!
//! The engine persists two logical records under fixed keys: the serialized
//! configuration and the most recent performance samples. Implementations
//! return [`StoreError`] instead of swallowing failures; the service layer
//! decides whether to log and continue.
//!
//! There is no schema versioning: a malformed stored value is replaced
//! with defaults by the loader, not migrated.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod codec;
pub mod dir;
pub mod error;
pub mod memory;

pub use dir::DirStore;
pub use error::StoreError;
pub use memory::MemoryStore;

/// Fixed key holding the serialized configuration record
pub const CONFIG_KEY: &str = "cutover.config";

/// Fixed key holding the serialized recent-sample list
pub const SAMPLES_KEY: &str = "cutover.samples";

/// Synchronous string key-value store
///
/// Object-safe so hosts can inject their own persistence. Calls are
/// synchronous and may fail; nothing here retries.
pub trait Store: Send + Sync {
    /// Read a value, `None` when the key has never been written
    ///
    /// # Errors
    /// [`StoreError`] on I/O failure.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, overwriting any previous one
    ///
    /// # Errors
    /// [`StoreError`] on I/O failure or quota exhaustion.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a key; deleting an absent key is not an error
    ///
    /// # Errors
    /// [`StoreError`] on I/O failure.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
