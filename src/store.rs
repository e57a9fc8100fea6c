//! Storage contracts and built-in backends for the persisted credential slot.

pub mod file;
pub mod memory;
pub mod slot;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use slot::{PersistedSlot, PersistedState};

// self
use crate::{_prelude::*, auth::Credential};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the single credential slot the client reads before every request.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads the current credential, if the slot holds one.
	fn load(&self) -> StoreFuture<'_, Option<Credential>>;

	/// Writes `credential` into the slot, keeping unrelated persisted state intact.
	fn save(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Deletes the slot.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Slot contents could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
