//! Thread-safe in-memory [`CredentialStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{CredentialStore, StoreError, StoreFuture, slot},
};

type SlotCell = Arc<RwLock<Option<String>>>;

/// Keeps the raw slot text in-process, exactly as a browser keeps its storage string.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SlotCell);
impl MemoryStore {
	/// Seeds the slot with arbitrary text, including malformed documents.
	pub fn with_raw(raw: impl Into<String>) -> Self {
		Self(Arc::new(RwLock::new(Some(raw.into()))))
	}

	/// Seeds the slot with an encoded credential.
	pub fn with_credential(credential: &Credential) -> Result<Self, StoreError> {
		Ok(Self::with_raw(slot::encode(None, credential)?))
	}

	/// Returns the raw slot text, if any.
	pub fn raw(&self) -> Option<String> {
		self.0.read().clone()
	}

	fn load_now(cell: SlotCell) -> Result<Option<Credential>, StoreError> {
		match cell.read().as_deref() {
			Some(raw) => slot::decode(raw),
			None => Ok(None),
		}
	}

	fn save_now(cell: SlotCell, credential: Credential) -> Result<(), StoreError> {
		let mut guard = cell.write();
		let rendered = slot::encode(guard.as_deref(), &credential)?;

		*guard = Some(rendered);

		Ok(())
	}
}
impl CredentialStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<Credential>> {
		let cell = self.0.clone();

		Box::pin(async move { Self::load_now(cell) })
	}

	fn save(&self, credential: Credential) -> StoreFuture<'_, ()> {
		let cell = self.0.clone();

		Box::pin(async move { Self::save_now(cell, credential) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let cell = self.0.clone();

		Box::pin(async move {
			cell.write().take();

			Ok(())
		})
	}
}
