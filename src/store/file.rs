//! File-backed [`CredentialStore`] for CLIs, daemons, and bots that outlive a single process.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{CredentialStore, StoreError, StoreFuture, slot},
};

/// Persists the credential slot as a single JSON file, replaced atomically on every write.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	write_lock: Arc<Mutex<()>>,
}
impl FileStore {
	/// Opens a store at the provided path, creating parent directories as needed.
	///
	/// The file itself is created lazily on the first save.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path, write_lock: Default::default() })
	}

	/// Location of the slot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_raw(path: &Path) -> Result<Option<String>, StoreError> {
		match fs::read_to_string(path) {
			Ok(raw) => Ok(Some(raw)),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to read {}: {e}", path.display()),
			}),
		}
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &str) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(contents.as_bytes()).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn load(&self) -> StoreFuture<'_, Option<Credential>> {
		Box::pin(async move {
			match Self::read_raw(&self.path)? {
				Some(raw) => slot::decode(&raw),
				None => Ok(None),
			}
		})
	}

	fn save(&self, credential: Credential) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let _guard = self.write_lock.lock();
			let previous = Self::read_raw(&self.path)?;
			let rendered = slot::encode(previous.as_deref(), &credential)?;

			self.persist_locked(&rendered)
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let _guard = self.write_lock.lock();

			match fs::remove_file(&self.path) {
				Ok(()) => Ok(()),
				Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
				Err(e) => Err(StoreError::Backend {
					message: format!("Failed to remove {}: {e}", self.path.display()),
				}),
			}
		})
	}
}
