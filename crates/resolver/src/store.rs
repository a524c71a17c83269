//! Persistent key-value storage behind [`LocalState`](crate::LocalState).

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sddl_worker::TaskClass;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Preference namespace; file-backed stores are named after it.
pub const PREFS_NAMESPACE: &str = "sddl_sdk_prefs";

/// One stored preference value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
	Bool(bool),
	Int(i64),
	Str(String),
}

impl PrefValue {
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(s) => Some(s),
			_ => None,
		}
	}
}

/// Namespaced key-value persistence.
///
/// Writes go through [`put_all`](Self::put_all) so related keys land
/// together.
pub trait KeyValueStore: Send + Sync {
	fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError>;

	/// Writes every entry as one batch.
	fn put_all(&self, entries: Vec<(String, PrefValue)>) -> Result<(), StoreError>;

	/// Removes every key in the namespace.
	fn clear(&self) -> Result<(), StoreError>;

	/// Returns a sorted copy of every stored entry.
	fn snapshot(&self) -> Result<BTreeMap<String, PrefValue>, StoreError>;

	/// Blocks until every accepted batch is durable.
	fn flush(&self) -> Result<(), StoreError> {
		Ok(())
	}
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: Mutex<BTreeMap<String, PrefValue>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError> {
		Ok(self.entries.lock().get(key).cloned())
	}

	fn put_all(&self, entries: Vec<(String, PrefValue)>) -> Result<(), StoreError> {
		self.entries.lock().extend(entries);
		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.entries.lock().clear();
		Ok(())
	}

	fn snapshot(&self) -> Result<BTreeMap<String, PrefValue>, StoreError> {
		Ok(self.entries.lock().clone())
	}
}

/// JSON file store at `<dir>/sddl_sdk_prefs.json`.
///
/// The file is read once on open. Batches update memory on the caller and
/// are written behind on the blocking pool through a temp file and rename;
/// [`flush`](KeyValueStore::flush) and drop write any pending state inline.
#[derive(Debug)]
pub struct FileStore {
	shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
	path: PathBuf,
	entries: Mutex<BTreeMap<String, PrefValue>>,
	/// Bumped under the `entries` lock on every change.
	generation: AtomicU64,
	/// Generation last written to disk. Held for the whole write.
	written: Mutex<u64>,
}

impl FileStore {
	/// Opens (or lazily creates) the store under `dir`.
	pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
		let path = dir.as_ref().join(format!("{PREFS_NAMESPACE}.json"));
		let entries = match fs::read(&path) {
			Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
			Ok(bytes) => serde_json::from_slice(&bytes).map_err(|error| StoreError::Decode { path: path.clone(), error })?,
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
			Err(error) => return Err(StoreError::Io { path, error }),
		};
		tracing::debug!(path = %path.display(), keys = entries.len(), "opened preference store");
		Ok(Self {
			shared: Arc::new(Shared {
				path,
				entries: Mutex::new(entries),
				generation: AtomicU64::new(0),
				written: Mutex::new(0),
			}),
		})
	}

	pub fn path(&self) -> &Path {
		&self.shared.path
	}

	fn schedule_write(&self) {
		let shared = Arc::clone(&self.shared);
		drop(sddl_worker::spawn_blocking(TaskClass::Background, move || {
			if let Err(error) = shared.write_latest() {
				tracing::warn!(%error, "preference write failed");
			}
		}));
	}
}

impl Shared {
	/// Writes the newest state unless it is already on disk.
	fn write_latest(&self) -> Result<(), StoreError> {
		let mut written = self.written.lock();
		let (generation, entries) = {
			let entries = self.entries.lock();
			(self.generation.load(Ordering::Acquire), entries.clone())
		};
		if generation == *written {
			return Ok(());
		}
		self.persist(&entries)?;
		*written = generation;
		Ok(())
	}

	fn persist(&self, entries: &BTreeMap<String, PrefValue>) -> Result<(), StoreError> {
		let io_err = |error: std::io::Error| StoreError::Io {
			path: self.path.clone(),
			error,
		};
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).map_err(io_err)?;
		}
		let bytes = serde_json::to_vec_pretty(entries)?;
		let tmp = self.path.with_extension("json.tmp");
		let mut file = fs::File::create(&tmp).map_err(io_err)?;
		file.write_all(&bytes).map_err(io_err)?;
		file.sync_all().map_err(io_err)?;
		fs::rename(&tmp, &self.path).map_err(io_err)
	}
}

impl KeyValueStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError> {
		Ok(self.shared.entries.lock().get(key).cloned())
	}

	fn put_all(&self, batch: Vec<(String, PrefValue)>) -> Result<(), StoreError> {
		{
			let mut entries = self.shared.entries.lock();
			entries.extend(batch);
			self.shared.generation.fetch_add(1, Ordering::AcqRel);
		}
		self.schedule_write();
		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		{
			let mut entries = self.shared.entries.lock();
			entries.clear();
			self.shared.generation.fetch_add(1, Ordering::AcqRel);
		}
		self.schedule_write();
		Ok(())
	}

	fn snapshot(&self) -> Result<BTreeMap<String, PrefValue>, StoreError> {
		Ok(self.shared.entries.lock().clone())
	}

	fn flush(&self) -> Result<(), StoreError> {
		self.shared.write_latest()
	}
}

impl Drop for FileStore {
	fn drop(&mut self) {
		if let Err(error) = self.shared.write_latest() {
			tracing::warn!(%error, path = %self.shared.path.display(), "preferences not saved");
		}
	}
}
