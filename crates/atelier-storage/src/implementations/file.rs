//! File-based storage backend for the workflow service.
//!
//! Stores each document as a binary file with a fixed-size header carrying
//! TTL information, giving a single-studio deployment durable storage
//! without an external database.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use atelier_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, StorageKey, ValidationError,
};
use fs2::FileExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

/// Fixed-size file header for TTL support.
///
/// Binary layout, 64 bytes total: 4 magic bytes "ATLR", a little-endian u16
/// version, a little-endian u64 expiry as Unix seconds where 0 means never,
/// and zero padding up to the header size.
#[derive(Debug, Clone, Copy)]
struct FileHeader {
	version: u16,
	expires_at: u64,
}

fn now_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"ATLR";
	const VERSION: u16 = 1;
	const SIZE: usize = 64;

	/// Creates a header expiring `ttl` from now. A zero TTL never expires.
	fn new(ttl: Duration) -> Self {
		let expires_at = if ttl.is_zero() {
			0
		} else {
			now_secs().saturating_add(ttl.as_secs())
		};
		Self {
			version: Self::VERSION,
			expires_at,
		}
	}

	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[6..14].copy_from_slice(&self.expires_at.to_le_bytes());
		bytes
	}

	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		let header = bytes
			.get(..Self::SIZE)
			.ok_or_else(|| StorageError::Backend("File too small for header".into()))?;
		if &header[..4] != Self::MAGIC {
			// Pre-header file, caller falls back to raw content
			return Err(StorageError::Backend("Legacy file format".into()));
		}

		let version = u16::from_le_bytes([header[4], header[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version: {}",
				version
			)));
		}

		let mut expiry = [0u8; 8];
		expiry.copy_from_slice(&header[6..14]);
		Ok(Self {
			version,
			expires_at: u64::from_le_bytes(expiry),
		})
	}

	fn is_expired(&self) -> bool {
		self.expires_at != 0 && now_secs() >= self.expires_at
	}
}

/// Per-namespace TTLs resolved from configuration.
#[derive(Debug, Clone)]
pub struct TtlConfig {
	ttls: HashMap<StorageKey, Duration>,
}

impl TtlConfig {
	/// Reads `ttl_<namespace>` keys from the implementation's TOML table.
	/// Namespaces without a configured TTL never expire.
	fn from_config(config: &toml::Value) -> Self {
		let mut ttls = HashMap::new();
		if let Some(table) = config.as_table() {
			for storage_key in StorageKey::all() {
				let seconds = table
					.get(&format!("ttl_{}", storage_key.as_str()))
					.and_then(|v| v.as_integer());
				if let Some(seconds) = seconds {
					ttls.insert(storage_key, Duration::from_secs(seconds as u64));
				}
			}
		}
		Self { ttls }
	}

	fn get_ttl(&self, storage_key: StorageKey) -> Duration {
		self.ttls
			.get(&storage_key)
			.copied()
			.unwrap_or(Duration::ZERO)
	}
}

/// File-based storage implementation.
///
/// Holds an exclusive lock on a lockfile inside the base directory for its
/// whole lifetime, so two processes can never write the same studio data.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
	/// TTL configuration for different storage keys.
	ttl_config: TtlConfig,
	/// Lockfile handle, held until the storage is dropped.
	_lock: std::fs::File,
}

impl FileStorage {
	/// Creates a new FileStorage instance rooted at the given base path.
	///
	/// Fails when the directory cannot be created or another process
	/// already holds the directory lock.
	pub fn new(base_path: PathBuf, ttl_config: TtlConfig) -> Result<Self, StorageError> {
		std::fs::create_dir_all(&base_path).map_err(|e| StorageError::Backend(e.to_string()))?;

		let lock = std::fs::OpenOptions::new()
			.create(true)
			.write(true)
			.truncate(false)
			.open(base_path.join(".lock"))
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		lock.try_lock_exclusive().map_err(|_| {
			StorageError::Backend(format!(
				"Storage directory {} is locked by another process",
				base_path.display()
			))
		})?;

		Ok(Self {
			base_path,
			ttl_config,
			_lock: lock,
		})
	}

	/// Maps a storage key to its file, flattening the namespace separator
	/// into the file name.
	fn file_for(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', ':'], "_");
		self.base_path.join(format!("{}.bin", safe_key))
	}

	/// Looks up the configured TTL for the key's namespace.
	fn ttl_for_key(&self, key: &str) -> Duration {
		key.split(':')
			.next()
			.and_then(|namespace| namespace.parse::<StorageKey>().ok())
			.map(|sk| self.ttl_config.get_ttl(sk))
			.unwrap_or(Duration::ZERO)
	}

	/// Sweeps the base directory and deletes every expired entry.
	async fn sweep_expired(&self) -> Result<usize, StorageError> {
		let mut removed = 0;
		let mut entries = fs::read_dir(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("bin")) {
				continue;
			}
			let data = match fs::read(&path).await {
				Ok(data) => data,
				Err(e) => {
					tracing::debug!("Skipping file {:?}: could not be read: {}", path, e);
					continue;
				}
			};
			let expired = match FileHeader::deserialize(&data) {
				Ok(header) => header.is_expired(),
				// Legacy or truncated files are left in place
				Err(_) => false,
			};
			if expired {
				match fs::remove_file(&path).await {
					Ok(()) => removed += 1,
					Err(e) => {
						tracing::warn!("Failed to remove expired file {:?}: {}", path, e);
					}
				}
			}
		}
		Ok(removed)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_for(key);

		let data = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			}
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		match FileHeader::deserialize(&data) {
			Ok(header) if header.is_expired() => Err(StorageError::NotFound),
			Ok(_) => Ok(data[FileHeader::SIZE..].to_vec()),
			// Legacy file without header, return as-is
			Err(_) => Ok(data),
		}
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let path = self.file_for(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		// An explicit TTL wins over the configured namespace TTL
		let ttl = ttl.unwrap_or_else(|| self.ttl_for_key(key));
		let header = FileHeader::new(ttl);

		let mut file_data = Vec::with_capacity(FileHeader::SIZE + value.len());
		file_data.extend_from_slice(&header.serialize());
		file_data.extend_from_slice(&value);

		// Write goes to a temp file first so readers never see a torn write
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, file_data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.file_for(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.file_for(key).exists())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.sweep_expired().await
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// One optional ttl_* field per storage namespace
		let mut optional_fields = vec![Field::new("storage_path", FieldType::String)];
		for storage_key in StorageKey::all() {
			optional_fields.push(Field::new(
				format!("ttl_{}", storage_key.as_str()),
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			));
		}

		Schema::new(vec![], optional_fields).validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/storage")
/// - `ttl_orders`, `ttl_drafts`, `ttl_pending_draft_by_order`,
///   `ttl_notifications`: per-namespace TTL in seconds (default: 0, never
///   expires)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage")
		.to_string();

	let ttl_config = TtlConfig::from_config(config);

	Ok(Box::new(FileStorage::new(
		PathBuf::from(storage_path),
		ttl_config,
	)?))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn empty_ttl_config() -> TtlConfig {
		TtlConfig::from_config(&toml::Value::Table(Default::default()))
	}

	#[tokio::test]
	async fn round_trips_data_behind_the_header() {
		let dir = TempDir::new().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf(), empty_ttl_config()).unwrap();

		let value = b"{\"id\":\"o-1\"}".to_vec();
		storage
			.set_bytes("orders:o-1", value.clone(), None)
			.await
			.unwrap();

		let back = storage.get_bytes("orders:o-1").await.unwrap();
		assert_eq!(back, value);

		assert!(storage.exists("orders:o-1").await.unwrap());
		storage.delete("orders:o-1").await.unwrap();
		assert!(!storage.exists("orders:o-1").await.unwrap());

		// Deleting a missing key is not an error
		storage.delete("orders:o-1").await.unwrap();
	}

	#[tokio::test]
	async fn expired_entries_disappear_and_get_cleaned_up() {
		let dir = TempDir::new().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf(), empty_ttl_config()).unwrap();

		storage
			.set_bytes(
				"notifications:n-1",
				b"gone soon".to_vec(),
				Some(Duration::from_secs(1)),
			)
			.await
			.unwrap();
		storage
			.set_bytes("orders:o-1", b"stays".to_vec(), None)
			.await
			.unwrap();

		tokio::time::sleep(Duration::from_millis(1200)).await;

		let result = storage.get_bytes("notifications:n-1").await;
		assert!(matches!(result, Err(StorageError::NotFound)));

		let removed = storage.cleanup_expired().await.unwrap();
		assert_eq!(removed, 1);
		assert_eq!(storage.get_bytes("orders:o-1").await.unwrap(), b"stays");
	}

	#[tokio::test]
	async fn namespace_ttl_comes_from_configuration() {
		let dir = TempDir::new().unwrap();
		let config: toml::Value = toml::from_str("ttl_notifications = 1").unwrap();
		let storage =
			FileStorage::new(dir.path().to_path_buf(), TtlConfig::from_config(&config)).unwrap();

		storage
			.set_bytes("notifications:n-1", b"fades".to_vec(), None)
			.await
			.unwrap();
		storage
			.set_bytes("orders:o-1", b"stays".to_vec(), None)
			.await
			.unwrap();

		tokio::time::sleep(Duration::from_millis(1200)).await;

		assert!(matches!(
			storage.get_bytes("notifications:n-1").await,
			Err(StorageError::NotFound)
		));
		assert_eq!(storage.get_bytes("orders:o-1").await.unwrap(), b"stays");
	}

	#[tokio::test]
	async fn second_instance_cannot_lock_the_same_directory() {
		let dir = TempDir::new().unwrap();
		let _storage = FileStorage::new(dir.path().to_path_buf(), empty_ttl_config()).unwrap();

		let second = FileStorage::new(dir.path().to_path_buf(), empty_ttl_config());
		assert!(matches!(second, Err(StorageError::Backend(_))));
	}
}
