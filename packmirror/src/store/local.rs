//! Directory-backed resource store.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use super::{check_key, ResourceStore, StoreError};

/// Buffer size for hashing stored files (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Suffix appended to every file when gzip storage is enabled.
const GZIP_SUFFIX: &str = ".gz";

/// Resource store rooted at a local directory.
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so every document is replaced atomically. With gzip enabled each key is
/// stored as `<key>.gz` and transparently decompressed on read; hashes are
/// always computed over the logical (uncompressed) content.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    gzip: bool,
}

impl LocalStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            gzip: false,
        }
    }

    /// Enable or disable gzip-compressed storage.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether documents are stored gzip-compressed.
    pub fn is_gzip(&self) -> bool {
        self.gzip
    }

    /// Physical file path for a key.
    fn file_path(&self, key: &str) -> PathBuf {
        let path = self.root.join(key);
        if self.gzip {
            let mut name = path.into_os_string();
            name.push(GZIP_SUFFIX);
            PathBuf::from(name)
        } else {
            path
        }
    }

    fn ensure_parent(path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    fn encode(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        if !self.gzip {
            return Ok(data.to_vec());
        }
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 4), Compression::default());
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn open_reader(&self, key: &str) -> Result<(PathBuf, Box<dyn Read>), StoreError> {
        check_key(key)?;
        let path = self.file_path(key);
        let file = File::open(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        let reader: Box<dyn Read> = if self.gzip {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok((path, reader))
    }
}

impl ResourceStore for LocalStore {
    fn exists(&self, key: &str) -> bool {
        if check_key(key).is_err() {
            return false;
        }
        // Directories (e.g. the package tree root) are never compressed.
        self.file_path(key).exists() || self.root.join(key).is_dir()
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let (path, mut reader) = self.open_reader(key)?;
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|source| StoreError::Io { path, source })?;
        Ok(data)
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        check_key(key)?;
        let path = self.file_path(key);
        Self::ensure_parent(&path)?;

        let encoded = self.encode(data).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        let mut tmp_name = path.clone().into_os_string();
        tmp_name.push(".part");
        let tmp = PathBuf::from(tmp_name);

        fs::write(&tmp, &encoded).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| {
            fs::remove_file(&tmp).ok();
            StoreError::Io {
                path: path.clone(),
                source,
            }
        })
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        check_key(from)?;
        check_key(to)?;
        let source_path = self.file_path(from);
        let target_path = self.file_path(to);
        if !source_path.exists() {
            return Err(StoreError::NotFound(from.to_string()));
        }
        Self::ensure_parent(&target_path)?;
        fs::rename(&source_path, &target_path).map_err(|source| StoreError::Io {
            path: target_path,
            source,
        })
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        check_key(key)?;
        let path = self.file_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn hash_of_stored(&self, key: &str) -> Result<String, StoreError> {
        let (path, mut reader) = self.open_reader(key)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let bytes_read = reader.read(&mut buffer).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}
