//! Filesystem blob backend
//!
//! Blobs are gzip-compressed files under a three-level directory partition
//! derived from the leading hex characters of the uppercase fingerprint:
//! `metadata/{H1}/{H2}/{H3}/{FULL_HASH}.xml.gz`.
//!
//! Publication is atomic: content is written to an `.inprogress` temporary
//! in the final directory and renamed into place, so readers and
//! `for_each_hash` never observe a partial blob. Puts of the same
//! fingerprint are serialized through a striped lock; the rename makes the
//! last writer a no-op byte-wise (same content, same name).

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use tracing::debug;

use oaistore_core::{Result, StoreError};

use crate::hasher::ContentHasher;
use crate::store::MetadataStore;

const PUT_STRIPES: usize = 16;
const BLOB_SUFFIX: &str = ".xml.gz";

/// Gzip-file blob store for one network partition
pub struct FsBlobStore {
    root: PathBuf,
    hasher: Box<dyn ContentHasher>,
    put_locks: Vec<Mutex<()>>,
}

impl FsBlobStore {
    /// Open (creating if needed) the store rooted at the network's
    /// `metadata/` directory
    pub fn open(root: impl AsRef<Path>, hasher: Box<dyn ContentHasher>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(FsBlobStore {
            root,
            hasher,
            put_locks: (0..PUT_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    fn blob_path(&self, hash: &str) -> PathBuf {
        let upper = hash.to_uppercase();
        let mut chars = upper.chars();
        let h1 = chars.next().unwrap_or('0').to_string();
        let h2 = chars.next().unwrap_or('0').to_string();
        let h3 = chars.next().unwrap_or('0').to_string();
        self.root
            .join(h1)
            .join(h2)
            .join(h3)
            .join(format!("{}{}", hash, BLOB_SUFFIX))
    }

    fn stripe_for(&self, hash: &str) -> &Mutex<()> {
        let idx = hash
            .bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        &self.put_locks[idx % PUT_STRIPES]
    }
}

impl MetadataStore for FsBlobStore {
    fn put(&self, content: &str) -> Result<String> {
        let hash = self.hasher.fingerprint(content);
        let path = self.blob_path(&hash);

        let _guard = self.stripe_for(&hash).lock();
        if path.exists() {
            return Ok(hash);
        }

        let parent = path
            .parent()
            .ok_or_else(|| StoreError::store_io("blob path has no parent"))?;
        fs::create_dir_all(parent)?;

        let tmp = path.with_extension("gz.inprogress");
        {
            let file = File::create(&tmp)?;
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(content.as_bytes())?;
            let file = encoder.finish()?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(hash = %hash, "stored metadata blob");
        Ok(hash)
    }

    fn get(&self, hash: &str) -> Result<String> {
        let path = self.blob_path(hash);
        if !path.exists() {
            return Err(StoreError::not_found(format!("metadata blob {}", hash)));
        }
        let file = File::open(&path)?;
        let mut decoder = GzDecoder::new(file);
        let mut content = String::new();
        decoder.read_to_string(&mut content)?;
        Ok(content)
    }

    fn delete(&self, hash: &str) -> Result<bool> {
        let path = self.blob_path(hash);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }

    fn for_each_hash(&self, consumer: &mut dyn FnMut(&str)) -> Result<()> {
        for level1 in read_dirs(&self.root)? {
            for level2 in read_dirs(&level1)? {
                for level3 in read_dirs(&level2)? {
                    for entry in fs::read_dir(&level3)? {
                        let entry = entry?;
                        let name = entry.file_name();
                        let name = name.to_string_lossy();
                        if let Some(hash) = name.strip_suffix(BLOB_SUFFIX) {
                            consumer(hash);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn clean_and_optimize(&self) -> Result<bool> {
        // Drop partition directories left empty by deletes.
        let mut removed = 0usize;
        for level1 in read_dirs(&self.root)? {
            for level2 in read_dirs(&level1)? {
                for level3 in read_dirs(&level2)? {
                    removed += remove_if_empty(&level3)? as usize;
                }
                removed += remove_if_empty(&level2)? as usize;
            }
            removed += remove_if_empty(&level1)? as usize;
        }
        debug!(removed, "cleaned empty blob partitions");
        Ok(true)
    }
}

fn read_dirs(path: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

fn remove_if_empty(path: &Path) -> Result<bool> {
    if fs::read_dir(path)?.next().is_none() {
        fs::remove_dir(path)?;
        return Ok(true);
    }
    Ok(false)
}
