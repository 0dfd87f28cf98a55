//! Flat-file block store.
//!
//! Blocks live in `<root>/<shard>/<identifier>.data`, where the shard is the
//! two characters before the last character of the identifier. Identifiers
//! shorter than three characters are left-padded with `_` first.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use pump_engine::{Block, BoxError, Collector, Drain, Enumerator, Identifier, IdentifierRecord};
use tokio::fs;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{BackendError, Result};

const EXTENSION: &str = "data";

/// Shard directory name of `id`.
pub fn shard_of(id: &str) -> String {
    let padded: Vec<char> = format!("{id:_>3}").chars().collect();
    let len = padded.len();
    padded[len - 3..len - 1].iter().collect()
}

/// Root directory of a flat-file store.
#[derive(Debug, Clone)]
pub struct FlatFsStore {
    root: PathBuf,
}

impl FlatFsStore {
    /// Use an existing store.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let metadata = fs::metadata(&root)
            .await
            .map_err(|e| BackendError::io(&root, e))?;
        if !metadata.is_dir() {
            return Err(BackendError::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }
        Ok(Self { root })
    }

    /// Use the store at `root`, creating the directory if needed.
    pub async fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| BackendError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn shard_dir(&self, id: &Identifier) -> PathBuf {
        self.root.join(shard_of(id.as_str()))
    }

    pub fn block_path(&self, id: &Identifier) -> PathBuf {
        self.shard_dir(id).join(format!("{id}.{EXTENSION}"))
    }
}

/// Lists every block of a store.
pub struct FlatFsEnumerator {
    store: FlatFsStore,
    discovered: AtomicU64,
}

impl FlatFsEnumerator {
    pub fn new(store: FlatFsStore) -> Self {
        Self {
            store,
            discovered: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Enumerator for FlatFsEnumerator {
    async fn produce(
        &self,
        out: flume::Sender<IdentifierRecord>,
    ) -> std::result::Result<(), BoxError> {
        let root = self.store.root();
        let mut shards = fs::read_dir(root)
            .await
            .map_err(|e| BackendError::io(root, e))?;

        while let Some(shard) = shards
            .next_entry()
            .await
            .map_err(|e| BackendError::io(root, e))?
        {
            let is_dir = shard
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }

            let shard_name = shard.file_name().to_string_lossy().into_owned();
            let mut entries = match fs::read_dir(shard.path()).await {
                Ok(entries) => entries,
                Err(e) => {
                    out.send_async(IdentifierRecord::failed(
                        Identifier::new(shard_name),
                        BackendError::io(shard.path(), e),
                    ))
                    .await?;
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        out.send_async(IdentifierRecord::failed(
                            Identifier::new(shard_name.as_str()),
                            BackendError::io(shard.path(), e),
                        ))
                        .await?;
                        break;
                    }
                };

                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                    trace!(path = %path.display(), "Ignoring non-block file");
                    continue;
                }
                let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                    continue;
                };

                self.discovered.fetch_add(1, Ordering::Relaxed);
                let record = match Identifier::parse(&stem) {
                    Ok(id) => IdentifierRecord::ok(id),
                    Err(e) => IdentifierRecord::failed(Identifier::new(stem), BackendError::from(e)),
                };
                out.send_async(record).await?;
            }
        }

        debug!(
            root = %root.display(),
            blocks = self.discovered.load(Ordering::Relaxed),
            "Flatfs enumeration finished"
        );
        Ok(())
    }

    fn total_count(&self) -> u64 {
        self.discovered.load(Ordering::Relaxed)
    }
}

/// Reads blocks from a store.
pub struct FlatFsCollector {
    store: FlatFsStore,
}

impl FlatFsCollector {
    pub fn new(store: FlatFsStore) -> Self {
        Self { store }
    }

    async fn read(&self, id: Identifier) -> Block {
        let path = self.store.block_path(&id);
        match fs::read(&path).await {
            Ok(data) => Block::new(id, data),
            Err(e) => Block::failed(id, BackendError::io(path, e)),
        }
    }
}

#[async_trait]
impl Collector for FlatFsCollector {
    async fn collect(
        &self,
        input: flume::Receiver<IdentifierRecord>,
        out: flume::Sender<Block>,
    ) -> std::result::Result<(), BoxError> {
        while let Ok(record) = input.recv_async().await {
            let block = self.read(record.id).await;
            out.send_async(block).await?;
        }
        Ok(())
    }
}

/// Writes blocks into a store.
///
/// Each block is written to a temporary file in its shard directory and then
/// renamed into place.
pub struct FlatFsDrain {
    store: FlatFsStore,
}

impl FlatFsDrain {
    pub fn new(store: FlatFsStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Drain for FlatFsDrain {
    async fn write(&self, block: &Block) -> std::result::Result<(), BoxError> {
        let shard_dir = self.store.shard_dir(&block.id);
        fs::create_dir_all(&shard_dir)
            .await
            .map_err(|e| BackendError::io(&shard_dir, e))?;

        let target = self.store.block_path(&block.id);
        let temp = shard_dir.join(format!(".{}.{}.tmp", block.id, Uuid::new_v4()));

        fs::write(&temp, &block.data)
            .await
            .map_err(|e| BackendError::io(&temp, e))?;

        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(BackendError::io(&target, e).into());
        }

        trace!(identifier = %block.id, size = block.len(), "Block written");
        Ok(())
    }
}
