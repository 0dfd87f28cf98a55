//! Enumerator reading identifiers from a text file, one per line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pump_engine::{BoxError, Enumerator, Identifier, IdentifierRecord};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Split};
use tracing::debug;

use crate::error::{BackendError, Result};

pub struct FileEnumerator {
    path: PathBuf,
    total: u64,
}

impl FileEnumerator {
    /// Open `path` and count its identifiers.
    ///
    /// Blank lines are not counted, so the total matches the number of
    /// records `produce` will send. Lines are not decoded here; a line that
    /// is not UTF-8 still counts and is reported by `produce`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut lines = open_lines(&path).await?;

        let mut total = 0;
        while let Some(line) = lines
            .next_segment()
            .await
            .map_err(|e| BackendError::io(&path, e))?
        {
            if !line.trim_ascii().is_empty() {
                total += 1;
            }
        }

        debug!(path = %path.display(), total, "Identifier list opened");
        Ok(Self { path, total })
    }
}

async fn open_lines(path: &Path) -> Result<Split<BufReader<File>>> {
    let file = File::open(path)
        .await
        .map_err(|e| BackendError::io(path, e))?;
    Ok(BufReader::new(file).split(b'\n'))
}

fn parse_line(line: &[u8]) -> IdentifierRecord {
    match std::str::from_utf8(line) {
        Ok(text) => match Identifier::parse(text) {
            Ok(id) => IdentifierRecord::ok(id),
            Err(e) => IdentifierRecord::failed(Identifier::new(text), BackendError::from(e)),
        },
        Err(e) => {
            IdentifierRecord::failed(Identifier::new(String::from_utf8_lossy(line).as_ref()), e)
        }
    }
}

#[async_trait]
impl Enumerator for FileEnumerator {
    async fn produce(
        &self,
        out: flume::Sender<IdentifierRecord>,
    ) -> std::result::Result<(), BoxError> {
        let mut lines = open_lines(&self.path).await?;

        while let Some(line) = lines
            .next_segment()
            .await
            .map_err(|e| BackendError::io(&self.path, e))?
        {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }
            out.send_async(parse_line(line)).await?;
        }
        Ok(())
    }

    fn total_count(&self) -> u64 {
        self.total
    }
}
