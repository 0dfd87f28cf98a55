use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{
    Block, BoxError, Collector, Drain, Enumerator, Identifier, IdentifierRecord, Progress,
    ProgressEvent, PumpReport,
};

/// Initialize tracing for tests with appropriate settings
#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer() // Write to test output
        .try_init();
}

/// Enumerator replaying a fixed list of identifiers.
pub struct ScriptedEnumerator {
    ids: Vec<Identifier>,
    total: u64,
}

impl ScriptedEnumerator {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|id| Identifier::new(*id)).collect(),
            total: ids.len() as u64,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }
}

#[async_trait]
impl Enumerator for ScriptedEnumerator {
    async fn produce(&self, out: flume::Sender<IdentifierRecord>) -> Result<(), BoxError> {
        for id in &self.ids {
            out.send_async(IdentifierRecord::ok(id.clone())).await?;
        }
        Ok(())
    }

    fn total_count(&self) -> u64 {
        self.total
    }
}

/// Collector returning the identifier bytes as block data.
#[derive(Default)]
pub struct ScriptedCollector {
    pub collect_calls: AtomicUsize,
}

impl ScriptedCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Collector for ScriptedCollector {
    async fn collect(
        &self,
        input: flume::Receiver<IdentifierRecord>,
        out: flume::Sender<Block>,
    ) -> Result<(), BoxError> {
        self.collect_calls.fetch_add(1, Ordering::SeqCst);
        while let Ok(record) = input.recv_async().await {
            let data = record.id.as_str().as_bytes().to_vec();
            out.send_async(Block::new(record.id, data)).await?;
        }
        Ok(())
    }
}

/// Drain keeping the identifiers it wrote.
#[derive(Default)]
pub struct RecordingDrain {
    written: Mutex<Vec<Identifier>>,
}

impl RecordingDrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written_sorted(&self) -> Vec<Identifier> {
        let mut written = self.written.lock().unwrap().clone();
        written.sort();
        written
    }
}

#[async_trait]
impl Drain for RecordingDrain {
    async fn write(&self, block: &Block) -> Result<(), BoxError> {
        assert!(!block.is_err(), "errored block reached the drain");
        self.written.lock().unwrap().push(block.id.clone());
        Ok(())
    }
}

/// Progress sink keeping `(processed, total)` of every update.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<(u64, Option<u64>)>>,
    finished: Mutex<Option<PumpReport>>,
}

impl RecordingProgress {
    pub fn last(&self) -> Option<(u64, Option<u64>)> {
        self.events.lock().unwrap().last().copied()
    }

    pub fn finished(&self) -> bool {
        self.finished.lock().unwrap().is_some()
    }
}

impl Progress for RecordingProgress {
    fn on_item(&self, event: &ProgressEvent<'_>) {
        self.events
            .lock()
            .unwrap()
            .push((event.processed, event.total));
    }

    fn finish(&self, report: &PumpReport) {
        *self.finished.lock().unwrap() = Some(report.clone());
    }
}
