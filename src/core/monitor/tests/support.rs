use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::config::ColumnMap;
use crate::core::error::{FetchError, HookError, NotifyError, PersistError};
use crate::core::monitor::{
    Celebration, EntryPersistence, MonitorContext, Notice, Notifier, Record, RecordStore,
    RemoteRow, RowSource, StatusClassifier,
};

pub(super) const SHEET_A: &str = "sheet-a";
pub(super) const SHEET_B: &str = "sheet-b";

pub(super) fn record() -> Record {
    Record::new("2025-05-25 18:39:30", "A. Name", "task-1")
}

/// A row in the default column layout. Empty strings leave the cell blank.
pub(super) fn row(record: &Record, reviewer: &str, grade: &str) -> RemoteRow {
    let columns = ColumnMap::default();
    HashMap::from([
        (columns.timestamp, record.timestamp.clone()),
        (columns.name, record.name.clone()),
        (columns.task, record.task.clone()),
        (columns.reviewer, reviewer.to_string()),
        (columns.grade, grade.to_string()),
    ])
}

#[derive(Clone)]
pub(super) enum Script {
    Rows(Vec<RemoteRow>),
    Fail,
}

/// Replays queued responses per sheet; the last one repeats forever.
#[derive(Default)]
pub(super) struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn push(&self, sheet: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(sheet.to_string())
            .or_default()
            .push_back(script);
    }

    pub fn rows(&self, sheet: &str, rows: Vec<RemoteRow>) {
        self.push(sheet, Script::Rows(rows));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RowSource for ScriptedSource {
    async fn fetch(&self, sheet: &str) -> Result<Vec<RemoteRow>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(sheet) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match script {
            Some(Script::Rows(rows)) => Ok(rows),
            Some(Script::Fail) => Err(FetchError::Status {
                sheet: sheet.to_string(),
                status: 503,
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind() == kind)
            .count()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &Notice) -> Result<(), NotifyError> {
        self.notices.lock().unwrap().push(notice.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("chat unreachable".into()));
        }
        Ok(())
    }
}

/// The first send hangs for a minute; later ones return at once.
#[derive(Default)]
pub(super) struct StalledNotifier {
    calls: AtomicUsize,
}

impl StalledNotifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for StalledNotifier {
    async fn notify(&self, _notice: &Notice) -> Result<(), NotifyError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct CountingCelebration {
    fired: AtomicUsize,
}

impl CountingCelebration {
    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Celebration for CountingCelebration {
    fn celebrate(&self) -> Result<(), HookError> {
        self.fired.fetch_add(1, Ordering::SeqCst);
        Err(HookError::Launch {
            path: "moth.png".into(),
            message: "no display".into(),
        })
    }
}

#[derive(Default)]
pub(super) struct MemoryPersistence {
    records: Mutex<Vec<Record>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
}

impl MemoryPersistence {
    pub fn with(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntryPersistence for MemoryPersistence {
    async fn load(&self) -> Result<Vec<Record>, PersistError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(PersistError::Io(std::io::Error::other("corrupt")));
        }
        Ok(self.records.lock().unwrap().clone())
    }

    async fn save(&self, records: &[Record]) -> Result<(), PersistError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistError::Io(std::io::Error::other("disk full")));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.records.lock().unwrap() = records.to_vec();
        Ok(())
    }
}

/// Everything a test needs to drive the engines and inspect what they did.
pub(super) struct Harness {
    pub persistence: Arc<MemoryPersistence>,
    pub source: Arc<ScriptedSource>,
    pub notifier: Arc<RecordingNotifier>,
    pub celebration: Arc<CountingCelebration>,
    pub ctx: MonitorContext,
}

impl Harness {
    pub fn new(records: Vec<Record>, sheets: &[&str]) -> Self {
        let persistence = Arc::new(MemoryPersistence::with(records));
        let source = Arc::new(ScriptedSource::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let celebration = Arc::new(CountingCelebration::default());
        let ctx = MonitorContext::new(
            Arc::new(RecordStore::new(persistence.clone())),
            source.clone(),
            sheets.iter().map(|s| s.to_string()).collect(),
            StatusClassifier::new(ColumnMap::default()),
            celebration.clone(),
        );
        Self {
            persistence,
            source,
            notifier,
            celebration,
            ctx,
        }
    }
}

/// Poll `cond` on the (usually paused) tokio clock.
pub(super) async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("condition not reached in time");
}
