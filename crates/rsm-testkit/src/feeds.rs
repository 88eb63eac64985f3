//! Feed and directory fakes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rsm_feeds::{PlayerFeed, QueueFeed, ServerInfoFeed};
use rsm_roster::{DirectoryError, DirectoryMember, DirectorySource};
use rsm_schemas::{FeedError, FeedResult, QueueSnapshot, RawPlayerRecord, ServerInfo};

fn locked<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Player feed answering from a per-region table.
///
/// Regions without an entry answer `Unavailable("no such region")`.
#[derive(Default)]
pub struct FakePlayerFeed {
    results: Mutex<BTreeMap<String, FeedResult<Vec<RawPlayerRecord>>>>,
    delays: Mutex<BTreeMap<String, Duration>>,
    calls: AtomicUsize,
}

impl FakePlayerFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_players(&self, region: &str, names: &[&str]) {
        let players = names.iter().map(|n| RawPlayerRecord::new(*n)).collect();
        locked(&self.results).insert(region.to_string(), Ok(players));
    }

    pub fn set_error(&self, region: &str, err: FeedError) {
        locked(&self.results).insert(region.to_string(), Err(err));
    }

    /// Answer for `region` only after `delay` has elapsed.
    pub fn set_delay(&self, region: &str, delay: Duration) {
        locked(&self.delays).insert(region.to_string(), delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PlayerFeed for FakePlayerFeed {
    async fn fetch_players(&self, region: &str) -> FeedResult<Vec<RawPlayerRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = locked(&self.delays).get(region).copied();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        locked(&self.results)
            .get(region)
            .cloned()
            .unwrap_or_else(|| Err(FeedError::unavailable("no such region")))
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

pub struct FakeQueueFeed {
    result: Mutex<FeedResult<QueueSnapshot>>,
    calls: AtomicUsize,
}

impl Default for FakeQueueFeed {
    fn default() -> Self {
        Self {
            result: Mutex::new(Ok(QueueSnapshot::empty())),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeQueueFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_snapshot(&self, snapshot: QueueSnapshot) {
        *locked(&self.result) = Ok(snapshot);
    }

    pub fn set_error(&self, err: FeedError) {
        *locked(&self.result) = Err(err);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl QueueFeed for FakeQueueFeed {
    async fn fetch_queue(&self) -> FeedResult<QueueSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        locked(&self.result).clone()
    }
}

// ---------------------------------------------------------------------------
// Server info
// ---------------------------------------------------------------------------

/// Server-info feed. Regions without an entry answer an empty `ServerInfo`.
#[derive(Default)]
pub struct FakeInfoFeed {
    results: Mutex<BTreeMap<String, FeedResult<ServerInfo>>>,
    re_resolved: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeInfoFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, region: &str, sim_time: &str) {
        locked(&self.results).insert(region.to_string(), Ok(ServerInfo::with_time(sim_time)));
    }

    pub fn set_error(&self, region: &str, err: FeedError) {
        locked(&self.results).insert(region.to_string(), Err(err));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Regions passed to `re_resolve`, in call order.
    pub fn re_resolved(&self) -> Vec<String> {
        locked(&self.re_resolved).clone()
    }
}

#[async_trait::async_trait]
impl ServerInfoFeed for FakeInfoFeed {
    async fn fetch_info(&self, region: &str) -> FeedResult<ServerInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        locked(&self.results)
            .get(region)
            .cloned()
            .unwrap_or_else(|| Ok(ServerInfo::default()))
    }

    async fn re_resolve(&self, region: &str) -> FeedResult<Option<String>> {
        locked(&self.re_resolved).push(region.to_string());
        Ok(Some(format!("https://{}.example/info.json", region.to_lowercase())))
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeDirectory {
    members: Mutex<Vec<DirectoryMember>>,
    failing: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(members: Vec<DirectoryMember>) -> Self {
        Self {
            members: Mutex::new(members),
            ..Default::default()
        }
    }

    pub fn set_members(&self, members: Vec<DirectoryMember>) {
        *locked(&self.members) = members;
    }

    /// Make every following `list_members` fail (`None` heals it).
    pub fn set_failing(&self, reason: Option<&str>) {
        *locked(&self.failing) = reason.map(str::to_string);
    }

    /// Answer only after `delay` has elapsed (`None` answers at once).
    pub fn set_delay(&self, delay: Option<Duration>) {
        *locked(&self.delay) = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DirectorySource for FakeDirectory {
    async fn list_members(&self) -> Result<Vec<DirectoryMember>, DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *locked(&self.delay);
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if let Some(reason) = locked(&self.failing).clone() {
            return Err(DirectoryError::Unavailable(reason));
        }
        Ok(locked(&self.members).clone())
    }
}
