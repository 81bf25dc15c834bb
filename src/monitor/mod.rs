use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::api::{Item, ItemFetch};
use crate::tree::{self, count, flatten, CommentNode, TreeBuilder};

/// Floor for the refresh interval, bounding request rate against the API.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Invoked from the refresh task when a cycle discovers comments not seen
/// before, with the count of newly seen ids.
pub type NewCommentsFn = dyn Fn(usize) + Send + Sync;

pub struct MonitorConfig {
    /// Time between refresh cycles; clamped up to [`MIN_REFRESH_INTERVAL`].
    pub interval: Duration,
    /// Fan-out bound handed to the tree builder.
    pub concurrency: usize,
    pub on_new_comments: Option<Arc<NewCommentsFn>>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            concurrency: tree::DEFAULT_CONCURRENCY,
            on_new_comments: None,
        }
    }
}

/// State shared between the refresh task and foreground readers. One lock,
/// short critical sections: writers swap values in, readers clone values
/// out, nobody holds the lock across a fetch or a render.
#[derive(Default)]
struct RefreshState {
    subject: Option<Item>,
    tree: Vec<CommentNode>,
    /// Every id ever seen in a completed build. Grows by union only, so an
    /// id briefly missing from a fetch gap is never re-reported as new.
    known_ids: HashSet<u64>,
    pending_new: usize,
    is_refreshing: bool,
    progress: u8,
}

/// Copy of the monitor's state at one instant.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub subject: Option<Item>,
    pub tree: Vec<CommentNode>,
    pub total_comments: usize,
    /// New comments discovered since the last `acknowledge`.
    pub pending_new: usize,
    pub is_refreshing: bool,
    /// 0-100 coarse progress of the cycle in flight (100 when idle).
    pub progress: u8,
}

#[derive(Debug, Error)]
enum CycleError {
    #[error("subject {0} could not be fetched")]
    SubjectUnavailable(u64),
}

/// Keeps one item's comment tree fresh in the background.
///
/// `start` runs one full build before returning, so the first snapshot
/// already holds a complete tree; a spawned task then re-fetches the
/// subject and rebuilds on the interval, diffing discovered ids against
/// `known_ids`. A failed cycle is logged and the schedule continues.
pub struct CommentMonitor {
    state: Arc<Mutex<RefreshState>>,
    stop: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl CommentMonitor {
    pub async fn start(fetcher: Arc<dyn ItemFetch>, subject_id: u64, config: MonitorConfig) -> Self {
        let interval = config.interval.max(MIN_REFRESH_INTERVAL);
        let state = Arc::new(Mutex::new(RefreshState::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        run_cycle(
            &state,
            &fetcher,
            subject_id,
            config.concurrency,
            None,
            &stop,
            CyclePhase::Initial,
        )
        .await;

        let task = tokio::spawn({
            let state = Arc::clone(&state);
            let stop = Arc::clone(&stop);
            let wake = Arc::clone(&wake);
            let on_new = config.on_new_comments.clone();
            let concurrency = config.concurrency;
            async move {
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = wake.notified() => {}
                    }
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    run_cycle(
                        &state,
                        &fetcher,
                        subject_id,
                        concurrency,
                        on_new.as_deref(),
                        &stop,
                        CyclePhase::Scheduled,
                    )
                    .await;
                }
                debug!(subject_id, "refresh task exiting");
            }
        });

        Self {
            state,
            stop,
            wake,
            task: Some(task),
        }
    }

    /// Clone the current state out under the lock; callers never observe a
    /// partially updated tree.
    pub fn snapshot(&self) -> Snapshot {
        let (subject, tree, pending_new, is_refreshing, progress) = {
            let guard = self.state.lock();
            (
                guard.subject.clone(),
                guard.tree.clone(),
                guard.pending_new,
                guard.is_refreshing,
                guard.progress,
            )
        };
        let total_comments = count(&tree);
        Snapshot {
            subject,
            tree,
            total_comments,
            pending_new,
            is_refreshing,
            progress,
        }
    }

    /// Reset the new-comment counter, leaving the tree and known ids alone.
    pub fn acknowledge(&self) {
        self.state.lock().pending_new = 0;
    }

    /// Ask the refresh task to exit and wait briefly for it. A task still
    /// blocked on in-flight fetches is left to finish detached; its result
    /// is discarded by the mid-cycle stop check.
    pub async fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.wake.notify_one();
        if let Some(task) = self.task.take() {
            if timeout(STOP_JOIN_TIMEOUT, task).await.is_err() {
                warn!("refresh task did not stop in time, detaching");
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum CyclePhase {
    /// First build: seed `known_ids` and the tree, no delta accounting.
    Initial,
    /// Timer-driven rebuild: diff against `known_ids`, notify on new ids.
    Scheduled,
}

/// One refresh cycle. Failures are reported, never propagated, and the
/// trailing state update runs on every path so pollers always see the cycle
/// land on done.
async fn run_cycle(
    state: &Arc<Mutex<RefreshState>>,
    fetcher: &Arc<dyn ItemFetch>,
    subject_id: u64,
    concurrency: usize,
    on_new: Option<&NewCommentsFn>,
    stop: &Arc<AtomicBool>,
    phase: CyclePhase,
) {
    {
        let mut guard = state.lock();
        guard.is_refreshing = true;
        guard.progress = 0;
    }

    if let Err(error) = refresh_once(state, fetcher, subject_id, concurrency, on_new, stop, phase).await {
        warn!(subject_id, %error, "refresh cycle failed");
    }

    let mut guard = state.lock();
    guard.is_refreshing = false;
    guard.progress = 100;
}

async fn refresh_once(
    state: &Arc<Mutex<RefreshState>>,
    fetcher: &Arc<dyn ItemFetch>,
    subject_id: u64,
    concurrency: usize,
    on_new: Option<&NewCommentsFn>,
    stop: &Arc<AtomicBool>,
    phase: CyclePhase,
) -> Result<(), CycleError> {
    let subject = fetcher
        .fetch_item(subject_id)
        .await
        .ok_or(CycleError::SubjectUnavailable(subject_id))?;
    let root_ids = subject.kids.clone();
    {
        let mut guard = state.lock();
        guard.subject = Some(subject);
        guard.progress = 20;
    }

    let builder = TreeBuilder::new(Arc::clone(fetcher), concurrency);
    let progress_state = Arc::clone(state);
    let report = move |pct: u8| {
        // Map the build's 0-100 into this cycle's 20-95 band.
        let scaled = 20 + (u16::from(pct) * 75 / 100) as u8;
        let mut guard = progress_state.lock();
        if scaled > guard.progress {
            guard.progress = scaled;
        }
    };
    let tree = builder
        .build_with(&root_ids, Some(&report), Some(stop.as_ref()))
        .await;

    if stop.load(Ordering::Relaxed) && phase == CyclePhase::Scheduled {
        debug!(subject_id, "stop requested mid-cycle, build discarded");
        return Ok(());
    }

    let current_ids: HashSet<u64> = flatten(&tree).iter().map(|entry| entry.item.id).collect();
    let new_count = {
        let mut guard = state.lock();
        match phase {
            CyclePhase::Initial => {
                guard.known_ids = current_ids;
                guard.tree = tree;
                guard.pending_new = 0;
                0
            }
            CyclePhase::Scheduled => {
                let new_count = current_ids
                    .iter()
                    .filter(|id| !guard.known_ids.contains(id))
                    .count();
                if new_count > 0 {
                    guard.known_ids.extend(current_ids);
                    guard.tree = tree;
                    guard.pending_new += new_count;
                }
                new_count
            }
        }
    };

    if new_count > 0 {
        debug!(subject_id, new_count, "new comments discovered");
        if let Some(notify) = on_new {
            notify(new_count);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{comment, story, MockFetcher};

    const STORY: u64 = 1000;

    fn seeded_fetcher() -> Arc<MockFetcher> {
        Arc::new(MockFetcher::new([
            story(STORY, &[1, 2]),
            comment(1, STORY, 100, &[]),
            comment(2, STORY, 200, &[]),
        ]))
    }

    async fn run_initial(state: &Arc<Mutex<RefreshState>>, fetcher: &Arc<dyn ItemFetch>) {
        run_cycle(state, fetcher, STORY, 4, None, &Arc::new(AtomicBool::new(false)), CyclePhase::Initial).await;
    }

    #[tokio::test]
    async fn test_initial_cycle_seeds_state_without_delta() {
        let fetcher: Arc<dyn ItemFetch> = seeded_fetcher();
        let state = Arc::new(Mutex::new(RefreshState::default()));
        run_initial(&state, &fetcher).await;

        let guard = state.lock();
        assert_eq!(guard.known_ids, HashSet::from([1, 2]));
        assert_eq!(count(&guard.tree), 2);
        assert_eq!(guard.pending_new, 0);
        assert!(!guard.is_refreshing);
        assert_eq!(guard.progress, 100);
    }

    #[tokio::test]
    async fn test_scheduled_cycle_reports_new_ids() {
        let mock = seeded_fetcher();
        let fetcher: Arc<dyn ItemFetch> = Arc::clone(&mock) as _;
        let state = Arc::new(Mutex::new(RefreshState::default()));
        run_initial(&state, &fetcher).await;

        // The thread gains a reply and a nested reply.
        mock.insert(story(STORY, &[1, 2, 3]));
        mock.insert(comment(3, STORY, 300, &[4]));
        mock.insert(comment(4, 3, 400, &[]));

        let notified = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notified);
        let on_new = move |count: usize| sink.lock().push(count);
        run_cycle(&state, &fetcher, STORY, 4, Some(&on_new), &Arc::new(AtomicBool::new(false)), CyclePhase::Scheduled).await;

        let guard = state.lock();
        assert_eq!(guard.known_ids, HashSet::from([1, 2, 3, 4]));
        assert_eq!(guard.pending_new, 2);
        assert_eq!(count(&guard.tree), 4);
        assert_eq!(*notified.lock(), vec![2]);
    }

    #[tokio::test]
    async fn test_scheduled_cycle_without_new_ids_leaves_state() {
        let mock = seeded_fetcher();
        let fetcher: Arc<dyn ItemFetch> = Arc::clone(&mock) as _;
        let state = Arc::new(Mutex::new(RefreshState::default()));
        run_initial(&state, &fetcher).await;

        // Transient gap: comment 2 vanishes from the declared roots. Known
        // ids must not shrink and nothing is reported as new.
        mock.insert(story(STORY, &[1]));

        let notified = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notified);
        let on_new = move |count: usize| sink.lock().push(count);
        run_cycle(&state, &fetcher, STORY, 4, Some(&on_new), &Arc::new(AtomicBool::new(false)), CyclePhase::Scheduled).await;

        let guard = state.lock();
        assert_eq!(guard.known_ids, HashSet::from([1, 2]));
        assert_eq!(guard.pending_new, 0);
        // The tree is only replaced when new ids appear.
        assert_eq!(count(&guard.tree), 2);
        assert!(notified.lock().is_empty());
    }

    #[tokio::test]
    async fn test_reappearing_id_is_not_new_again() {
        let mock = seeded_fetcher();
        let fetcher: Arc<dyn ItemFetch> = Arc::clone(&mock) as _;
        let state = Arc::new(Mutex::new(RefreshState::default()));
        run_initial(&state, &fetcher).await;

        mock.insert(story(STORY, &[1]));
        run_cycle(&state, &fetcher, STORY, 4, None, &Arc::new(AtomicBool::new(false)), CyclePhase::Scheduled).await;

        // Comment 2 comes back alongside a genuinely new comment 5.
        mock.insert(story(STORY, &[1, 2, 5]));
        mock.insert(comment(5, STORY, 500, &[]));
        run_cycle(&state, &fetcher, STORY, 4, None, &Arc::new(AtomicBool::new(false)), CyclePhase::Scheduled).await;

        let guard = state.lock();
        assert_eq!(guard.pending_new, 1);
        assert_eq!(guard.known_ids, HashSet::from([1, 2, 5]));
    }

    #[tokio::test]
    async fn test_failed_cycle_still_lands_on_done() {
        let fetcher: Arc<dyn ItemFetch> = Arc::new(MockFetcher::default());
        let state = Arc::new(Mutex::new(RefreshState::default()));
        run_cycle(&state, &fetcher, STORY, 4, None, &Arc::new(AtomicBool::new(false)), CyclePhase::Scheduled).await;

        let guard = state.lock();
        assert!(!guard.is_refreshing);
        assert_eq!(guard.progress, 100);
        assert!(guard.known_ids.is_empty());
    }

    #[tokio::test]
    async fn test_monitor_start_snapshot_acknowledge_stop() {
        let fetcher: Arc<dyn ItemFetch> = seeded_fetcher();
        let monitor = CommentMonitor::start(fetcher, STORY, MonitorConfig::default()).await;

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.total_comments, 2);
        assert_eq!(snapshot.pending_new, 0);
        assert!(!snapshot.is_refreshing);
        assert_eq!(snapshot.progress, 100);
        assert!(snapshot.subject.is_some());

        monitor.state.lock().pending_new = 3;
        let before = monitor.snapshot();
        assert_eq!(before.pending_new, 3);
        monitor.acknowledge();
        let after = monitor.snapshot();
        assert_eq!(after.pending_new, 0);
        assert_eq!(after.total_comments, before.total_comments);

        monitor.stop().await;
    }
}
