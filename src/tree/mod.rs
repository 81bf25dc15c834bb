pub mod flatten;
pub mod sort;
pub mod types;

pub use flatten::{count, flatten};
pub use sort::sort;
pub use types::{CommentNode, FlatEntry, SortOrder};

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, instrument};

use crate::api::{Item, ItemFetch};

/// Default bound on in-flight item fetches during a build.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Callback invoked with a 0-100 completion estimate as a build advances.
/// Reported values never decrease, and 100 is always the final call.
pub type ProgressFn<'a> = dyn Fn(u8) + Send + Sync + 'a;

/// Discovers and fetches a full comment tree from a set of root ids.
///
/// The tree's extent is unknown up front: each fetched item declares its
/// children, which are queued and fetched in waves of up to `concurrency`
/// parallel point-fetches. An item that is absent, deleted, or dead prunes
/// its entire branch; a partial tree is a routine outcome, not an error.
pub struct TreeBuilder {
    fetcher: Arc<dyn ItemFetch>,
    concurrency: usize,
}

impl TreeBuilder {
    pub fn new(fetcher: Arc<dyn ItemFetch>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn build(&self, root_ids: &[u64]) -> Vec<CommentNode> {
        self.build_with(root_ids, None, None).await
    }

    /// Full build entry point. `progress` receives the monotone completion
    /// estimate; `cancel` is a cooperative flag checked before each wave,
    /// so fetches already in flight run to completion and the partial
    /// result is returned for the caller to discard.
    #[instrument(skip_all, fields(roots = root_ids.len()))]
    pub async fn build_with(
        &self,
        root_ids: &[u64],
        progress: Option<&ProgressFn<'_>>,
        cancel: Option<&AtomicBool>,
    ) -> Vec<CommentNode> {
        let mut meter = ProgressMeter::new(progress);
        if root_ids.is_empty() {
            meter.finish();
            return Vec::new();
        }

        // `seen` guards against fetching any id twice within one build,
        // even if the API were to declare an id under two parents.
        // `discovery` records first-seen order and drives assembly.
        let mut queue: VecDeque<u64> = VecDeque::new();
        let mut seen: HashSet<u64> = HashSet::new();
        let mut discovery: Vec<u64> = Vec::new();
        for &id in root_ids {
            if seen.insert(id) {
                queue.push_back(id);
                discovery.push(id);
            }
        }

        let mut items: HashMap<u64, Item> = HashMap::new();

        while !queue.is_empty() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                debug!("build cancelled before next wave");
                break;
            }

            let mut wave = JoinSet::new();
            while wave.len() < self.concurrency {
                let Some(id) = queue.pop_front() else { break };
                let fetcher = Arc::clone(&self.fetcher);
                wave.spawn(async move { (id, fetcher.fetch_item(id).await) });
            }

            let mut processed = 0;
            while let Some(joined) = wave.join_next().await {
                let Ok((id, fetched)) = joined else { continue };
                processed += 1;
                let Some(item) = fetched else {
                    debug!(id, "item absent, branch pruned");
                    continue;
                };
                if item.is_tombstone() {
                    debug!(id, deleted = item.deleted, dead = item.dead, "item tombstoned, branch pruned");
                    continue;
                }
                for &kid in &item.kids {
                    if seen.insert(kid) {
                        queue.push_back(kid);
                        discovery.push(kid);
                    }
                }
                items.insert(id, item);
            }
            meter.advance(processed, queue.len());
        }
        meter.finish();

        let tree = assemble(&discovery, items);
        debug!(fetched = discovery.len(), kept = count(&tree), "comment tree built");
        tree
    }
}

/// Assemble fetched items into trees. Children attach under their parent in
/// the parent's declared `kids` order, regardless of which fetch finished
/// first; items whose parent was never fetched become roots, in first-seen
/// order.
fn assemble(discovery: &[u64], mut items: HashMap<u64, Item>) -> Vec<CommentNode> {
    // Reverse first-seen order is children-before-parents, so every node's
    // subtree is already complete when its parent claims it.
    let mut built: HashMap<u64, CommentNode> = HashMap::new();
    for &id in discovery.iter().rev() {
        let Some(item) = items.remove(&id) else { continue };
        let children = item
            .kids
            .iter()
            .filter_map(|kid| built.remove(kid))
            .collect();
        built.insert(id, CommentNode { item, children });
    }
    // Whatever no parent claimed is a root.
    discovery
        .iter()
        .filter_map(|id| built.remove(id))
        .collect()
}

/// Monotone build-progress estimator. The denominator is a moving estimate
/// (ids processed so far plus ids still queued), so intermediate values are
/// approximate; reported percentages never decrease and `finish` always
/// lands on 100.
struct ProgressMeter<'a> {
    report: Option<&'a ProgressFn<'a>>,
    processed: usize,
    last_pct: u8,
}

impl<'a> ProgressMeter<'a> {
    fn new(report: Option<&'a ProgressFn<'a>>) -> Self {
        Self {
            report,
            processed: 0,
            last_pct: 0,
        }
    }

    fn advance(&mut self, newly_processed: usize, still_queued: usize) {
        self.processed += newly_processed;
        let Some(report) = self.report else { return };
        let total = self.processed + still_queued;
        if total == 0 {
            return;
        }
        // 100 is reserved for finish().
        let pct = ((self.processed * 100 / total) as u8).min(99);
        if pct > self.last_pct {
            self.last_pct = pct;
            report(pct);
        }
    }

    fn finish(&mut self) {
        if let Some(report) = self.report {
            report(100);
        }
        self.last_pct = 100;
    }
}
